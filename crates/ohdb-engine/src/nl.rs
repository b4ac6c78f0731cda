//! Optional natural-language intent collaborator.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint with a bounded
//! timeout. The engine never depends on this service for correctness: any
//! error here simply leaves the rule-cascade intent in charge.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::intent::{IntentAction, IntentAttribute, QueryIntent};

#[derive(Debug, Error)]
pub enum NlError {
    #[error("nl service request failed")]
    Http(#[from] reqwest::Error),
    #[error("nl service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("nl service reply had no choices")]
    EmptyReply,
    #[error("nl service reply had no parseable JSON object")]
    MalformedReply,
}

/// Structured intent as returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct NlIntent {
    pub answer: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl NlIntent {
    /// Convert to the engine's intent type. Unrecognized wire values
    /// degrade to `Unknown`/`None` rather than failing.
    #[must_use]
    pub fn into_query_intent(self) -> QueryIntent {
        QueryIntent {
            action: IntentAction::from_wire(&self.action),
            location: self.location.filter(|l| !l.is_empty()),
            time: self.time.filter(|t| !t.is_empty()),
            attribute: self.attribute.as_deref().and_then(IntentAttribute::from_wire),
            answer: self.answer,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for the NL-intent service.
#[derive(Debug, Clone)]
pub struct NlIntentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl NlIntentClient {
    /// Build a client with the given endpoint and a hard request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NlError::Http`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, NlError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Ask the service to extract a structured intent from `query`.
    ///
    /// # Errors
    ///
    /// Returns [`NlError`] on transport failure, non-success status, or an
    /// unparseable reply. Callers fall back to the rule cascade in every
    /// error case.
    pub async fn extract_intent(
        &self,
        query: &str,
        known_areas: &[String],
    ) -> Result<NlIntent, NlError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt(known_areas)},
                {"role": "user", "content": query},
            ],
            "temperature": 0.3,
            "max_tokens": 150,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NlError::Status(status));
        }

        let reply: ChatCompletionReply = response.json().await?;
        let content = reply
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(NlError::EmptyReply)?;

        parse_reply(content)
    }
}

/// Parse the model's reply: either bare JSON, or JSON embedded in prose.
fn parse_reply(content: &str) -> Result<NlIntent, NlError> {
    if let Ok(intent) = serde_json::from_str::<NlIntent>(content) {
        return Ok(intent);
    }
    if let Some(block) = first_json_object(content) {
        if let Ok(intent) = serde_json::from_str::<NlIntent>(block) {
            return Ok(intent);
        }
    }
    Err(NlError::MalformedReply)
}

/// The first balanced `{...}` block in the text, if any.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn system_prompt(known_areas: &[String]) -> String {
    let areas = known_areas.join(", ");
    format!(
        "You are an assistant for a retail outlet map application. Interpret the \
         user's question about outlets and reply with ONLY a JSON object, no other \
         text. Known areas include: {areas}.\n\
         For a location question: {{\"answer\": \"...\", \"action\": \"search_location\", \"location\": \"...\"}}.\n\
         For an earliest/latest opening/closing or 24-hour attribute question: \
         {{\"answer\": \"...\", \"action\": \"get_attribute\", \"attribute\": \
         \"earliest_opening\" | \"latest_opening\" | \"earliest_closing\" | \"latest_closing\" | \"24hours\"}}. \
         Use an attribute only when the user asks for the single earliest/latest \
         outlet; \"which outlets close before 10pm\" is a time query with \
         \"time\": \"before 10pm\", not an attribute query.\n\
         For outlets near a place: {{\"answer\": \"...\", \"action\": \"get_nearest\", \"location\": \"...\"}}.\n\
         For outlets open at a time: {{\"answer\": \"...\", \"action\": \"time_query\", \
         \"location\": \"...\", \"time\": \"...\"}}; treat \"open now\" as the current time.\n\
         For a location combined with a time condition: {{\"answer\": \"...\", \
         \"action\": \"compound_query\", \"location\": \"...\", \"time\": \"...\"}}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    fn client_for(server: &MockServer) -> NlIntentClient {
        NlIntentClient::new(&server.uri(), "test-key", "test-model", Duration::from_secs(2))
            .expect("build client")
    }

    #[tokio::test]
    async fn well_formed_reply_parses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                r#"{"answer": "Outlets in Bangsar coming up.", "action": "search_location", "location": "Bangsar"}"#,
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let intent = client
            .extract_intent("outlets in bangsar", &["Bangsar".to_string()])
            .await
            .expect("intent");
        assert_eq!(intent.action, "search_location");
        assert_eq!(intent.location.as_deref(), Some("Bangsar"));

        let query_intent = intent.into_query_intent();
        assert_eq!(query_intent.action, IntentAction::SearchLocation);
    }

    #[tokio::test]
    async fn prose_wrapped_json_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                "Sure, here you go: {\"answer\": \"ok\", \"action\": \"get_attribute\", \"attribute\": \"latest_closing\"} Hope that helps!",
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let intent = client.extract_intent("latest closing?", &[]).await.expect("intent");
        assert_eq!(intent.attribute.as_deref(), Some("latest_closing"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_malformed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_reply("I could not figure that out, sorry.")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.extract_intent("???", &[]).await.unwrap_err();
        assert!(matches!(err, NlError::MalformedReply));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.extract_intent("anything", &[]).await.unwrap_err();
        assert!(matches!(err, NlError::Status(s) if s.as_u16() == 429));
    }

    #[test]
    fn first_json_object_balances_braces() {
        assert_eq!(first_json_object("ab {\"k\": {\"n\": 1}} cd"), Some("{\"k\": {\"n\": 1}}"));
        assert_eq!(first_json_object("no braces"), None);
        assert_eq!(first_json_object("{unterminated"), None);
    }

    #[test]
    fn unknown_wire_values_degrade_gracefully() {
        let intent = NlIntent {
            answer: "hi".to_string(),
            action: "made_up_action".to_string(),
            location: Some(String::new()),
            time: None,
            attribute: Some("made_up_attr".to_string()),
        };
        let query_intent = intent.into_query_intent();
        assert_eq!(query_intent.action, IntentAction::Unknown);
        assert_eq!(query_intent.location, None);
        assert_eq!(query_intent.attribute, None);
    }
}
