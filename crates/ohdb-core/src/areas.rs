//! Curated area lookup tables.
//!
//! Two tables back the location resolver's fallback stages: area name →
//! postcode values/ranges, and area name → synonym/landmark keywords. Both
//! are loaded once from YAML at startup, validated, and never mutated.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Deserialize)]
struct AreasFile {
    #[serde(default)]
    postcode_areas: Vec<PostcodeAreaConfig>,
    #[serde(default)]
    keyword_groups: Vec<KeywordGroupConfig>,
}

#[derive(Debug, Deserialize)]
struct PostcodeAreaConfig {
    name: String,
    postcodes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KeywordGroupConfig {
    name: String,
    keywords: Vec<String>,
}

/// A single postcode constraint: one exact 5-digit code or an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostcodeRule {
    Exact(String),
    Range(u32, u32),
}

impl PostcodeRule {
    /// Whether `postcode` (as stored on an outlet) satisfies this rule.
    #[must_use]
    pub fn matches(&self, postcode: &str) -> bool {
        match self {
            PostcodeRule::Exact(code) => postcode == code,
            PostcodeRule::Range(start, end) => postcode
                .parse::<u32>()
                .is_ok_and(|code| (*start..=*end).contains(&code)),
        }
    }
}

/// Named area with the postcodes it covers.
#[derive(Debug, Clone)]
pub struct PostcodeArea {
    pub name: String,
    pub rules: Vec<PostcodeRule>,
}

impl PostcodeArea {
    #[must_use]
    pub fn covers_postcode(&self, postcode: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(postcode))
    }
}

/// Named area with synonym/landmark keywords used as a last-resort matcher.
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Immutable, validated view over both curated tables.
#[derive(Debug, Clone, Default)]
pub struct AreaTable {
    postcode_areas: Vec<PostcodeArea>,
    keyword_groups: Vec<KeywordGroup>,
}

impl AreaTable {
    #[must_use]
    pub fn postcode_areas(&self) -> &[PostcodeArea] {
        &self.postcode_areas
    }

    #[must_use]
    pub fn keyword_groups(&self) -> &[KeywordGroup] {
        &self.keyword_groups
    }

    /// All curated area names, lowercased, for intent extraction.
    #[must_use]
    pub fn area_names(&self) -> Vec<String> {
        self.postcode_areas
            .iter()
            .map(|a| a.name.to_lowercase())
            .collect()
    }

    /// Areas whose name contains the query or is contained in it.
    ///
    /// `query` must already be lowercased and trimmed.
    #[must_use]
    pub fn matching_areas(&self, query: &str) -> Vec<&PostcodeArea> {
        if query.is_empty() {
            return Vec::new();
        }
        self.postcode_areas
            .iter()
            .filter(|area| {
                let name = area.name.to_lowercase();
                name.contains(query) || query.contains(&name)
            })
            .collect()
    }

    /// Keyword groups whose name or any keyword appears in the query.
    ///
    /// `query` must already be lowercased.
    #[must_use]
    pub fn matching_keyword_groups(&self, query: &str) -> Vec<&KeywordGroup> {
        self.keyword_groups
            .iter()
            .filter(|group| {
                query.contains(&group.name) || group.keywords.iter().any(|k| query.contains(k))
            })
            .collect()
    }
}

/// Load and validate the area tables from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_areas(path: &Path) -> Result<AreaTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AreasFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_areas(&content)
}

/// Parse and validate area tables from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML or invalid entries.
pub fn parse_areas(content: &str) -> Result<AreaTable, ConfigError> {
    let file: AreasFile = serde_yaml::from_str(content).map_err(ConfigError::AreasFileParse)?;

    let mut seen_names = HashSet::new();
    let mut postcode_areas = Vec::with_capacity(file.postcode_areas.len());
    for area in &file.postcode_areas {
        let name = area.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "area name must be non-empty".to_string(),
            ));
        }
        if !seen_names.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate area name: '{name}'"
            )));
        }
        if area.postcodes.is_empty() {
            return Err(ConfigError::Validation(format!(
                "area '{name}' has no postcodes"
            )));
        }
        let rules = area
            .postcodes
            .iter()
            .map(|raw| parse_postcode_rule(name, raw))
            .collect::<Result<Vec<_>, _>>()?;
        postcode_areas.push(PostcodeArea {
            name: name.to_string(),
            rules,
        });
    }

    let mut seen_groups = HashSet::new();
    let mut keyword_groups = Vec::with_capacity(file.keyword_groups.len());
    for group in &file.keyword_groups {
        let name = group.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "keyword group name must be non-empty".to_string(),
            ));
        }
        if !seen_groups.insert(name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate keyword group: '{name}'"
            )));
        }
        let keywords: Vec<String> = group
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(ConfigError::Validation(format!(
                "keyword group '{name}' has no keywords"
            )));
        }
        keyword_groups.push(KeywordGroup { name, keywords });
    }

    Ok(AreaTable {
        postcode_areas,
        keyword_groups,
    })
}

fn parse_postcode_rule(area: &str, raw: &str) -> Result<PostcodeRule, ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!(
            "area '{area}' has invalid postcode entry '{raw}'; expected NNNNN or NNNNN-NNNNN"
        ))
    };

    if let Some((start, end)) = raw.split_once('-') {
        let start_code = parse_five_digits(start).ok_or_else(invalid)?;
        let end_code = parse_five_digits(end).ok_or_else(invalid)?;
        if start_code > end_code {
            return Err(ConfigError::Validation(format!(
                "area '{area}' has inverted postcode range '{raw}'"
            )));
        }
        Ok(PostcodeRule::Range(start_code, end_code))
    } else {
        parse_five_digits(raw)
            .map(|_| PostcodeRule::Exact(raw.to_string()))
            .ok_or_else(invalid)
    }
}

fn parse_five_digits(s: &str) -> Option<u32> {
    if s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse::<u32>().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
postcode_areas:
  - name: City Centre
    postcodes: ['50000-50999']
  - name: Bangsar
    postcodes: ['59000']
keyword_groups:
  - name: bangsar
    keywords: [bangsar, telawi, 'jalan bangsar']
";

    #[test]
    fn parses_sample_tables() {
        let table = parse_areas(SAMPLE).expect("parse sample");
        assert_eq!(table.postcode_areas().len(), 2);
        assert_eq!(table.keyword_groups().len(), 1);
    }

    #[test]
    fn exact_rule_matches_only_equal_code() {
        let rule = PostcodeRule::Exact("59000".to_string());
        assert!(rule.matches("59000"));
        assert!(!rule.matches("59001"));
    }

    #[test]
    fn range_rule_is_inclusive() {
        let rule = PostcodeRule::Range(50000, 50999);
        assert!(rule.matches("50000"));
        assert!(rule.matches("50999"));
        assert!(!rule.matches("51000"));
        assert!(!rule.matches("not-a-code"));
    }

    #[test]
    fn matching_areas_is_bidirectional_substring() {
        let table = parse_areas(SAMPLE).unwrap();
        // Query contained in area name.
        assert_eq!(table.matching_areas("city centre").len(), 1);
        // Area name contained in query.
        assert_eq!(table.matching_areas("outlets in bangsar please").len(), 1);
        assert!(table.matching_areas("nowhere").is_empty());
        assert!(table.matching_areas("").is_empty());
    }

    #[test]
    fn matching_keyword_groups_checks_keywords() {
        let table = parse_areas(SAMPLE).unwrap();
        assert_eq!(table.matching_keyword_groups("near telawi street").len(), 1);
        assert!(table.matching_keyword_groups("elsewhere").is_empty());
    }

    #[test]
    fn rejects_inverted_range() {
        let yaml = "postcode_areas:\n  - name: Bad\n    postcodes: ['50999-50000']\n";
        let err = parse_areas(yaml).unwrap_err();
        assert!(err.to_string().contains("inverted"));
    }

    #[test]
    fn rejects_malformed_postcode() {
        let yaml = "postcode_areas:\n  - name: Bad\n    postcodes: ['ABCDE']\n";
        let err = parse_areas(yaml).unwrap_err();
        assert!(err.to_string().contains("invalid postcode"));
    }

    #[test]
    fn rejects_duplicate_area_name() {
        let yaml = "postcode_areas:\n  - name: Dup\n    postcodes: ['50000']\n  - name: dup\n    postcodes: ['50001']\n";
        let err = parse_areas(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate area name"));
    }

    #[test]
    fn load_areas_from_real_file() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("areas.yaml");
        assert!(
            path.exists(),
            "areas.yaml missing at {path:?} — required for this test"
        );
        let table = load_areas(&path).expect("load areas.yaml");
        assert!(!table.postcode_areas().is_empty());
        assert!(!table.keyword_groups().is_empty());
    }
}
