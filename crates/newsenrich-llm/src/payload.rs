//! Structured enrichment payload.
//!
//! The schema is fixed and validated once, here, when the service reply is
//! parsed. Downstream code can rely on every field having its declared type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content category of a news post
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ContentType {
    /// Global economy, monetary policy, geopolitics
    Macro,
    /// Sector-level updates (energy, steel, agriculture, ...)
    Industry,
    /// A single commodity's price, supply or demand
    Commodity,
    /// Breaking news and short-term events
    News,
}

impl ContentType {
    pub const ALL: [Self; 4] = [Self::Macro, Self::Industry, Self::Commodity, Self::News];

    /// Case-insensitive parse of a category name
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "macro" => Some(Self::Macro),
            "industry" => Some(Self::Industry),
            "commodity" => Some(Self::Commodity),
            "news" => Some(Self::News),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Industry => "industry",
            Self::Commodity => "commodity",
            Self::News => "news",
        }
    }
}

impl TryFrom<String> for ContentType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_name(&s).ok_or_else(|| {
            let expected: Vec<&str> = Self::ALL.iter().map(|ct| ct.name()).collect();
            format!("unknown content type {s:?}, expected one of {}", expected.join(", "))
        })
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of enriching one news post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub type_of_content: ContentType,
    /// Entity type → unique entity names
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Short description of the post's primary focus
    #[serde(default)]
    pub subject: String,
}

impl Payload {
    pub fn new(type_of_content: ContentType) -> Self {
        Self {
            type_of_content,
            entities: BTreeMap::new(),
            hashtags: Vec::new(),
            subject: String::new(),
        }
    }

    /// Parse model output into a payload.
    ///
    /// Accepts bare JSON or JSON wrapped in a Markdown code fence.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(strip_code_fence(content))
    }

    /// Encoding stored in the dataset's result column.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_payload() {
        let json = r##"{
            "type_of_content": "commodity",
            "entities": {"Commodity": ["Gold", "Iron Ore"], "Country": ["Turkey"]},
            "hashtags": ["#gold"],
            "subject": "Gold price surge"
        }"##;
        let p = Payload::parse(json).unwrap();
        assert_eq!(p.type_of_content, ContentType::Commodity);
        assert_eq!(p.entities["Commodity"], vec!["Gold", "Iron Ore"]);
        assert_eq!(p.hashtags, vec!["#gold"]);
        assert_eq!(p.subject, "Gold price surge");
    }

    #[test]
    fn optional_fields_default() {
        let p = Payload::parse(r#"{"type_of_content":"news"}"#).unwrap();
        assert_eq!(p, Payload::new(ContentType::News));
    }

    #[test]
    fn category_is_case_insensitive() {
        let p = Payload::parse(r#"{"type_of_content":"Macro"}"#).unwrap();
        assert_eq!(p.type_of_content, ContentType::Macro);
    }

    #[test]
    fn unknown_category_rejected() {
        let err = Payload::parse(r#"{"type_of_content":"sports"}"#).unwrap_err();
        assert!(
            err.to_string().contains("expected one of macro, industry, commodity, news"),
            "{err}"
        );
    }

    #[test]
    fn wrong_field_types_rejected() {
        assert!(Payload::parse(r##"{"type_of_content":"news","hashtags":"#a"}"##).is_err());
        assert!(Payload::parse(r#"{"type_of_content":"news","entities":{"Port":"Rotterdam"}}"#).is_err());
        assert!(Payload::parse("not json at all").is_err());
    }

    #[test]
    fn code_fence_is_stripped() {
        let fenced = "```json\n{\"type_of_content\":\"industry\"}\n```";
        assert_eq!(Payload::parse(fenced).unwrap().type_of_content, ContentType::Industry);
        let bare_fence = "```\n{\"type_of_content\":\"news\"}\n```\n";
        assert_eq!(Payload::parse(bare_fence).unwrap().type_of_content, ContentType::News);
    }

    #[test]
    fn encoding_uses_lowercase_category() {
        let json = Payload::new(ContentType::Macro).to_json().unwrap();
        assert!(json.contains(r#""type_of_content":"macro""#));
        assert_eq!(Payload::parse(&json).unwrap(), Payload::new(ContentType::Macro));
    }

    #[test]
    fn from_name_covers_all() {
        for ct in ContentType::ALL {
            assert_eq!(ContentType::from_name(ct.name()), Some(ct));
        }
        assert_eq!(ContentType::from_name("other"), None);
    }
}
