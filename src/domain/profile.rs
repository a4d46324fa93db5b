//! Persistent profile records and the name-folding rules built on them.
//!
//! A `ProfileRecord` is the unit the store persists: one per distinct
//! entity, discriminated by kind (company vs industry). The slug derived
//! from the entity name is the record id and is stable across
//! re-ingestion attempts, which is what makes upserts idempotent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tags are persisted as a single delimiter-joined string field so the
/// record survives simple key/value metadata stores.
pub const TAG_DELIMITER: &str = " | ";

/// Maximum number of tags kept per profile.
pub const MAX_TAGS: usize = 3;

/// Per-section character cap for the rendered document.
pub const SECTION_CHAR_CAP: usize = 2000;

/// Section names in render order. Empty sections are omitted from the
/// rendered document.
pub const SECTION_ORDER: [&str; 6] = ["summary", "services", "team", "funding", "news", "info"];

/// Discriminator for stored profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Company,
    Industry,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Company => "company",
            ProfileKind::Industry => "industry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "company" => Some(ProfileKind::Company),
            "industry" => Some(ProfileKind::Industry),
            _ => None,
        }
    }
}

/// A persisted entity profile.
///
/// The embedding vector is owned by the embedding collaborator; the
/// record itself never carries it, the store treats it as an opaque blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Normalized slug of the entity name, stable across re-ingestion
    pub id: String,
    pub kind: ProfileKind,
    /// Display form of the name, as first seen
    pub name: String,
    /// Short descriptive labels, at most [`MAX_TAGS`]
    pub tags: Vec<String>,
    /// Section name → text, each capped at [`SECTION_CHAR_CAP`] chars
    pub sections: BTreeMap<String, String>,
    pub source_url: Option<String>,
}

impl ProfileRecord {
    /// Build a company profile from structured sections, applying the tag
    /// bound and per-section caps.
    pub fn company(
        name: impl Into<String>,
        sections: BTreeMap<String, String>,
        tags: Vec<String>,
        source_url: Option<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: slugify(&name),
            kind: ProfileKind::Company,
            name,
            tags: clean_tags(tags),
            sections: cap_sections(sections),
            source_url,
        }
    }

    /// Build an industry report profile. The id folds sector and title so
    /// distinct reports for the same sector do not collide.
    pub fn industry(sector: &str, title: &str, body: impl Into<String>, source_url: Option<String>) -> Self {
        let truncated_title: String = title.chars().take(60).collect();
        let mut sections = BTreeMap::new();
        sections.insert("summary".to_string(), body.into());
        Self {
            id: slugify(&format!("{sector}-{truncated_title}")),
            kind: ProfileKind::Industry,
            name: title.to_string(),
            tags: vec![sector.to_string()],
            sections: cap_sections(sections),
            source_url,
        }
    }

    /// Render the document text that gets embedded and retrieved, one
    /// `[label] text` line per non-empty section.
    pub fn document_text(&self) -> String {
        let mut parts = vec![format!("[{}] {}", self.kind.as_str(), self.name)];
        for section in SECTION_ORDER {
            if let Some(text) = self.sections.get(section) {
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(format!("[{section}] {text}"));
                }
            }
        }
        parts.join("\n")
    }

    /// Tags as the single persisted string field.
    pub fn tags_joined(&self) -> String {
        self.tags.join(TAG_DELIMITER)
    }

    /// Inverse of [`tags_joined`](Self::tags_joined).
    pub fn split_tags(joined: &str) -> Vec<String> {
        joined
            .split('|')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .collect()
}

fn cap_sections(sections: BTreeMap<String, String>) -> BTreeMap<String, String> {
    sections
        .into_iter()
        .map(|(k, v)| {
            let capped = if v.chars().count() > SECTION_CHAR_CAP {
                v.chars().take(SECTION_CHAR_CAP).collect()
            } else {
                v
            };
            (k, capped)
        })
        .collect()
}

/// Derive a stable record id from an entity name: lowercase, runs of
/// non-alphanumerics fold to a single `-`, leading/trailing dashes
/// trimmed. Unicode letters survive, so Korean names slug to themselves.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut last_dash = true; // suppress a leading dash
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() { "doc".to_string() } else { slug }
}

/// Fold a name for equality comparison: trim, lowercase, strip all
/// whitespace. This is what makes "제이 카" and "제이카" the same entity.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("  Acme   Corp  "), "acme-corp");
    }

    #[test]
    fn test_slugify_punctuation_folds() {
        assert_eq!(slugify("Acme, Inc."), "acme-inc");
        assert_eq!(slugify("--Acme--"), "acme");
    }

    #[test]
    fn test_slugify_korean_preserved() {
        assert_eq!(slugify("제이카"), "제이카");
        assert_eq!(slugify("제이 카"), "제이-카");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "doc");
        assert_eq!(slugify("!!!"), "doc");
    }

    #[test]
    fn test_normalize_name_whitespace_fold() {
        assert_eq!(normalize_name("제이 카"), normalize_name("제이카"));
        assert_eq!(normalize_name("  Acme  Corp "), "acmecorp");
    }

    #[test]
    fn test_normalize_name_case_fold() {
        assert_eq!(normalize_name("ACME"), normalize_name("acme"));
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(ProfileKind::parse("company"), Some(ProfileKind::Company));
        assert_eq!(ProfileKind::parse("industry"), Some(ProfileKind::Industry));
        assert_eq!(ProfileKind::parse("other"), None);
        assert_eq!(ProfileKind::Company.as_str(), "company");
    }

    #[test]
    fn test_company_profile_tag_bound() {
        let tags = vec![
            "fintech".to_string(),
            " payments ".to_string(),
            "".to_string(),
            "b2b".to_string(),
            "extra".to_string(),
        ];
        let profile = ProfileRecord::company("Acme", BTreeMap::new(), tags, None);
        assert_eq!(profile.tags, vec!["fintech", "payments", "b2b"]);
        assert_eq!(profile.id, "acme");
    }

    #[test]
    fn test_section_cap_applied() {
        let mut sections = BTreeMap::new();
        sections.insert("summary".to_string(), "x".repeat(5000));
        let profile = ProfileRecord::company("Acme", sections, vec![], None);
        assert_eq!(profile.sections["summary"].chars().count(), SECTION_CHAR_CAP);
    }

    #[test]
    fn test_document_text_skips_empty_sections() {
        let mut sections = BTreeMap::new();
        sections.insert("summary".to_string(), "A delivery startup".to_string());
        sections.insert("team".to_string(), "  ".to_string());
        let profile = ProfileRecord::company("Gridy", sections, vec![], None);
        let doc = profile.document_text();
        assert!(doc.starts_with("[company] Gridy"));
        assert!(doc.contains("[summary] A delivery startup"));
        assert!(!doc.contains("[team]"));
    }

    #[test]
    fn test_document_text_section_order() {
        let mut sections = BTreeMap::new();
        sections.insert("news".to_string(), "n".to_string());
        sections.insert("summary".to_string(), "s".to_string());
        let profile = ProfileRecord::company("Acme", sections, vec![], None);
        let doc = profile.document_text();
        let summary_pos = doc.find("[summary]").unwrap();
        let news_pos = doc.find("[news]").unwrap();
        assert!(summary_pos < news_pos);
    }

    #[test]
    fn test_tags_joined_round_trip() {
        let profile = ProfileRecord::company(
            "Acme",
            BTreeMap::new(),
            vec!["clean tech".to_string(), "last mile".to_string()],
            None,
        );
        let joined = profile.tags_joined();
        assert_eq!(joined, "clean tech | last mile");
        assert_eq!(ProfileRecord::split_tags(&joined), profile.tags);
    }

    #[test]
    fn test_split_tags_ignores_blank_segments() {
        assert_eq!(ProfileRecord::split_tags(" | a || b | "), vec!["a", "b"]);
        assert!(ProfileRecord::split_tags("").is_empty());
    }

    #[test]
    fn test_industry_profile_id_folds_sector_and_title() {
        let profile = ProfileRecord::industry("mobility", "EV charging 2025", "body", None);
        assert_eq!(profile.id, "mobility-ev-charging-2025");
        assert_eq!(profile.kind, ProfileKind::Industry);
        assert_eq!(profile.tags, vec!["mobility"]);
    }
}
