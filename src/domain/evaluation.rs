//! Investment scorecard arithmetic.
//!
//! The decision collaborator returns a JSON scorecard with per-section
//! integer items. Subtotals and the verdict are computed here rather than
//! trusted from the model: the final score is the sum of the positive
//! section subtotals minus the risk subtotal, and a candidate is approved
//! only when the final score reaches [`APPROVAL_SCORE`] and the market
//! section scored at least [`MIN_MARKET_SUBTOTAL`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sections that add to the final score, in report order.
pub const POSITIVE_SECTIONS: [&str; 6] = ["founders", "market", "product", "moat", "traction", "terms"];

/// Section whose subtotal is subtracted (higher = riskier).
pub const RISK_SECTION: &str = "risk";

/// Minimum final score for an approve verdict.
pub const APPROVAL_SCORE: i32 = 20;

/// Minimum market subtotal for an approve verdict.
pub const MIN_MARKET_SUBTOTAL: i32 = 2;

/// One scored section of the evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionScore {
    pub name: String,
    /// Item name → points, as returned by the collaborator
    pub items: Vec<(String, i32)>,
    pub subtotal: i32,
}

impl SectionScore {
    fn from_value(name: &str, value: Option<&Value>) -> Self {
        let mut items = Vec::new();
        if let Some(Value::Object(map)) = value {
            for (key, item) in map {
                if key == "subtotal" {
                    continue;
                }
                if let Some(points) = item.as_i64() {
                    items.push((key.clone(), points as i32));
                }
            }
        }
        let subtotal = items.iter().map(|(_, points)| points).sum();
        Self {
            name: name.to_string(),
            items,
            subtotal,
        }
    }
}

/// The full structured evaluation of one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub overview: String,
    pub sections: Vec<SectionScore>,
    pub final_score: i32,
    pub approved: bool,
    /// Raw collaborator output, kept only when parsing failed
    pub raw_output: Option<String>,
}

impl Evaluation {
    /// Build an evaluation from a parsed scorecard object, recomputing
    /// every subtotal and the verdict locally.
    pub fn from_json(value: &Value) -> Self {
        let overview = value
            .get("overview")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();

        let mut sections: Vec<SectionScore> = POSITIVE_SECTIONS
            .iter()
            .map(|name| SectionScore::from_value(name, value.get(name)))
            .collect();
        let risk = SectionScore::from_value(RISK_SECTION, value.get(RISK_SECTION));

        let positive_total: i32 = sections.iter().map(|s| s.subtotal).sum();
        let final_score = positive_total - risk.subtotal;
        let market_subtotal = sections
            .iter()
            .find(|s| s.name == "market")
            .map(|s| s.subtotal)
            .unwrap_or(0);
        sections.push(risk);

        Self {
            overview,
            sections,
            final_score,
            approved: final_score >= APPROVAL_SCORE && market_subtotal >= MIN_MARKET_SUBTOTAL,
            raw_output: None,
        }
    }

    /// Degraded evaluation for unparseable collaborator output: reject,
    /// keep the raw text for the report.
    pub fn fallback(raw: impl Into<String>) -> Self {
        Self {
            overview: String::new(),
            sections: Vec::new(),
            final_score: 0,
            approved: false,
            raw_output: Some(raw.into()),
        }
    }

    pub fn section_subtotal(&self, name: &str) -> i32 {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.subtotal)
            .unwrap_or(0)
    }

    /// Rows for the report score table: (section, subtotal, item detail).
    pub fn score_rows(&self) -> Vec<(String, i32, String)> {
        self.sections
            .iter()
            .map(|s| {
                let detail = s
                    .items
                    .iter()
                    .map(|(name, points)| format!("{name}:{points}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                (s.name.clone(), s.subtotal, detail)
            })
            .collect()
    }
}
