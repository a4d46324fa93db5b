//! Market evaluation: grade the current candidate's market on three
//! axes using its own profile plus retrieved industry context.

use serde_json::Value;

use crate::domain::{ProfileKind, RunState};
use crate::error::{DealflowError, Result};
use crate::llm::{CompletionRequest, extract_json};
use crate::stages::{CONTEXT_CAP, StageContext, failure_note, join_context, truncate_chars};

/// Industry neighbours retrieved as grading context.
const INDUSTRY_K: usize = 5;

const GRADE_SYSTEM_PROMPT: &str = "You are a market analyst at a venture fund. Grade the \
    company's market on three axes, each an integer from 0 (weak) to 2 (strong): \
    \"market_size\", \"growth\", \"demand\". Add a short \"rationale\" string. Base the \
    grades on the provided company profile and industry context. Respond with a single \
    JSON object only.";

/// One market grade, every axis clamped to 0..=2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketGrade {
    pub market_size: i32,
    pub growth: i32,
    pub demand: i32,
    pub rationale: String,
}

impl MarketGrade {
    pub fn from_json(value: &Value) -> Self {
        Self {
            market_size: clamp_axis(value.get("market_size")),
            growth: clamp_axis(value.get("growth")),
            demand: clamp_axis(value.get("demand")),
            rationale: value
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string(),
        }
    }

    /// Framed rendering that downstream stages can quote verbatim.
    pub fn render(&self, company: &str) -> String {
        format!(
            "=== Market Evaluation: {company} ===\n\
             market size: {}/2\n\
             growth: {}/2\n\
             demand: {}/2\n\
             rationale: {}\n\
             === /Market Evaluation ===",
            self.market_size, self.growth, self.demand, self.rationale
        )
    }
}

fn clamp_axis(value: Option<&Value>) -> i32 {
    value.and_then(Value::as_i64).unwrap_or(0).clamp(0, 2) as i32
}

/// Run the market stage. Never leaves `market_report` unset: failures
/// degrade to a placeholder note, and prior report text survives either
/// branch.
pub async fn run(ctx: &StageContext<'_>, mut state: RunState) -> RunState {
    let company = state.current_name().to_string();
    if company.is_empty() {
        log::warn!("market stage invoked with no current candidate");
        return state;
    }
    let tags = state.current_tags.clone();

    let fresh = match evaluate(ctx, &company, &tags).await {
        Ok(grade) => grade.render(&company),
        Err(err) => {
            log::warn!("market evaluation failed for {company}: {err}");
            failure_note("market evaluation", &err)
        }
    };
    state.market_report = Some(match state.market_report.take() {
        Some(prior) if !prior.trim().is_empty() => format!("{fresh}\n\n{prior}"),
        _ => fresh,
    });
    state
}

async fn evaluate(ctx: &StageContext<'_>, company: &str, tags: &[String]) -> Result<MarketGrade> {
    let profile_context = match ctx.store.get_by_normalized_name(company, ProfileKind::Company) {
        Ok(Some(record)) => truncate_chars(&record.document_text(), CONTEXT_CAP),
        Ok(None) => String::new(),
        Err(err) => {
            log::warn!("profile lookup failed for {company}: {err}");
            String::new()
        }
    };
    let industry_context = industry_context(ctx, company, tags).await;
    let tags_line = if tags.is_empty() { "(none)".to_string() } else { tags.join(", ") };

    let request = CompletionRequest::new(GRADE_SYSTEM_PROMPT)
        .with_user_message(format!(
            "Company: {company}\nTags: {tags_line}\n\nCompany profile:\n{profile_context}\n\nIndustry context:\n{industry_context}"
        ))
        .with_temperature(0.0);
    let response = ctx.llm.complete(request).await?;

    match extract_json(&response.content) {
        Some(value) => Ok(MarketGrade::from_json(&value)),
        None => Err(DealflowError::MalformedResponse(format!(
            "market grade for {company} was not a JSON object"
        ))),
    }
}

/// Retrieve nearby industry reports as grading context, scoped to the
/// candidate's tags when it has any. Degrades to an empty block when
/// retrieval fails.
async fn industry_context(ctx: &StageContext<'_>, company: &str, tags: &[String]) -> String {
    let vector = match ctx.embedder.embed(company).await {
        Ok(vector) => vector,
        Err(err) => {
            log::warn!("industry context embedding failed for {company}: {err}");
            return String::new();
        }
    };
    let hits = match ctx.store.find_similar(&vector, ProfileKind::Industry, INDUSTRY_K) {
        Ok(hits) => hits,
        Err(err) => {
            log::warn!("industry retrieval failed for {company}: {err}");
            return String::new();
        }
    };

    let mut docs = Vec::new();
    for (id, _) in hits {
        match ctx.store.get(&id) {
            Ok(Some(record)) => {
                if tags.is_empty() || tags_overlap(tags, &record.tags) {
                    docs.push(record.document_text());
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("industry record {id} unreadable: {err}"),
        }
    }
    join_context(&docs, CONTEXT_CAP)
}

/// Case-folded tag intersection check.
fn tags_overlap(wanted: &[String], held: &[String]) -> bool {
    wanted.iter().any(|w| {
        let w = w.trim().to_lowercase();
        held.iter().any(|h| h.trim().to_lowercase() == w)
    })
}
