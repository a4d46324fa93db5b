//! Investment decision: turn the accumulated analysis into a structured
//! scorecard and an approve/reject verdict.

use crate::domain::{Evaluation, RunState};
use crate::llm::{CompletionRequest, extract_json};
use crate::stages::StageContext;

const DECISION_SYSTEM_PROMPT: &str = "You are the investment committee of a venture fund. \
    Score the candidate using a JSON scorecard with these keys: \"overview\" (one paragraph), \
    then \"founders\", \"market\", \"product\", \"moat\", \"traction\", \"terms\", and \"risk\". \
    Each of those seven is an object mapping criterion names to integer points. Positive \
    sections award 0-2 points per criterion, three criteria each; \"risk\" holds deduction \
    points, 0-2 per criterion. Respond with the JSON object only.";

/// Run the decision stage. The verdict and scorecard are always set;
/// unusable collaborator output degrades to a rejecting fallback.
pub async fn run(ctx: &StageContext<'_>, mut state: RunState) -> RunState {
    let company = state.current_name().to_string();
    if company.is_empty() {
        log::warn!("decision stage invoked with no current candidate");
        return state;
    }

    let market = state.market_report.as_deref().unwrap_or("(no market evaluation)");
    let competitor = state
        .competitor_report
        .as_deref()
        .unwrap_or("(no competitor analysis)");
    let tags = if state.current_tags.is_empty() {
        "(none)".to_string()
    } else {
        state.current_tags.join(", ")
    };

    let request = CompletionRequest::new(DECISION_SYSTEM_PROMPT)
        .with_user_message(format!(
            "Candidate: {company}\nTags: {tags}\n\nMarket evaluation:\n{market}\n\n\
             Competitor analysis:\n{competitor}"
        ))
        .with_temperature(0.0);

    let evaluation = match ctx.llm.complete(request).await {
        Ok(response) => match extract_json(&response.content) {
            Some(value) => Evaluation::from_json(&value),
            None => {
                log::warn!("decision output for {company} was not a JSON object");
                Evaluation::fallback(response.content)
            }
        },
        Err(err) => {
            log::warn!("decision failed for {company}: {err}");
            Evaluation::fallback(format!("decision unavailable: {err}"))
        }
    };

    let verdict = if evaluation.approved { "approve" } else { "reject" };
    log::info!("decision for {company}: {verdict} (score {})", evaluation.final_score);

    state.log_decision(evaluation.approved, evaluation.final_score);
    state.decision_outcome = Some(evaluation.approved);
    state.evaluation = Some(evaluation);
    state
}
