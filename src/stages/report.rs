//! Report writing: render the final Markdown artifact.
//!
//! Two shapes: a per-candidate investment report after an approval, and
//! a terminal portfolio review when the queue drained without a single
//! approval. Either way `report_emitted_ever` is set, so a run can never
//! loop back into report writing forever.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;

use crate::domain::RunState;
use crate::llm::CompletionRequest;
use crate::stages::StageContext;

const REPORT_SYSTEM_PROMPT: &str = "You are a venture analyst writing the final investment \
    memo for an approved deal. Using the scorecard overview and the score detail provided, \
    write a Markdown memo with sections for the investment thesis, market, competition, key \
    risks, and recommendation. Do not invent numbers beyond the scorecard.";

const REVIEW_SYSTEM_PROMPT: &str = "You are a venture analyst summarizing a screening run in \
    which no candidate was approved. Given the per-candidate verdicts and scores, write a \
    short Markdown review explaining the overall picture and what to look for next.";

/// Run the report stage. Always marks a report as emitted, even when
/// the memo body degraded, so the pipeline can terminate.
pub async fn run(ctx: &StageContext<'_>, mut state: RunState) -> RunState {
    let approved_current =
        state.current_candidate.is_some() && state.decision_outcome == Some(true);

    let (filename, content) = if approved_current {
        let company = state.current_name().to_string();
        (
            format!("{}_investment_report.md", safe_filename(&company)),
            candidate_report(ctx, &company, &state).await,
        )
    } else {
        ("screening_review.md".to_string(), screening_review(ctx, &state).await)
    };

    state.report_emitted_ever = true;
    match write_report(ctx, &filename, &content) {
        Ok(path) => {
            log::info!("report written to {}", path.display());
            state.last_report_path = Some(path);
        }
        Err(err) => log::error!("report write failed: {err}"),
    }
    state
}

async fn candidate_report(ctx: &StageContext<'_>, company: &str, state: &RunState) -> String {
    let evaluation = state.evaluation.as_ref();
    let overview = evaluation.map(|e| e.overview.as_str()).unwrap_or("");
    let score_table = evaluation.map(score_table).unwrap_or_default();

    let request = CompletionRequest::new(REPORT_SYSTEM_PROMPT)
        .with_user_message(format!(
            "Company: {company}\n\nScorecard overview:\n{overview}\n\nScore detail:\n{score_table}\n\n\
             Market evaluation:\n{}\n\nCompetitor analysis:\n{}",
            state.market_report.as_deref().unwrap_or("(none)"),
            state.competitor_report.as_deref().unwrap_or("(none)"),
        ))
        .with_temperature(0.3);

    let body = match ctx.llm.complete(request).await {
        Ok(response) => response.content.trim().to_string(),
        Err(err) => {
            log::warn!("memo generation failed for {company}: {err}");
            format!("_Memo generation unavailable: {err}_\n\n{overview}")
        }
    };

    let final_score = evaluation.map(|e| e.final_score).unwrap_or(0);
    format!(
        "# Investment Report: {company}\n\n_{}_\n\n{body}\n\n## Score Review\n\n\
         Final score: **{final_score}**\n\n{score_table}",
        Local::now().format("%Y-%m-%d"),
    )
}

async fn screening_review(ctx: &StageContext<'_>, state: &RunState) -> String {
    let verdicts = if state.decision_log.is_empty() {
        "No candidates were evaluated.".to_string()
    } else {
        state
            .decision_log
            .iter()
            .map(|entry| {
                let verdict = if entry.approved { "approve" } else { "reject" };
                format!("- {}: {verdict} (score {})", entry.name, entry.final_score)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let request = CompletionRequest::new(REVIEW_SYSTEM_PROMPT)
        .with_user_message(format!("Screening verdicts:\n{verdicts}"))
        .with_temperature(0.3);
    let body = match ctx.llm.complete(request).await {
        Ok(response) => response.content.trim().to_string(),
        Err(err) => {
            log::warn!("screening review generation failed: {err}");
            format!("_Review generation unavailable: {err}_")
        }
    };

    format!(
        "# Screening Review\n\n_{}_\n\n{body}\n\n## Verdicts\n\n{verdicts}",
        Local::now().format("%Y-%m-%d"),
    )
}

fn score_table(evaluation: &crate::domain::Evaluation) -> String {
    let mut lines = vec![
        "| Section | Subtotal | Detail |".to_string(),
        "|---|---|---|".to_string(),
    ];
    for (section, subtotal, detail) in evaluation.score_rows() {
        lines.push(format!("| {section} | {subtotal} | {detail} |"));
    }
    lines.join("\n")
}

fn write_report(ctx: &StageContext<'_>, filename: &str, content: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(ctx.report_dir)?;
    let path = ctx.report_dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// Reduce a display name to something safe as a filename stem.
pub fn safe_filename(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^\w.\- ]").expect("static regex"));
    let cleaned = unsafe_chars.replace_all(name.trim(), "_").replace(' ', "_");
    if cleaned.is_empty() { "report".to_string() } else { cleaned }
}
