//! Competitor analysis: retrieve the nearest stored companies to the
//! current candidate and have the model compare them.

use crate::domain::{ProfileKind, RunState, slugify};
use crate::error::Result;
use crate::llm::CompletionRequest;
use crate::stages::{CONTEXT_CAP, EXCERPT_CAP, StageContext, failure_note, truncate_chars};

/// Neighbours fetched before the candidate itself is excluded.
const COMPETITOR_K: usize = 4;

/// Competitors kept after exclusion.
const COMPETITOR_LIMIT: usize = 3;

const COMPETITOR_SYSTEM_PROMPT: &str = "You are a venture analyst writing a competitor \
    review. Given a company profile and excerpts of similar companies, write a concise \
    analysis covering the competitive landscape, each competitor's position, the company's \
    advantages and weaknesses, and an overall read on its competitive standing.";

/// Run the competitor stage. Degrades to a placeholder note on failure.
pub async fn run(ctx: &StageContext<'_>, mut state: RunState) -> RunState {
    let company = state.current_name().to_string();
    if company.is_empty() {
        log::warn!("competitor stage invoked with no current candidate");
        return state;
    }
    let tags = state.current_tags.clone();

    match analyze(ctx, &company, &tags).await {
        Ok(report) => state.competitor_report = Some(report),
        Err(err) => {
            log::warn!("competitor analysis failed for {company}: {err}");
            state.competitor_report = Some(failure_note("competitor analysis", &err));
        }
    }
    state
}

async fn analyze(ctx: &StageContext<'_>, company: &str, tags: &[String]) -> Result<String> {
    let own = ctx.store.get_by_normalized_name(company, ProfileKind::Company)?;
    let (own_id, own_doc) = match own {
        Some(record) => (record.id.clone(), record.document_text()),
        None => (slugify(company), format!("[company] {company} (no stored profile)")),
    };

    let competitors = retrieve_competitors(ctx, &own_id, &own_doc).await?;
    let competitor_block = if competitors.is_empty() {
        "No similar companies are stored yet.".to_string()
    } else {
        competitors.join("\n\n")
    };
    let tags_line = if tags.is_empty() { "(none)".to_string() } else { tags.join(", ") };

    let request = CompletionRequest::new(COMPETITOR_SYSTEM_PROMPT)
        .with_user_message(format!(
            "Company: {company}\nTags: {tags_line}\n\nProfile:\n{}\n\nSimilar companies:\n{competitor_block}",
            truncate_chars(&own_doc, CONTEXT_CAP)
        ))
        .with_temperature(0.2);
    let response = ctx.llm.complete(request).await?;
    Ok(response.content.trim().to_string())
}

/// Nearest stored companies by profile similarity, excluding the
/// candidate itself, rendered as short excerpts.
async fn retrieve_competitors(
    ctx: &StageContext<'_>,
    own_id: &str,
    own_doc: &str,
) -> Result<Vec<String>> {
    let vector = ctx.embedder.embed(own_doc).await?;
    let hits = ctx.store.find_similar(&vector, ProfileKind::Company, COMPETITOR_K)?;

    let mut excerpts = Vec::new();
    for (id, _) in hits {
        if id == own_id {
            continue;
        }
        if excerpts.len() == COMPETITOR_LIMIT {
            break;
        }
        match ctx.store.get(&id) {
            Ok(Some(record)) => {
                let excerpt = truncate_chars(&record.document_text(), EXCERPT_CAP);
                excerpts.push(format!("- {}\n{excerpt}", record.name));
            }
            Ok(None) => {}
            Err(err) => log::warn!("competitor record {id} unreadable: {err}"),
        }
    }
    Ok(excerpts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::StaticCrawler;
    use crate::domain::{CandidateRef, ProfileRecord};
    use crate::embed::{Embedder, HashEmbedder};
    use crate::llm::MockLlmClient;
    use crate::store::ProfileStore;
    use std::collections::{BTreeMap, HashMap};
    use std::path::Path;

    fn ctx<'a>(
        store: &'a ProfileStore,
        llm: &'a MockLlmClient,
        embedder: &'a HashEmbedder,
        crawler: &'a StaticCrawler,
    ) -> StageContext<'a> {
        StageContext {
            store,
            llm,
            embedder,
            crawler,
            discovery_limit: 10,
            report_dir: Path::new("/tmp"),
        }
    }

    async fn seed_company(store: &ProfileStore, embedder: &HashEmbedder, name: &str, summary: &str) {
        let mut sections = BTreeMap::new();
        sections.insert("summary".to_string(), summary.to_string());
        let record = ProfileRecord::company(name, sections, vec![], None);
        let vector = embedder.embed(&record.document_text()).await.unwrap();
        store.upsert(&record, Some(&vector), false).unwrap();
    }

    fn state_for(name: &str) -> RunState {
        let mut state = RunState::new();
        state.begin_candidate(CandidateRef::new(name), vec![]);
        state
    }

    #[tokio::test]
    async fn test_excludes_self_from_competitors() {
        let store = ProfileStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new();
        seed_company(&store, &embedder, "Acme Pay", "payment rails for merchants").await;
        seed_company(&store, &embedder, "PayRival", "payment rails for shops").await;

        let llm = MockLlmClient::with_contents(vec!["competitive landscape analysis"]);
        let crawler = StaticCrawler::new(vec![], HashMap::new());

        let state = run(&ctx(&store, &llm, &embedder, &crawler), state_for("Acme Pay")).await;
        assert_eq!(state.competitor_report.unwrap(), "competitive landscape analysis");

        let requests = llm.recorded_requests();
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("- PayRival"));
        assert!(!prompt.contains("- Acme Pay"));
    }

    #[tokio::test]
    async fn test_prompt_carries_candidate_tags() {
        let store = ProfileStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new();
        seed_company(&store, &embedder, "Acme Pay", "payment rails").await;

        let llm = MockLlmClient::with_contents(vec!["analysis"]);
        let crawler = StaticCrawler::new(vec![], HashMap::new());

        let mut state = RunState::new();
        state.begin_candidate(
            CandidateRef::new("Acme Pay"),
            vec!["fintech".to_string(), "payments".to_string()],
        );
        run(&ctx(&store, &llm, &embedder, &crawler), state).await;

        let requests = llm.recorded_requests();
        assert!(requests[0].messages[0].content.contains("Tags: fintech, payments"));
    }

    #[tokio::test]
    async fn test_no_competitors_still_analyzes() {
        let store = ProfileStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new();
        seed_company(&store, &embedder, "Acme Pay", "payment rails").await;

        let llm = MockLlmClient::with_contents(vec!["stands alone"]);
        let crawler = StaticCrawler::new(vec![], HashMap::new());

        let state = run(&ctx(&store, &llm, &embedder, &crawler), state_for("Acme Pay")).await;
        assert_eq!(state.competitor_report.unwrap(), "stands alone");

        let requests = llm.recorded_requests();
        assert!(requests[0].messages[0].content.contains("No similar companies"));
    }

    #[tokio::test]
    async fn test_missing_profile_uses_name_only() {
        let store = ProfileStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new();
        let llm = MockLlmClient::with_contents(vec!["thin analysis"]);
        let crawler = StaticCrawler::new(vec![], HashMap::new());

        let state = run(&ctx(&store, &llm, &embedder, &crawler), state_for("Unknown Co")).await;
        assert_eq!(state.competitor_report.unwrap(), "thin analysis");
    }

    #[tokio::test]
    async fn test_llm_failure_leaves_placeholder() {
        let store = ProfileStore::open_in_memory().unwrap();
        let embedder = HashEmbedder::new();
        let llm = MockLlmClient::with_contents(vec![]);
        let crawler = StaticCrawler::new(vec![], HashMap::new());

        let state = run(&ctx(&store, &llm, &embedder, &crawler), state_for("Acme Pay")).await;
        assert!(
            state
                .competitor_report
                .unwrap()
                .contains("competitor analysis unavailable")
        );
    }
}
