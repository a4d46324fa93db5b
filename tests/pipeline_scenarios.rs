//! End-to-end pipeline scenarios over scripted collaborators.
//!
//! Each test wires the orchestrator with a static crawler, a scripted
//! mock model, and the deterministic hash embedder, then drives a full
//! run and checks the persisted profiles, the decisions, and the report
//! files left on disk.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use dealflow::crawler::{CandidateListing, StaticCrawler};
use dealflow::domain::{ProfileKind, ProfileRecord};
use dealflow::embed::HashEmbedder;
use dealflow::llm::MockLlmClient;
use dealflow::orchestrator::Orchestrator;
use dealflow::store::ProfileStore;

const STRUCTURE_A: &str = r#"{"summary": "robot bakery chain", "services": "baking", "team": "", "funding": "", "news": "", "info": "", "tags": ["food"]}"#;
const STRUCTURE_B: &str = r#"{"summary": "fraud detection for banks", "services": "risk APIs", "team": "", "funding": "", "news": "", "info": "", "tags": ["fintech", "security"]}"#;

const GRADE_WEAK: &str = r#"{"market_size": 0, "growth": 1, "demand": 0, "rationale": "niche"}"#;
const GRADE_STRONG: &str = r#"{"market_size": 2, "growth": 2, "demand": 2, "rationale": "huge"}"#;

const CARD_REJECT: &str = r#"{
    "overview": "weak fundamentals",
    "founders": {"experience": 1, "execution": 0, "commitment": 1},
    "market": {"size": 0, "growth": 1, "timing": 0},
    "product": {"differentiation": 1, "readiness": 0, "defensibility": 0},
    "moat": {"technical": 0, "network": 0, "brand": 0},
    "traction": {"revenue": 0, "retention": 1, "growth": 0},
    "terms": {"valuation": 1, "structure": 1, "ownership": 0},
    "risk": {"regulatory": 1, "concentration": 2, "execution": 1}
}"#;

const CARD_APPROVE: &str = r#"{
    "overview": "strong fundamentals across the board",
    "founders": {"experience": 2, "execution": 2, "commitment": 2},
    "market": {"size": 2, "growth": 2, "timing": 2},
    "product": {"differentiation": 2, "readiness": 2, "defensibility": 2},
    "moat": {"technical": 1, "network": 1, "brand": 1},
    "traction": {"revenue": 1, "retention": 1, "growth": 1},
    "terms": {"valuation": 1, "structure": 1, "ownership": 1},
    "risk": {"regulatory": 1, "concentration": 0, "execution": 0}
}"#;

fn listing(name: &str, url: &str) -> CandidateListing {
    CandidateListing {
        name: name.to_string(),
        summary: format!("{name} in one line"),
        source_url: Some(url.to_string()),
    }
}

fn orchestrator(
    db_dir: &TempDir,
    report_dir: &TempDir,
    llm: MockLlmClient,
    crawler: StaticCrawler,
) -> Orchestrator {
    let store = ProfileStore::open(&db_dir.path().join("profiles.db")).unwrap();
    Orchestrator::new(
        store,
        Arc::new(llm),
        Arc::new(HashEmbedder::new()),
        Arc::new(crawler),
        10,
        report_dir.path().to_path_buf(),
    )
}

fn report_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_reject_then_approve_writes_one_investment_report() {
    let db_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();

    let crawler = StaticCrawler::new(
        vec![
            listing("Crumb Robotics", "https://dir.example/crumb"),
            listing("LedgerGuard", "https://dir.example/ledgerguard"),
        ],
        HashMap::from([
            (
                "https://dir.example/crumb".to_string(),
                "Crumb Robotics automates bakeries.".to_string(),
            ),
            (
                "https://dir.example/ledgerguard".to_string(),
                "LedgerGuard sells fraud detection to banks.".to_string(),
            ),
        ]),
    );

    // discovery structures both, then per candidate: grade, competitor
    // text, scorecard; the approval adds one memo
    let llm = MockLlmClient::with_contents(vec![
        STRUCTURE_A,
        STRUCTURE_B,
        GRADE_WEAK,
        "bakery robots face little direct competition",
        CARD_REJECT,
        GRADE_STRONG,
        "crowded space but the strongest product",
        CARD_APPROVE,
        "## Thesis\nBest-in-class fraud detection.",
    ]);

    let orchestrator = orchestrator(&db_dir, &report_dir, llm, crawler);
    let state = orchestrator.run().await.unwrap();

    assert!(state.report_emitted_ever);
    assert!(state.current_candidate.is_none());
    assert_eq!(state.decision_log.len(), 2);
    assert_eq!(state.decision_log[0].name, "Crumb Robotics");
    assert!(!state.decision_log[0].approved);
    assert_eq!(state.decision_log[1].name, "LedgerGuard");
    assert!(state.decision_log[1].approved);

    assert_eq!(report_files(&report_dir), vec!["LedgerGuard_investment_report.md"]);
    let content = fs::read_to_string(state.last_report_path.unwrap()).unwrap();
    assert!(content.contains("# Investment Report: LedgerGuard"));
    assert!(content.contains("Best-in-class fraud detection."));

    assert_eq!(orchestrator.store().count(ProfileKind::Company).unwrap(), 2);
}

#[tokio::test]
async fn test_all_rejected_writes_screening_review() {
    let db_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();

    let crawler = StaticCrawler::new(
        vec![listing("Crumb Robotics", "https://dir.example/crumb")],
        HashMap::from([(
            "https://dir.example/crumb".to_string(),
            "Crumb Robotics automates bakeries.".to_string(),
        )]),
    );
    let llm = MockLlmClient::with_contents(vec![
        STRUCTURE_A,
        GRADE_WEAK,
        "no notable competitors",
        CARD_REJECT,
        "Nothing cleared the bar this run.",
    ]);

    let orchestrator = orchestrator(&db_dir, &report_dir, llm, crawler);
    let state = orchestrator.run().await.unwrap();

    assert!(state.report_emitted_ever);
    assert_eq!(report_files(&report_dir), vec!["screening_review.md"]);
    let content = fs::read_to_string(state.last_report_path.unwrap()).unwrap();
    assert!(content.contains("# Screening Review"));
    assert!(content.contains("- Crumb Robotics: reject"));
    assert!(content.contains("Nothing cleared the bar this run."));
}

#[tokio::test]
async fn test_known_candidate_is_not_duplicated() {
    let db_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();

    {
        let store = ProfileStore::open(&db_dir.path().join("profiles.db")).unwrap();
        let mut sections = BTreeMap::new();
        sections.insert("summary".to_string(), "robot bakery chain".to_string());
        let record = ProfileRecord::company("Crumb Robotics", sections, vec!["food".to_string()], None);
        store.upsert(&record, None, false).unwrap();
    }

    // same company again from the listing; dedup skips it before any
    // structuring call, and the queue falls back to the stored pool
    let crawler = StaticCrawler::new(
        vec![listing("Crumb Robotics", "https://dir.example/crumb")],
        HashMap::new(),
    );
    let llm = MockLlmClient::with_contents(vec![
        GRADE_WEAK,
        "no notable competitors",
        CARD_REJECT,
        "Nothing cleared the bar this run.",
    ]);

    let orchestrator = orchestrator(&db_dir, &report_dir, llm, crawler);
    let state = orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.store().count(ProfileKind::Company).unwrap(), 1);
    assert_eq!(state.decision_log.len(), 1);
    assert_eq!(state.decision_log[0].name, "Crumb Robotics");
    // tags resolved from the stored profile at dequeue
    assert!(state.current_tags.is_empty(), "tags cleared after drain");
}

#[tokio::test]
async fn test_empty_world_still_terminates_with_review() {
    let db_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();

    let crawler = StaticCrawler::new(vec![], HashMap::new());
    let llm = MockLlmClient::with_contents(vec!["An empty run."]);

    let orchestrator = orchestrator(&db_dir, &report_dir, llm, crawler);
    let state = orchestrator.run().await.unwrap();

    assert!(state.report_emitted_ever);
    assert!(state.current_candidate.is_none());
    assert!(state.decision_log.is_empty());
    let content = fs::read_to_string(state.last_report_path.unwrap()).unwrap();
    assert!(content.contains("No candidates were evaluated."));
}

#[tokio::test]
async fn test_store_outage_aborts_run() {
    let db_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("profiles.db");

    let store = ProfileStore::open(&db_path).unwrap();
    // break the schema out from under the orchestrator's handle
    let side = rusqlite::Connection::open(&db_path).unwrap();
    side.execute_batch("DROP TABLE profiles;").unwrap();

    let crawler = StaticCrawler::new(
        vec![listing("Crumb Robotics", "https://dir.example/crumb")],
        HashMap::new(),
    );
    let llm = MockLlmClient::with_contents(vec![]);

    let orchestrator = Orchestrator::new(
        store,
        Arc::new(llm),
        Arc::new(HashEmbedder::new()),
        Arc::new(crawler),
        10,
        report_dir.path().to_path_buf(),
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(err.is_store_unavailable(), "expected a surfaced store outage, got: {err}");
    // no report gets fabricated on the way out
    assert!(report_files(&report_dir).is_empty());
}

#[tokio::test]
async fn test_model_outage_degrades_to_rejections_not_a_crash() {
    let db_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();

    let crawler = StaticCrawler::new(
        vec![listing("Crumb Robotics", "https://dir.example/crumb")],
        HashMap::from([(
            "https://dir.example/crumb".to_string(),
            "Crumb Robotics automates bakeries.".to_string(),
        )]),
    );
    // nothing scripted: every model call fails
    let llm = MockLlmClient::with_contents(vec![]);

    let orchestrator = orchestrator(&db_dir, &report_dir, llm, crawler);
    let state = orchestrator.run().await.unwrap();

    // the profile still lands (summary-only), the verdict is a reject,
    // and the degraded review is still written
    assert_eq!(orchestrator.store().count(ProfileKind::Company).unwrap(), 1);
    assert_eq!(state.decision_log.len(), 1);
    assert!(!state.decision_log[0].approved);
    assert!(state.report_emitted_ever);
    assert_eq!(report_files(&report_dir), vec!["screening_review.md"]);
}
