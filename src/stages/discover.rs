//! Discovery: crawl the listing source, dedup each candidate against the
//! store, structure the new ones with the language model, persist them,
//! and seed the work queue.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::{MAX_TAGS, ProfileRecord, RunState, SECTION_ORDER};
use crate::error::Result;
use crate::llm::{CompletionRequest, extract_json};
use crate::stages::StageContext;
use crate::store::Deduplicator;

const STRUCTURE_SYSTEM_PROMPT: &str = "You are a data extraction assistant for a venture \
    investment team. Given raw text about a company, produce a single JSON object with the \
    string fields \"summary\", \"services\", \"team\", \"funding\", \"news\", \"info\" and a \
    \"tags\" array of at most 3 short lowercase labels. Use an empty string for any field the \
    text does not cover. Respond with the JSON object only.";

/// What discovery did, for logging and for the queue seed.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub created: Vec<String>,
    pub skipped: Vec<(String, String)>,
    pub errors: Vec<String>,
}

/// Run discovery and seed the queue.
///
/// Collaborator failures degrade (the candidate is recorded in
/// `errors` and skipped); a store outage is the one fatal error.
pub async fn run(ctx: &StageContext<'_>, mut state: RunState) -> Result<RunState> {
    let mut report = DiscoveryReport::default();

    let listings = match ctx.crawler.list_candidates(ctx.discovery_limit).await {
        Ok(listings) => listings,
        Err(err) => {
            log::error!("candidate listing failed: {err}");
            report.errors.push(format!("listing: {err}"));
            Vec::new()
        }
    };
    log::info!("discovery: {} candidates listed", listings.len());

    let urls: Vec<String> = listings.iter().filter_map(|l| l.source_url.clone()).collect();
    let mut page_texts: BTreeMap<String, String> = BTreeMap::new();
    if !urls.is_empty() {
        match ctx.crawler.fetch_details(&urls).await {
            Ok(details) => {
                for detail in details {
                    match (detail.full_text, detail.error) {
                        (Some(text), _) => {
                            page_texts.insert(detail.url, text);
                        }
                        (None, Some(err)) => {
                            log::warn!("detail fetch failed for {}: {err}", detail.url);
                        }
                        (None, None) => {}
                    }
                }
            }
            Err(err) => {
                log::warn!("detail fetch failed: {err}");
                report.errors.push(format!("details: {err}"));
            }
        }
    }

    let dedup = Deduplicator::new(ctx.store, ctx.embedder);
    for listing in &listings {
        let outcome = match dedup.resolve(&listing.name).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_store_unavailable() => return Err(err),
            Err(err) => {
                log::warn!("dedup failed for {}: {err}", listing.name);
                report.errors.push(format!("{}: {err}", listing.name));
                continue;
            }
        };

        match outcome {
            crate::store::ResolveOutcome::Exists { id, .. } => {
                log::info!("discovery: {} already stored as {id}", listing.name);
                report.skipped.push((listing.name.clone(), id));
            }
            crate::store::ResolveOutcome::New => {
                let page_text = listing
                    .source_url
                    .as_deref()
                    .and_then(|url| page_texts.get(url))
                    .map(String::as_str);
                let (sections, tags) =
                    structure_and_tag(ctx, &listing.name, &listing.summary, page_text).await;

                let record = ProfileRecord::company(
                    listing.name.clone(),
                    sections,
                    tags,
                    listing.source_url.clone(),
                );
                let embedding = match ctx.embedder.embed(&record.document_text()).await {
                    Ok(vector) => Some(vector),
                    Err(err) => {
                        log::warn!("embedding failed for {}: {err}", record.name);
                        report.errors.push(format!("{}: {err}", record.name));
                        None
                    }
                };
                ctx.store.upsert(&record, embedding.as_deref(), false)?;
                report.created.push(record.name.clone());
            }
        }
    }

    seed_queue(ctx, &mut state, &report)?;
    log::info!(
        "discovery done: {} created, {} skipped, {} errors, queue depth {}",
        report.created.len(),
        report.skipped.len(),
        report.errors.len(),
        state.pending_candidates.len()
    );
    Ok(state)
}

/// New names win; with nothing new, sample from the stored pool.
fn seed_queue(ctx: &StageContext<'_>, state: &mut RunState, report: &DiscoveryReport) -> Result<()> {
    let pool = if report.created.is_empty() {
        ctx.store.company_names()?
    } else {
        Vec::new()
    };
    let mut rng = rand::rng();
    state.pending_candidates.refill(&report.created, pool, &mut rng);
    Ok(())
}

/// Ask the model to structure raw page text into the section map plus
/// tags. Any failure degrades to a summary-only profile.
async fn structure_and_tag(
    ctx: &StageContext<'_>,
    name: &str,
    summary: &str,
    page_text: Option<&str>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut fallback = BTreeMap::new();
    if !summary.trim().is_empty() {
        fallback.insert("summary".to_string(), summary.trim().to_string());
    }

    let Some(page_text) = page_text else {
        return (fallback, Vec::new());
    };

    let excerpt: String = page_text.chars().take(6000).collect();
    let request = CompletionRequest::new(STRUCTURE_SYSTEM_PROMPT)
        .with_user_message(format!(
            "Company: {name}\nListing summary: {summary}\n\nPage text:\n{excerpt}"
        ))
        .with_temperature(0.0);

    let response = match ctx.llm.complete(request).await {
        Ok(response) => response,
        Err(err) => {
            log::warn!("structuring failed for {name}: {err}");
            return (fallback, Vec::new());
        }
    };

    let Some(value) = extract_json(&response.content) else {
        log::warn!("structuring returned no JSON object for {name}");
        return (fallback, Vec::new());
    };
    (parse_sections(&value, summary), parse_tags(&value))
}

fn parse_sections(value: &Value, summary: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    for name in SECTION_ORDER {
        if let Some(text) = value.get(name).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                sections.insert(name.to_string(), text.to_string());
            }
        }
    }
    // the listing summary is better than nothing
    if !sections.contains_key("summary") && !summary.trim().is_empty() {
        sections.insert("summary".to_string(), summary.trim().to_string());
    }
    sections
}

fn parse_tags(value: &Value) -> Vec<String> {
    value
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .take(MAX_TAGS)
                .collect()
        })
        .unwrap_or_default()
}
