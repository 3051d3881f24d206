//! Keyword and natural-language search.
//!
//! Natural-language search asks the completion model to pick matching files
//! from a numbered listing of the whole corpus. It runs up to three passes
//! (strict, lenient, topic); the first pass with a match wins and later
//! passes are skipped. A failed completion counts as a pass with no match.

use mediatag_core::{AppError, MediaRecord, MediaResponse, SearchPass, SearchResponse};
use regex::Regex;
use std::sync::LazyLock;

use crate::context::ServiceContext;
use crate::error::metadata_error;

/// Sentinel the model replies with when no file matches.
pub const NO_MATCHES: &str = "NO_MATCHES";

const TRANSCRIPT_EXCERPT_CHARS: usize = 300;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Failed to compile number regex"));

fn empty_response(query: &str) -> SearchResponse {
    SearchResponse {
        query: query.to_string(),
        matched_pass: None,
        results: Vec::new(),
        count: 0,
    }
}

async fn to_responses(ctx: &ServiceContext, records: Vec<MediaRecord>) -> Vec<MediaResponse> {
    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let url = ctx.presign_or_empty(&record.file_key).await;
        results.push(MediaResponse::from_record(record, url));
    }
    results
}

/// Case-insensitive substring match on file names and tags.
#[tracing::instrument(skip(ctx))]
pub async fn keyword_search(ctx: &ServiceContext, query: &str) -> Result<SearchResponse, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(empty_response(query));
    }

    let records = ctx.metadata.keyword_search(query).await.map_err(metadata_error)?;
    let results = to_responses(ctx, records).await;
    tracing::debug!(count = results.len(), "Keyword search finished");

    Ok(SearchResponse {
        query: query.to_string(),
        matched_pass: None,
        count: results.len(),
        results,
    })
}

#[tracing::instrument(skip(ctx))]
pub async fn natural_language_search(
    ctx: &ServiceContext,
    query: &str,
) -> Result<SearchResponse, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(empty_response(query));
    }
    let Some(completer) = &ctx.completer else {
        tracing::warn!("Natural-language search requested but no completion provider is configured");
        return Ok(empty_response(query));
    };

    let records = ctx.metadata.scan().await.map_err(metadata_error)?;
    if records.is_empty() {
        return Ok(empty_response(query));
    }

    for pass in SearchPass::ESCALATION {
        let prompt = build_prompt(pass, query, &records);
        let start = std::time::Instant::now();
        let reply = match completer.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(pass = %pass, error = %e, "Search pass failed, treating as no match");
                continue;
            }
        };

        let indices = parse_indices(&reply, records.len());
        tracing::debug!(
            pass = %pass,
            matches = indices.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Search pass finished"
        );
        if indices.is_empty() {
            continue;
        }

        let matched: Vec<MediaRecord> = indices.into_iter().map(|i| records[i].clone()).collect();
        let results = to_responses(ctx, matched).await;
        return Ok(SearchResponse {
            query: query.to_string(),
            matched_pass: Some(pass),
            count: results.len(),
            results,
        });
    }

    tracing::info!("No search pass matched");
    Ok(empty_response(query))
}

fn pass_instructions(pass: SearchPass) -> &'static str {
    match pass {
        SearchPass::Strict => {
            "Only include files whose name, tags or transcript directly mention the query, \
             using the same or nearly the same words."
        }
        SearchPass::Lenient => {
            "Include files whose name, tags or transcript are semantically related to the \
             query, even when they use different words."
        }
        SearchPass::Topic => {
            "Include files that share the broad topic or theme of the query, even if the \
             connection is loose."
        }
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(TRANSCRIPT_EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Prompt for one pass over `records`, numbered from 1.
pub fn build_prompt(pass: SearchPass, query: &str, records: &[MediaRecord]) -> String {
    let mut listing = String::new();
    for (i, record) in records.iter().enumerate() {
        listing.push_str(&format!(
            "{}. name: {}; tags: {}; transcript: {}\n",
            i + 1,
            record.original_name,
            record.tags.join(", "),
            excerpt(&record.transcript)
        ));
    }

    format!(
        "You are searching a library of media files.\n\
         Query: \"{query}\"\n\n\
         {instructions}\n\n\
         Files:\n{listing}\n\
         Reply with the numbers of the matching files separated by commas. \
         If no file matches, reply with {sentinel} and nothing else.",
        query = query,
        instructions = pass_instructions(pass),
        listing = listing,
        sentinel = NO_MATCHES,
    )
}

/// Zero-based record indices named in a model reply.
///
/// Numbers are 1-based; out-of-range and repeated numbers are ignored. A
/// reply containing [`NO_MATCHES`] yields nothing.
pub fn parse_indices(reply: &str, corpus_len: usize) -> Vec<usize> {
    if reply.contains(NO_MATCHES) {
        return Vec::new();
    }
    let mut indices = Vec::new();
    for m in NUMBER.find_iter(reply) {
        let Ok(n) = m.as_str().parse::<usize>() else {
            continue;
        };
        if n == 0 || n > corpus_len {
            continue;
        }
        if !indices.contains(&(n - 1)) {
            indices.push(n - 1);
        }
    }
    indices
}
