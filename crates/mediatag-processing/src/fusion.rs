//! Tag fusion and deduplication.
//!
//! Ranking happens inside each source ([`rank_labels`], [`rank_phrases`]);
//! [`fuse`] only concatenates in priority order, dedupes and truncates.

use mediatag_plugins::{DetectedLabel, KeyPhrase};

/// Case-insensitive dedupe keeping the first occurrence's casing and order.
pub fn dedupe<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Concatenate `sources` in order, dedupe, and keep at most `cap` tags.
pub fn fuse(sources: &[&[String]], cap: usize) -> Vec<String> {
    let mut fused = dedupe(sources.iter().flat_map(|s| s.iter()));
    fused.truncate(cap);
    fused
}

/// Labels at or above `min_confidence`, most confident first, deduped, top `top_n`.
///
/// Video results repeat a label once per frame, so duplicates are removed
/// before truncating.
pub fn rank_labels(labels: &[DetectedLabel], min_confidence: f32, top_n: usize) -> Vec<String> {
    let mut kept: Vec<&DetectedLabel> = labels
        .iter()
        .filter(|l| l.confidence >= min_confidence)
        .collect();
    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut ranked = dedupe(kept.iter().map(|l| l.name.as_str()));
    ranked.truncate(top_n);
    ranked
}

/// Phrases at or above `min_score`, highest first, deduped, top `top_n`.
pub fn rank_phrases(phrases: &[KeyPhrase], min_score: f32, top_n: usize) -> Vec<String> {
    let mut kept: Vec<&KeyPhrase> = phrases.iter().filter(|p| p.score >= min_score).collect();
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut ranked = dedupe(kept.iter().map(|p| p.text.as_str()));
    ranked.truncate(top_n);
    ranked
}
