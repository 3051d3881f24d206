use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::{IntoParams, ToSchema};

use super::MediaResponse;

/// Relevance level of a natural-language search pass, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchPass {
    Strict,
    Lenient,
    Topic,
}

impl SearchPass {
    pub const ESCALATION: [SearchPass; 3] =
        [SearchPass::Strict, SearchPass::Lenient, SearchPass::Topic];
}

impl Display for SearchPass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SearchPass::Strict => write!(f, "strict"),
            SearchPass::Lenient => write!(f, "lenient"),
            SearchPass::Topic => write!(f, "topic"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Query text
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    /// Pass that produced the results (natural-language search only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pass: Option<SearchPass>,
    pub results: Vec<MediaResponse>,
    pub count: usize,
}
