//! Core data types shared across ingestion, search, and the HTTP server.

use serde::{Deserialize, Serialize};

/// A research paper as stored in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A single search result: paper metadata annotated with both the raw index
/// score and the context-blended score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub venue: Option<String>,
    pub url: Option<String>,
    /// Raw inner-product similarity from the index, untouched by blending.
    pub base_score: f32,
    /// Context-blended score; equals `base_score` when the session has no
    /// history or the paper does not align with it.
    pub score: f32,
}
