//! Trade-history analysis behind the insight endpoint.
//!
//! `InsightProvider` is the seam for a real model call. The only provider
//! shipped is `PlaceholderInsight`, which prepares the prompt a model would
//! receive and then answers with a fixed analysis.

mod placeholder;
mod prompt;

pub use placeholder::PlaceholderInsight;
pub use prompt::{build_prompt, ChatMessage, ChatRequest};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub resumen: String,
    pub fortalezas: Vec<String>,
    pub areas_mejora: Vec<String>,
    pub consejos: Vec<String>,
    pub patron_emocional: String,
}

#[async_trait]
pub trait InsightProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, trades: &[Trade]) -> Result<InsightReport>;
}
