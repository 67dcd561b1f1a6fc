//! Part metadata lookup.
//!
//! Defines a common interface over component search APIs (Octopart, Mouser)
//! used to resolve a part number to its datasheet and SPICE model links.

pub mod mouser;
pub mod octopart;
pub mod router;

pub use mouser::MouserClient;
pub use octopart::OctopartClient;
pub use router::PartsRouter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartsError {
    #[error("API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("No results for part '{0}'")]
    NotFound(String),
    #[error("Missing API key or no provider available")]
    MissingApiKey,
    #[error("Download failed: {0}")]
    Download(String),
}

/// Links resolved for one part number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartLinks {
    pub part_number: String,
    pub manufacturer: Option<String>,
    pub datasheet_url: Option<String>,
    pub spice_model_url: Option<String>,
    /// Provider that produced the links.
    pub source: String,
}

impl PartLinks {
    pub fn has_any(&self) -> bool {
        self.datasheet_url.is_some() || self.spice_model_url.is_some()
    }
}

/// Common trait for all part lookup providers.
#[async_trait]
pub trait PartsLookup: Send + Sync {
    /// Provider name for logs and link attribution.
    fn name(&self) -> &str;

    /// Whether the provider is configured with credentials.
    fn is_configured(&self) -> bool;

    /// Resolve a manufacturer part number to its document links.
    async fn search_part(&self, part_number: &str) -> Result<PartLinks, PartsError>;
}
