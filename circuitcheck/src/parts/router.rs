//! Part lookup routing with provider fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::mouser::MouserClient;
use super::octopart::OctopartClient;
use super::{PartLinks, PartsError, PartsLookup};
use crate::bom::BomRecord;
use crate::core::Deadline;

/// Routes part searches to whichever provider is configured, preferring one
/// and falling back to the other on failure.
pub struct PartsRouter {
    octopart: Option<Arc<OctopartClient>>,
    mouser: Option<Arc<MouserClient>>,
    preferred: RwLock<String>,
}

impl PartsRouter {
    /// Create a router with no providers configured.
    pub fn new() -> Self {
        Self {
            octopart: None,
            mouser: None,
            preferred: RwLock::new("octopart".to_string()),
        }
    }

    pub fn set_octopart_token(&mut self, token: String) {
        self.octopart = if token.is_empty() {
            None
        } else {
            Some(Arc::new(OctopartClient::new(token)))
        };
    }

    pub fn set_mouser_api_key(&mut self, key: String) {
        self.mouser = if key.is_empty() {
            None
        } else {
            Some(Arc::new(MouserClient::new(key)))
        };
    }

    pub async fn set_preferred(&self, provider: &str) {
        let mut pref = self.preferred.write().await;
        *pref = provider.to_string();
    }

    /// Configured providers in preference order.
    async fn providers(&self) -> Vec<Arc<dyn PartsLookup>> {
        let preferred = self.preferred.read().await.clone();
        let octopart = self
            .octopart
            .as_ref()
            .map(|c| c.clone() as Arc<dyn PartsLookup>);
        let mouser = self
            .mouser
            .as_ref()
            .map(|c| c.clone() as Arc<dyn PartsLookup>);
        let ordered = match preferred.as_str() {
            "mouser" => [mouser, octopart],
            _ => [octopart, mouser],
        };
        ordered.into_iter().flatten().collect()
    }

    /// Search for a part, trying each configured provider in order. The
    /// first provider that returns links wins; the last error is kept when
    /// all fail.
    pub async fn search_part(&self, part_number: &str) -> Result<PartLinks, PartsError> {
        let providers = self.providers().await;
        if providers.is_empty() {
            return Err(PartsError::MissingApiKey);
        }

        let mut last_error = PartsError::NotFound(part_number.to_string());
        for provider in providers {
            tracing::debug!(provider = provider.name(), part_number, "searching part");
            match provider.search_part(part_number).await {
                Ok(links) => return Ok(links),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), part_number, error = %e, "part search failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// Fill in missing datasheet and SPICE model links on BOM records by
    /// part search.
    ///
    /// Best-effort per record: a failed lookup leaves the record unchanged.
    /// The deadline is checked between records; expiry stops the pass early.
    /// Returns the number of records that gained at least one link.
    pub async fn enrich_bom(&self, records: &mut [BomRecord], deadline: Option<&Deadline>) -> usize {
        let mut enriched = 0;
        for record in records.iter_mut() {
            if deadline.map(Deadline::expired).unwrap_or(false) {
                tracing::warn!("enrichment deadline expired, stopping early");
                break;
            }
            if (record.datasheet.is_some() && record.spice_model_url.is_some())
                || record.part_number().is_empty()
            {
                continue;
            }
            let part_number = record.part_number().to_string();
            match self.search_part(&part_number).await {
                Ok(links) => {
                    let mut gained = false;
                    if record.datasheet.is_none() {
                        if let Some(url) = links.datasheet_url {
                            record.datasheet = Some(url);
                            gained = true;
                        }
                    }
                    if record.spice_model_url.is_none() {
                        if let Some(url) = links.spice_model_url {
                            record.spice_model_url = Some(url);
                            gained = true;
                        }
                    }
                    if gained {
                        enriched += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!(reference = %record.reference, part = %part_number, error = %e, "no links found");
                }
            }
        }
        enriched
    }

    /// Download a document into `dest_dir`, naming it after the last URL
    /// path segment.
    pub async fn download_document(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, PartsError> {
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PartsError::Download(format!(
                "{} returned {}",
                url, status
            )));
        }

        let file_name = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("document.pdf");
        let dest = dest_dir.join(file_name);
        let bytes = response.bytes().await?;
        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(|e| PartsError::Download(e.to_string()))?;
        tracing::info!(url, dest = %dest.display(), "downloaded document");
        Ok(dest)
    }
}

impl Default for PartsRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_providers_is_missing_key() {
        let router = PartsRouter::new();
        let err = router.search_part("IRF540N").await.unwrap_err();
        assert!(matches!(err, PartsError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_provider_order_follows_preference() {
        let mut router = PartsRouter::new();
        router.set_octopart_token("t".to_string());
        router.set_mouser_api_key("k".to_string());

        let names: Vec<String> = router
            .providers()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["octopart", "mouser"]);

        router.set_preferred("mouser").await;
        let names: Vec<String> = router
            .providers()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["mouser", "octopart"]);
    }

    #[tokio::test]
    async fn test_enrich_skips_records_with_datasheet() {
        let router = PartsRouter::new();
        let mut records = vec![BomRecord {
            reference: "R1".to_string(),
            value: "10k".to_string(),
            datasheet: Some("https://example.com/r.pdf".to_string()),
            ..Default::default()
        }];
        // No providers configured, and nothing to enrich anyway.
        assert_eq!(router.enrich_bom(&mut records, None).await, 0);
        assert!(records[0].datasheet.is_some());
    }

    #[tokio::test]
    async fn test_enrich_stops_on_expired_deadline() {
        let mut router = PartsRouter::new();
        router.set_octopart_token("t".to_string());
        let mut records = vec![BomRecord {
            reference: "Q1".to_string(),
            value: "IRF540N".to_string(),
            ..Default::default()
        }];
        let deadline = Deadline::after(std::time::Duration::ZERO);
        // Expired before the first record, so no network call is attempted.
        assert_eq!(router.enrich_bom(&mut records, Some(&deadline)).await, 0);
        assert!(records[0].datasheet.is_none());
    }
}
