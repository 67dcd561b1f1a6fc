//! Mouser Search API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{PartLinks, PartsError, PartsLookup};

const MOUSER_API_URL: &str = "https://api.mouser.com/api/v1/search/partnumber";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchRequest<'a> {
    search_by_part_request: PartRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PartRequest<'a> {
    mouser_part_number: &'a str,
    part_search_options: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResponse {
    errors: Option<Vec<ApiError>>,
    search_results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResults {
    parts: Option<Vec<MouserPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MouserPart {
    manufacturer_part_number: Option<String>,
    manufacturer: Option<String>,
    data_sheet_url: Option<String>,
}

pub struct MouserClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl MouserClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: MOUSER_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint, for tests.
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }

    fn links_from_part(part: MouserPart, requested: &str) -> PartLinks {
        PartLinks {
            part_number: part
                .manufacturer_part_number
                .unwrap_or_else(|| requested.to_string()),
            manufacturer: part.manufacturer,
            datasheet_url: part.data_sheet_url.filter(|u| !u.is_empty()),
            // Mouser does not serve simulation models.
            spice_model_url: None,
            source: "mouser".to_string(),
        }
    }
}

#[async_trait]
impl PartsLookup for MouserClient {
    fn name(&self) -> &str {
        "mouser"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_part(&self, part_number: &str) -> Result<PartLinks, PartsError> {
        if self.api_key.is_empty() {
            return Err(PartsError::MissingApiKey);
        }

        let request = SearchRequest {
            search_by_part_request: PartRequest {
                mouser_part_number: part_number,
                part_search_options: "",
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("apiKey", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PartsError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PartsError::ParseError(e.to_string()))?;

        if let Some(errors) = body.errors {
            if !errors.is_empty() {
                let message = errors
                    .into_iter()
                    .filter_map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(PartsError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }
        }

        let part = body
            .search_results
            .and_then(|r| r.parts)
            .and_then(|mut parts| {
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.remove(0))
                }
            })
            .ok_or_else(|| PartsError::NotFound(part_number.to_string()))?;

        Ok(Self::links_from_part(part, part_number))
    }
}
