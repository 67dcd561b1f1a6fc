//! Octopart (Nexar) GraphQL client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{PartLinks, PartsError, PartsLookup};

const OCTOPART_API_URL: &str = "https://api.nexar.com/graphql";

const SEARCH_QUERY: &str = r#"
query ($q: String!) {
  supSearchMpn(q: $q, limit: 1) {
    results {
      part {
        mpn
        manufacturer { name }
        documentCollections {
          name
          documents { name url }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: SearchVariables<'a>,
}

#[derive(Debug, Serialize)]
struct SearchVariables<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    sup_search_mpn: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    results: Option<Vec<SearchResult>>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    part: Part,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    mpn: Option<String>,
    manufacturer: Option<Manufacturer>,
    document_collections: Option<Vec<DocumentCollection>>,
}

#[derive(Debug, Deserialize)]
struct Manufacturer {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DocumentCollection {
    name: Option<String>,
    documents: Option<Vec<Document>>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: Option<String>,
    url: Option<String>,
}

pub struct OctopartClient {
    client: Client,
    token: String,
    api_url: String,
}

impl OctopartClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            token,
            api_url: OCTOPART_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint, for tests.
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }

    fn links_from_part(part: Part, requested: &str) -> PartLinks {
        let mut links = PartLinks {
            part_number: part.mpn.unwrap_or_else(|| requested.to_string()),
            manufacturer: part.manufacturer.map(|m| m.name),
            source: "octopart".to_string(),
            ..Default::default()
        };

        for collection in part.document_collections.unwrap_or_default() {
            let collection_name = collection.name.unwrap_or_default().to_lowercase();
            for doc in collection.documents.unwrap_or_default() {
                let Some(url) = doc.url else { continue };
                let doc_name = doc.name.unwrap_or_default().to_lowercase();
                if links.datasheet_url.is_none()
                    && (collection_name.contains("datasheet") || doc_name.contains("datasheet"))
                {
                    links.datasheet_url = Some(url);
                } else if links.spice_model_url.is_none()
                    && (doc_name.contains("spice") || doc_name.contains("model"))
                {
                    links.spice_model_url = Some(url);
                }
            }
        }
        links
    }
}

#[async_trait]
impl PartsLookup for OctopartClient {
    fn name(&self) -> &str {
        "octopart"
    }

    fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    async fn search_part(&self, part_number: &str) -> Result<PartLinks, PartsError> {
        if self.token.is_empty() {
            return Err(PartsError::MissingApiKey);
        }

        let request = GraphQlRequest {
            query: SEARCH_QUERY,
            variables: SearchVariables { q: part_number },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
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

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| PartsError::ParseError(e.to_string()))?;

        if let Some(errors) = body.errors {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PartsError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let part = body
            .data
            .and_then(|d| d.sup_search_mpn)
            .and_then(|s| s.results)
            .and_then(|mut r| {
                if r.is_empty() {
                    None
                } else {
                    Some(r.remove(0).part)
                }
            })
            .ok_or_else(|| PartsError::NotFound(part_number.to_string()))?;

        Ok(Self::links_from_part(part, part_number))
    }
}
