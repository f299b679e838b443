//! HTTP adapter for the PostgREST-style backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use odata_batch::{QueryParams, normalize_row, translate};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::{Instrument, info_span, instrument};
use url::Url;

use crate::config::BackendConfig;
use crate::domain::error::DomainError;
use crate::domain::model::{EntityRow, EntitySetName, EntitySetPayload};
use crate::domain::ports::EntityFetcher;
use crate::secret::SecretString;

const API_KEY_HEADER: &str = "apikey";

/// [`EntityFetcher`] backed by one GET per call against `<base_url>/<entity_set>`.
pub struct BackendEntityFetcher {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl BackendEntityFetcher {
    /// # Errors
    /// Fails if the base URL is unusable or the HTTP client cannot be built.
    pub fn new(cfg: &BackendConfig) -> anyhow::Result<Self> {
        let base_url = cfg.parsed_base_url()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: cfg.api_key.clone(),
        })
    }

    /// `<base_url>/<entity_set>?<translated query>`.
    fn build_url(&self, entity_set: &EntitySetName, query: &QueryParams) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DomainError::UpstreamTransport(format!("base URL '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .push(entity_set.as_str());

        let backend_query = translate(query).to_query_string();
        url.set_query((!backend_query.is_empty()).then_some(backend_query.as_str()));
        Ok(url)
    }
}

#[async_trait]
impl EntityFetcher for BackendEntityFetcher {
    #[instrument(skip(self, query), fields(entity_set = %entity_set, target_url = tracing::field::Empty))]
    async fn fetch(
        &self,
        entity_set: &EntitySetName,
        query: &QueryParams,
    ) -> Result<EntitySetPayload, DomainError> {
        let start = Instant::now();
        let url = self.build_url(entity_set, query)?;
        tracing::Span::current().record("target_url", url.as_str());

        let key = self.api_key.expose();
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, key)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .header(ACCEPT, "application/json")
            .send()
            .instrument(info_span!("backend_request"))
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;

        // Duration in ms is always small enough for u64 in practice
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            status_code = status.as_u16(),
            duration_ms,
            body_size = body.len(),
            "backend request completed"
        );

        if !status.is_success() {
            tracing::warn!(status_code = status.as_u16(), "backend rejected request");
            return Err(DomainError::Upstream {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let rows = rows_from_body(&body)?;
        Ok(EntitySetPayload::new(entity_set, rows))
    }
}

fn map_transport_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::UpstreamTimeout
    } else if e.is_connect() {
        DomainError::UpstreamTransport(format!("connection error: {e}"))
    } else {
        DomainError::UpstreamTransport(format!("request error: {e}"))
    }
}

/// Decode a backend body into normalized rows, keeping row order.
fn rows_from_body(body: &[u8]) -> Result<Vec<EntityRow>, DomainError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DomainError::shape(format!("body is not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(DomainError::shape("expected a JSON array of rows"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(normalize_row(row)),
            _ => Err(DomainError::shape(format!("row {index} is not a JSON object"))),
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn fetcher(base_url: &str) -> BackendEntityFetcher {
        BackendEntityFetcher::new(&BackendConfig {
            base_url: base_url.to_owned(),
            api_key: SecretString::new("k"),
            timeout_secs: 1,
        })
        .unwrap()
    }

    fn flights() -> EntitySetName {
        EntitySetName::parse("Flights").unwrap()
    }

    #[test]
    fn url_joins_base_and_entity_set() {
        for base in ["https://db.example.com/rest/v1/", "https://db.example.com/rest/v1"] {
            let url = fetcher(base)
                .build_url(&flights(), &QueryParams::new())
                .unwrap();
            assert_eq!(url.as_str(), "https://db.example.com/rest/v1/Flights");
        }
    }

    #[test]
    fn url_carries_translated_query() {
        let query = QueryParams::parse("$select=Year,Origin&$filter=Origin%20eq%20JFK&limit=5");
        let url = fetcher("http://localhost:3000/")
            .build_url(&flights(), &query)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/Flights?select=Year%2COrigin&Origin=eq.JFK&limit=5"
        );
    }

    #[test]
    fn entity_set_is_a_single_encoded_segment() {
        let set = EntitySetName::parse("flight delays").unwrap();
        let url = fetcher("http://localhost:3000/")
            .build_url(&set, &QueryParams::new())
            .unwrap();
        assert_eq!(url.path(), "/flight%20delays");
    }

    #[test]
    fn rows_are_normalized_in_order() {
        let rows = rows_from_body(br#"[{"origin":"JFK","arrDelay":"5"},{"origin":"LAX"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Origin"], "JFK");
        assert_eq!(rows[0]["ArrDelay"], "5");
        assert_eq!(rows[1]["Origin"], "LAX");
    }

    #[test]
    fn empty_array_is_valid() {
        assert!(rows_from_body(b"[]").unwrap().is_empty());
    }

    #[test]
    fn non_array_bodies_are_shape_errors() {
        let bodies: [&[u8]; 4] = [
            br#"{"message":"x"}"#,
            b"[1,2]",
            br#"[{"a":1}, null]"#,
            b"not json",
        ];
        for body in bodies {
            assert!(
                matches!(rows_from_body(body), Err(DomainError::UpstreamShape { .. })),
                "{} should be rejected",
                String::from_utf8_lossy(body)
            );
        }
    }
}
