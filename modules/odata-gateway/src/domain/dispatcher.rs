//! Executes the parts of a `$batch` envelope.

use std::sync::Arc;

use odata_batch::{BatchEnvelope, BatchResponse, BatchResult};
use tracing::{debug, instrument};

use super::error::DomainError;
use super::model::EntitySetName;
use super::ports::EntityFetcher;

/// Runs every embedded GET through the [`EntityFetcher`], in envelope order.
///
/// Parts are executed one after another. The first failure aborts the batch
/// and is returned as-is; no partial response is produced.
pub struct BatchDispatcher {
    fetcher: Arc<dyn EntityFetcher>,
}

impl BatchDispatcher {
    #[must_use]
    pub fn new(fetcher: Arc<dyn EntityFetcher>) -> Self {
        Self { fetcher }
    }

    /// The path of each embedded request is ignored; every part reads
    /// `entity_set`, the entity set named by the route.
    ///
    /// # Errors
    /// Returns the first error raised by the fetcher, or
    /// [`DomainError::Encode`] if a payload cannot be serialized.
    #[instrument(skip(self, envelope), fields(entity_set = %entity_set, parts = envelope.len()))]
    pub async fn dispatch(
        &self,
        entity_set: &EntitySetName,
        envelope: &BatchEnvelope,
    ) -> Result<BatchResponse, DomainError> {
        let mut response = BatchResponse::with_capacity(envelope.len());

        for (index, part) in envelope.iter().enumerate() {
            debug!(index, target = %part.path_and_query(), "dispatching batch part");
            let payload = self.fetcher.fetch(entity_set, &part.query_params()).await?;
            response.push(BatchResult::ok(serde_json::to_vec(&payload)?));
        }

        Ok(response)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use odata_batch::{BatchPart, QueryParams};
    use serde_json::json;

    use super::*;
    use crate::domain::model::EntitySetPayload;

    /// Records every call and fails on the call whose index is `fail_at`.
    struct RecordingFetcher {
        calls: Mutex<Vec<String>>,
        fail_at: Option<usize>,
    }

    impl RecordingFetcher {
        fn new(fail_at: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_at,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EntityFetcher for RecordingFetcher {
        async fn fetch(
            &self,
            entity_set: &EntitySetName,
            query: &QueryParams,
        ) -> Result<EntitySetPayload, DomainError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(query.to_query_string());
                calls.len() - 1
            };
            if self.fail_at == Some(index) {
                return Err(DomainError::Upstream {
                    status: 503,
                    body: "unavailable".to_owned(),
                });
            }
            let row = json!({ "Index": index }).as_object().cloned().unwrap();
            Ok(EntitySetPayload::new(entity_set, vec![row]))
        }
    }

    fn envelope(targets: &[&str]) -> BatchEnvelope {
        targets
            .iter()
            .enumerate()
            .map(|(i, t)| BatchPart::from_request_line(i, &format!("GET {t} HTTP/1.1")).unwrap())
            .collect::<Vec<_>>()
            .into()
    }

    fn flights() -> EntitySetName {
        EntitySetName::parse("Flights").unwrap()
    }

    #[tokio::test]
    async fn results_follow_envelope_order() {
        let fetcher = RecordingFetcher::new(None);
        let dispatcher = BatchDispatcher::new(fetcher.clone());

        let response = dispatcher
            .dispatch(
                &flights(),
                &envelope(&["Flights?$top=1", "Other?$select=Year", "Flights"]),
            )
            .await
            .unwrap();

        assert_eq!(
            fetcher.calls(),
            vec!["%24top=1", "%24select=Year", ""]
        );
        let bodies: Vec<serde_json::Value> = response
            .results()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        for (i, body) in bodies.iter().enumerate() {
            assert_eq!(body["@odata.context"], "$metadata#Flights");
            assert_eq!(body["value"][0]["Index"], i);
        }
    }

    #[tokio::test]
    async fn first_failure_aborts_remaining_parts() {
        let fetcher = RecordingFetcher::new(Some(1));
        let dispatcher = BatchDispatcher::new(fetcher.clone());

        let err = dispatcher
            .dispatch(&flights(), &envelope(&["Flights", "Flights", "Flights"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Upstream { status: 503, .. }));
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn empty_envelope_yields_empty_response() {
        let fetcher = RecordingFetcher::new(None);
        let dispatcher = BatchDispatcher::new(fetcher.clone());

        let response = dispatcher
            .dispatch(&flights(), &BatchEnvelope::default())
            .await
            .unwrap();

        assert!(response.is_empty());
        assert!(fetcher.calls().is_empty());
    }
}
