//! Domain service for the gateway.
//!
//! Entry point for the REST handlers: validates the entity set, then
//! delegates to the fetcher, the batch dispatcher or the metadata renderer.

use std::sync::Arc;

use bytes::Bytes;
use odata_batch::{BatchEnvelope, QueryParams};
use tracing::instrument;

use super::dispatcher::BatchDispatcher;
use super::error::DomainError;
use super::metadata::render_edmx;
use super::model::{EntitySetName, EntitySetPayload};
use super::ports::EntityFetcher;
use crate::config::MetadataConfig;

pub struct Service {
    fetcher: Arc<dyn EntityFetcher>,
    dispatcher: BatchDispatcher,
    metadata: MetadataConfig,
}

impl Service {
    #[must_use]
    pub fn new(fetcher: Arc<dyn EntityFetcher>, metadata: MetadataConfig) -> Self {
        Self {
            dispatcher: BatchDispatcher::new(Arc::clone(&fetcher)),
            fetcher,
            metadata,
        }
    }

    /// `GET /odata/{entity_set}`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidEntitySet`] or any fetcher error.
    #[instrument(skip(self, raw_query))]
    pub async fn read_entity_set(
        &self,
        entity_set: &str,
        raw_query: Option<&str>,
    ) -> Result<EntitySetPayload, DomainError> {
        let entity_set = EntitySetName::parse(entity_set)?;
        let query = raw_query.map(QueryParams::parse).unwrap_or_default();
        self.fetcher.fetch(&entity_set, &query).await
    }

    /// `POST /odata/{entity_set}/$batch`. Returns the assembled multipart body.
    ///
    /// The envelope is fully parsed before the first backend call, so a
    /// malformed or non-GET part never causes any backend traffic.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidEntitySet`], [`DomainError::Batch`] or
    /// the first error raised while dispatching.
    #[instrument(skip(self, content_type, body), fields(body_size = body.len()))]
    pub async fn execute_batch(
        &self,
        entity_set: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Bytes, DomainError> {
        let entity_set = EntitySetName::parse(entity_set)?;
        let envelope = BatchEnvelope::parse(content_type, body)?;
        let response = self.dispatcher.dispatch(&entity_set, &envelope).await?;
        Ok(response.into_body())
    }

    /// `GET /odata/{entity_set}/$metadata`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidEntitySet`].
    pub fn metadata_document(&self, entity_set: &str) -> Result<String, DomainError> {
        let entity_set = EntitySetName::parse(entity_set)?;
        Ok(render_edmx(&entity_set, &self.metadata))
    }
}
