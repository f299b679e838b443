//! Output ports (interfaces) for domain services.

use async_trait::async_trait;
use odata_batch::QueryParams;

use super::error::DomainError;
use super::model::{EntitySetName, EntitySetPayload};

/// Reads one entity set from the backend.
///
/// Shared by the single-entity route and the batch dispatcher, so both see the
/// same translation, normalization and error behavior.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    /// Fetch `entity_set` with the raw OData query of the incoming request.
    ///
    /// # Errors
    /// Returns an upstream [`DomainError`] for backend failures.
    async fn fetch(
        &self,
        entity_set: &EntitySetName,
        query: &QueryParams,
    ) -> Result<EntitySetPayload, DomainError>;
}
