use async_trait::async_trait;

use crate::api::{
    self, EntityId, Faculty, NewReply, NewReview, ReplyRecord, ReviewRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend answered, with an error
    #[error(transparent)]
    Api(#[from] api::Error),

    /// The backend could not be reached, or answered something unintelligible
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// The REST collaborator, as seen from the discussion engine.
///
/// Every call is authenticated by the implementation; a rejected credential comes
/// back as `api::Error::PermissionDenied`.
#[async_trait]
pub trait Backend {
    async fn fetch_faculties(&self) -> Result<Vec<Faculty>, BackendError>;
    async fn fetch_faculty(&self, entity: EntityId) -> Result<Faculty, BackendError>;

    /// `GET /reviews/{entityId}`
    async fn fetch_reviews(&self, entity: EntityId) -> Result<Vec<ReviewRecord>, BackendError>;

    /// `GET /reviews/replies/{entityId}`, all the replies transitively under `entity`
    async fn fetch_replies(&self, entity: EntityId) -> Result<Vec<ReplyRecord>, BackendError>;

    /// `POST /reviews/reply/{entityId}`
    async fn create_reply(
        &self,
        entity: EntityId,
        reply: NewReply,
    ) -> Result<ReplyRecord, BackendError>;

    /// `POST /reviews/{entityId}`
    async fn create_review(
        &self,
        entity: EntityId,
        review: NewReview,
    ) -> Result<ReviewRecord, BackendError>;
}
