use chrono::{Duration, Utc};

use crate::{
    api::{self, EntityId, NewReply, NewReview, ReplyRecord, ReplyTarget, ReviewRecord, Time},
    build_forest, Backend, BackendError, ExpansionState, Forest, LoadState, RecordStore,
};

/// Shown when the backend failed without saying why
pub const SUBMISSION_FALLBACK_MESSAGE: &str = "Failed to submit, please try again";

#[derive(Clone, Debug)]
pub struct DiscussionConfig {
    /// Children shown under each node before "show more" is needed
    pub reply_threshold: usize,

    /// Characters of a comment shown before "read more" is needed
    pub body_threshold: usize,

    pub notification_ttl: Duration,
}

impl Default for DiscussionConfig {
    fn default() -> DiscussionConfig {
        DiscussionConfig {
            reply_threshold: 2,
            body_threshold: 200,
            notification_ttl: Duration::seconds(3),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Comment must not be empty")]
    EmptyComment,

    #[error("No reply is being composed")]
    NoComposer,

    #[error("The discussion is not loaded")]
    NotLoaded,

    #[error("A submission is already in flight")]
    AlreadySubmitting,

    #[error("Invalid submission: {0}")]
    Invalid(api::Error),

    /// The discussion was torn down or reloaded while the backend was answering
    #[error("The discussion changed while submitting")]
    Stale,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SubmitError {
    fn from_validation(err: api::Error) -> SubmitError {
        match err {
            api::Error::EmptyComment => SubmitError::EmptyComment,
            err => SubmitError::Invalid(err),
        }
    }

    /// Message to show to the user: what the backend said if it said anything
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Backend(BackendError::Api(err)) => {
                let msg = err.message();
                match msg.trim().is_empty() {
                    true => String::from(SUBMISSION_FALLBACK_MESSAGE),
                    false => msg,
                }
            }
            SubmitError::Backend(BackendError::Transport(_)) => {
                String::from(SUBMISSION_FALLBACK_MESSAGE)
            }
            err => err.to_string(),
        }
    }
}

/// Transient, purely informational message
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub message: String,
    pub expires_at: Time,
}

/// A reply submission started by `Discussion::begin_submission`, to be sent to the
/// backend and then handed back to `Discussion::complete_submission`
#[derive(Clone, Debug)]
pub struct PendingSubmission {
    generation: u64,
    pub entity: EntityId,
    pub target: ReplyTarget,
    pub reply: NewReply,
}

/// The threaded discussion under one rated entity: its records, the forest built
/// from them, the display state, and the reply controller.
///
/// Only one submission can be in flight at a time. Tearing down or reloading the
/// discussion bumps its generation, and any response belonging to an earlier
/// generation is dropped instead of being applied.
pub struct Discussion {
    entity: EntityId,
    config: DiscussionConfig,
    store: RecordStore,
    forest: Option<Forest>,
    expansion: ExpansionState,
    generation: u64,
    in_flight: bool,
    notification: Option<Notification>,
}

impl Discussion {
    pub fn new(entity: EntityId, config: DiscussionConfig) -> Discussion {
        Discussion {
            entity,
            expansion: ExpansionState::new(config.reply_threshold, config.body_threshold),
            config,
            store: RecordStore::new(),
            forest: None,
            generation: 0,
            in_flight: false,
            notification: None,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn load_state(&self) -> &LoadState {
        self.store.state()
    }

    /// `None` until the discussion is successfully loaded
    pub fn forest(&self) -> Option<&Forest> {
        self.forest.as_ref()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn expansion_mut(&mut self) -> &mut ExpansionState {
        &mut self.expansion
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Fetches reviews and replies, replacing whatever was there
    pub async fn load<B>(&mut self, backend: &B) -> Result<(), BackendError>
    where
        B: ?Sized + Backend,
    {
        self.generation += 1;
        self.in_flight = false;
        let entity = self.entity;
        let (reviews, replies) = futures::join!(
            backend.fetch_reviews(entity),
            backend.fetch_replies(entity)
        );
        match (reviews, replies) {
            (Ok(reviews), Ok(replies)) => {
                tracing::debug!(
                    ?entity,
                    num_reviews = reviews.len(),
                    num_replies = replies.len(),
                    "loaded discussion"
                );
                self.initialize(Some(reviews), Some(replies));
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(?entity, %err, "failed loading discussion");
                self.store.fail_load(err.to_string());
                self.forest = None;
                Err(err)
            }
        }
    }

    /// Replaces the records with already-fetched ones. A missing collection leaves
    /// the discussion not loaded.
    pub fn initialize(
        &mut self,
        reviews: Option<Vec<ReviewRecord>>,
        replies: Option<Vec<ReplyRecord>>,
    ) {
        self.store.initialize(reviews, replies);
        self.rebuild();
    }

    /// Forgets everything. Responses to submissions started before are discarded.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.store = RecordStore::new();
        self.forest = None;
        self.expansion.reset();
        self.notification = None;
    }

    fn rebuild(&mut self) {
        self.forest = match self.store.is_loaded() {
            true => {
                let forest = build_forest(self.store.reviews(), self.store.replies());
                if !forest.diagnostics().is_empty() {
                    tracing::debug!(
                        entity=?self.entity,
                        num_excluded = forest.diagnostics().len(),
                        "some records were left out of the discussion"
                    );
                }
                Some(forest)
            }
            false => None,
        };
    }

    fn prepare_reply(&self) -> Result<PendingSubmission, SubmitError> {
        if self.in_flight {
            return Err(SubmitError::AlreadySubmitting);
        }
        if !self.store.is_loaded() {
            return Err(SubmitError::NotLoaded);
        }
        let composer = self.expansion.composer().ok_or(SubmitError::NoComposer)?;
        let reply = NewReply::new(composer.target, composer.draft.clone());
        reply.validate().map_err(SubmitError::from_validation)?;
        Ok(PendingSubmission {
            generation: self.generation,
            entity: self.entity,
            target: composer.target,
            reply,
        })
    }

    fn apply_reply(
        &mut self,
        target: ReplyTarget,
        result: Result<ReplyRecord, BackendError>,
    ) -> Result<ReplyRecord, SubmitError> {
        let reply = result.map_err(|err| {
            tracing::info!(%err, "reply submission failed");
            SubmitError::Backend(err)
        })?;
        if self.expansion.composer().map(|c| c.target) == Some(target) {
            self.expansion.close_composer();
        }
        match self.store.append_reply(reply.clone()) {
            true => {
                self.rebuild();
                self.notify(String::from("Reply posted"));
            }
            false => tracing::debug!(reply=?reply.id, "reply was already known"),
        }
        Ok(reply)
    }

    /// First half of a reply submission: validates the open composer's draft and
    /// marks a submission as in flight. Nothing is sent.
    pub fn begin_submission(&mut self) -> Result<PendingSubmission, SubmitError> {
        let pending = self.prepare_reply()?;
        self.in_flight = true;
        Ok(pending)
    }

    /// Second half of a reply submission, with the backend's answer. On failure the
    /// records are untouched and the composer keeps its draft.
    pub fn complete_submission(
        &mut self,
        pending: PendingSubmission,
        result: Result<ReplyRecord, BackendError>,
    ) -> Result<ReplyRecord, SubmitError> {
        if pending.generation != self.generation {
            tracing::info!(reply_target=?pending.target, "discarding answer to a stale submission");
            return Err(SubmitError::Stale);
        }
        self.in_flight = false;
        self.apply_reply(pending.target, result)
    }

    /// Gives up on a submission started by `begin_submission`, whose answer will never
    /// be handed to `complete_submission`. The composer and its draft are left alone.
    ///
    /// Returns `false` if `pending` belongs to an earlier generation, in which case
    /// nothing is changed.
    pub fn cancel_submission(&mut self, pending: PendingSubmission) -> bool {
        if pending.generation != self.generation {
            return false;
        }
        tracing::debug!(reply_target=?pending.target, "submission cancelled");
        self.in_flight = false;
        true
    }

    /// Submits the draft of the open composer
    pub async fn submit_draft<B>(&mut self, backend: &B) -> Result<ReplyRecord, SubmitError>
    where
        B: ?Sized + Backend,
    {
        let pending = self.prepare_reply()?;
        let result = backend.create_reply(pending.entity, pending.reply).await;
        self.apply_reply(pending.target, result)
    }

    /// Replies `comment` to `target`. The composer is moved to `target` and keeps
    /// `comment` as its draft, so nothing is lost if the submission fails.
    pub async fn submit_reply<B>(
        &mut self,
        backend: &B,
        target: ReplyTarget,
        comment: String,
    ) -> Result<ReplyRecord, SubmitError>
    where
        B: ?Sized + Backend,
    {
        if self.in_flight {
            return Err(SubmitError::AlreadySubmitting);
        }
        self.expansion.open_composer(target);
        self.expansion.set_draft(comment);
        self.submit_draft(backend).await
    }

    pub async fn submit_review<B>(
        &mut self,
        backend: &B,
        review: NewReview,
    ) -> Result<ReviewRecord, SubmitError>
    where
        B: ?Sized + Backend,
    {
        if self.in_flight {
            return Err(SubmitError::AlreadySubmitting);
        }
        if !self.store.is_loaded() {
            return Err(SubmitError::NotLoaded);
        }
        review.validate().map_err(SubmitError::from_validation)?;
        let review = backend
            .create_review(self.entity, review)
            .await
            .map_err(|err| {
                tracing::info!(%err, "review submission failed");
                SubmitError::Backend(err)
            })?;
        self.store.append_review(review.clone());
        self.rebuild();
        self.notify(String::from("Review submitted"));
        Ok(review)
    }

    fn notify(&mut self, message: String) {
        self.notification = Some(Notification {
            message,
            expires_at: Utc::now() + self.config.notification_ttl,
        });
    }

    /// The current notification, unless it expired before `now`
    pub fn notification(&self, now: Time) -> Option<&Notification> {
        self.notification.as_ref().filter(|n| n.expires_at > now)
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}
