use std::{collections::HashSet, sync::Arc};

use crate::api::{RecordId, ReplyRecord, ReviewRecord};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadState {
    /// Nothing was received from the backend yet
    NotLoaded,

    /// The initial fetch did not complete
    Failed(String),

    Loaded,
}

/// Flat review and reply collections, exactly as returned by the backend.
///
/// Records are never modified nor removed once stored: the only way to change the
/// contents is a wholesale `initialize` or an `append_*`.
#[derive(Clone, Debug)]
pub struct RecordStore {
    state: LoadState,
    reviews: Arc<Vec<ReviewRecord>>,
    replies: Arc<Vec<ReplyRecord>>,
    ids: HashSet<RecordId>,
}

impl RecordStore {
    pub fn new() -> RecordStore {
        RecordStore {
            state: LoadState::NotLoaded,
            reviews: Arc::new(Vec::new()),
            replies: Arc::new(Vec::new()),
            ids: HashSet::new(),
        }
    }

    /// Replaces both collections. If either is missing, the store goes back to the
    /// not-loaded state rather than pretending to be loaded but empty.
    pub fn initialize(
        &mut self,
        reviews: Option<Vec<ReviewRecord>>,
        replies: Option<Vec<ReplyRecord>>,
    ) {
        self.ids.clear();
        match (reviews, replies) {
            (Some(reviews), Some(replies)) => {
                self.ids.extend(reviews.iter().map(|r| r.id));
                self.ids.extend(replies.iter().map(|r| r.id));
                self.reviews = Arc::new(reviews);
                self.replies = Arc::new(replies);
                self.state = LoadState::Loaded;
            }
            _ => {
                self.reviews = Arc::new(Vec::new());
                self.replies = Arc::new(Vec::new());
                self.state = LoadState::NotLoaded;
            }
        }
    }

    pub fn fail_load(&mut self, message: String) {
        self.initialize(None, None);
        self.state = LoadState::Failed(message);
    }

    /// Returns `true` iff the reply was actually added
    pub fn append_reply(&mut self, reply: ReplyRecord) -> bool {
        if !self.can_append(reply.id) {
            return false;
        }
        self.ids.insert(reply.id);
        Arc::make_mut(&mut self.replies).push(reply);
        true
    }

    /// Returns `true` iff the review was actually added
    pub fn append_review(&mut self, review: ReviewRecord) -> bool {
        if !self.can_append(review.id) {
            return false;
        }
        self.ids.insert(review.id);
        Arc::make_mut(&mut self.reviews).push(review);
        true
    }

    fn can_append(&self, id: RecordId) -> bool {
        if self.state != LoadState::Loaded {
            tracing::warn!(?id, state=?self.state, "refusing to append to a store that is not loaded");
            return false;
        }
        if self.ids.contains(&id) {
            tracing::debug!(?id, "skipping already-known record");
            return false;
        }
        true
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        &self.reviews
    }

    pub fn replies(&self) -> &[ReplyRecord] {
        &self.replies
    }
}

impl Default for RecordStore {
    fn default() -> RecordStore {
        RecordStore::new()
    }
}
