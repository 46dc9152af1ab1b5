use std::{
    collections::{btree_map, BTreeMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use revue_client::{
    api::{
        self, AuthToken, EntityId, Error, Faculty, NewReply, NewReview, NewSession, RecordId,
        ReplyRecord, ReviewRecord, UserId, Uuid,
    },
    Backend, BackendError,
};

/// In-memory stand-in for the review service, for tests
pub struct MockServer {
    users: BTreeMap<UserId, DbUser>,
    faculty: BTreeMap<EntityId, DbFaculty>,
    fail_next: Option<Error>,
}

#[derive(Debug)]
struct DbUser {
    name: String,
    email: String,
    pass: String,
    sessions: HashSet<AuthToken>,
}

#[derive(Debug)]
struct DbFaculty {
    faculty: Faculty,
    reviews: Vec<ReviewRecord>,
    replies: Vec<ReplyRecord>,
}

impl DbFaculty {
    fn refresh_avg_rating(&mut self) {
        let ratings = self
            .reviews
            .iter()
            .filter_map(|r| r.rating)
            .map(|r| f64::from(r.get()))
            .collect::<Vec<_>>();
        self.faculty.avg_rating = match ratings.len() {
            0 => 0.,
            n => ratings.iter().sum::<f64>() / n as f64,
        };
    }

    fn has_review(&self, id: RecordId) -> bool {
        self.reviews.iter().any(|r| r.id == id)
    }

    fn reply(&self, id: RecordId) -> Option<&ReplyRecord> {
        self.replies.iter().find(|r| r.id == id)
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            faculty: BTreeMap::new(),
            fail_next: None,
        }
    }

    pub fn admin_create_user(
        &mut self,
        name: String,
        email: String,
        password: String,
    ) -> Result<UserId, Error> {
        api::validate_string(&name)?;
        NewSession::new(email.clone(), password.clone()).validate()?;
        if self.users.values().any(|u| u.email == email) {
            return Err(Error::NameAlreadyUsed(email));
        }
        let id = UserId(Uuid::new_v4());
        self.users.insert(
            id,
            DbUser {
                name,
                email,
                pass: password,
                sessions: HashSet::new(),
            },
        );
        Ok(id)
    }

    pub fn admin_create_faculty(&mut self, mut f: Faculty) -> Result<(), Error> {
        api::validate_string(&f.name)?;
        match self.faculty.entry(f.id) {
            btree_map::Entry::Occupied(_) => Err(Error::UuidAlreadyUsed(f.id.0)),
            btree_map::Entry::Vacant(entry) => {
                f.avg_rating = 0.;
                entry.insert(DbFaculty {
                    faculty: f,
                    reviews: Vec::new(),
                    replies: Vec::new(),
                });
                Ok(())
            }
        }
    }

    pub fn auth(&mut self, s: NewSession) -> Result<AuthToken, Error> {
        s.validate()?;
        for u in self.users.values_mut() {
            if u.email == s.email {
                if s.password != u.pass {
                    return Err(Error::PermissionDenied);
                }
                let tok = AuthToken(Uuid::new_v4());
                u.sessions.insert(tok);
                return Ok(tok);
            }
        }
        Err(Error::PermissionDenied)
    }

    pub fn unauth(&mut self, tok: AuthToken) -> Result<(), Error> {
        let id = self.resolve(Some(tok))?.id;
        if let Some(u) = self.users.get_mut(&id) {
            u.sessions.remove(&tok);
        }
        Ok(())
    }

    fn resolve(&self, tok: Option<AuthToken>) -> Result<api::User, Error> {
        let tok = tok.ok_or(Error::PermissionDenied)?;
        self.users
            .iter()
            .find(|(_, u)| u.sessions.contains(&tok))
            .map(|(id, u)| api::User {
                id: *id,
                name: u.name.clone(),
            })
            .ok_or(Error::PermissionDenied)
    }

    /// Makes the next call fail with `err`, whatever it is
    pub fn fail_next(&mut self, err: Error) {
        self.fail_next = Some(err);
    }

    fn check_failure(&mut self) -> Result<(), Error> {
        match self.fail_next.take() {
            Some(err) => {
                tracing::debug!(?err, "failing call on request");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn faculty(&self, id: EntityId) -> Result<&DbFaculty, Error> {
        self.faculty.get(&id).ok_or(Error::NotFound(id.0))
    }

    fn faculty_mut(&mut self, id: EntityId) -> Result<&mut DbFaculty, Error> {
        self.faculty.get_mut(&id).ok_or(Error::NotFound(id.0))
    }

    pub fn fetch_faculties(&mut self) -> Result<Vec<Faculty>, Error> {
        self.check_failure()?;
        Ok(self.faculty.values().map(|f| f.faculty.clone()).collect())
    }

    pub fn fetch_faculty(&mut self, id: EntityId) -> Result<Faculty, Error> {
        self.check_failure()?;
        Ok(self.faculty(id)?.faculty.clone())
    }

    pub fn fetch_reviews(&mut self, id: EntityId) -> Result<Vec<ReviewRecord>, Error> {
        self.check_failure()?;
        Ok(self.faculty(id)?.reviews.clone())
    }

    pub fn fetch_replies(&mut self, id: EntityId) -> Result<Vec<ReplyRecord>, Error> {
        self.check_failure()?;
        Ok(self.faculty(id)?.replies.clone())
    }

    pub fn create_review(
        &mut self,
        tok: Option<AuthToken>,
        id: EntityId,
        review: NewReview,
    ) -> Result<ReviewRecord, Error> {
        self.check_failure()?;
        let author = self.resolve(tok)?;
        review.validate()?;
        let f = self.faculty_mut(id)?;
        let review = ReviewRecord::now(Some(author), review);
        f.reviews.push(review.clone());
        f.refresh_avg_rating();
        Ok(review)
    }

    pub fn create_reply(
        &mut self,
        tok: Option<AuthToken>,
        id: EntityId,
        reply: NewReply,
    ) -> Result<ReplyRecord, Error> {
        self.check_failure()?;
        let author = self.resolve(tok)?;
        reply.validate()?;
        let f = self.faculty_mut(id)?;
        if !f.has_review(reply.parent_review_id) {
            return Err(Error::UnknownParent(reply.parent_review_id.0));
        }
        if let Some(parent) = reply.parent_reply_id {
            match f.reply(parent) {
                Some(p) if p.parent_review_id == reply.parent_review_id => (),
                _ => return Err(Error::UnknownParent(parent.0)),
            }
        }
        let reply = ReplyRecord::now(Some(author), reply);
        f.replies.push(reply.clone());
        Ok(reply)
    }

    /// Stores `reply` as-is, without checking anything about it
    pub fn test_insert_reply(&mut self, id: EntityId, reply: ReplyRecord) -> Result<(), Error> {
        self.faculty_mut(id)?.replies.push(reply);
        Ok(())
    }

    pub fn test_num_replies(&self, id: EntityId) -> usize {
        self.faculty.get(&id).map(|f| f.replies.len()).unwrap_or(0)
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

/// A `Backend` connected to a shared `MockServer`, authenticated as whoever `token`
/// belongs to
#[derive(Clone)]
pub struct MockBackend {
    server: Arc<tokio::sync::Mutex<MockServer>>,
    token: Option<AuthToken>,
}

impl MockBackend {
    pub fn new(server: Arc<tokio::sync::Mutex<MockServer>>, token: Option<AuthToken>) -> Self {
        MockBackend { server, token }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn fetch_faculties(&self) -> Result<Vec<Faculty>, BackendError> {
        Ok(self.server.lock().await.fetch_faculties()?)
    }

    async fn fetch_faculty(&self, entity: EntityId) -> Result<Faculty, BackendError> {
        Ok(self.server.lock().await.fetch_faculty(entity)?)
    }

    async fn fetch_reviews(&self, entity: EntityId) -> Result<Vec<ReviewRecord>, BackendError> {
        Ok(self.server.lock().await.fetch_reviews(entity)?)
    }

    async fn fetch_replies(&self, entity: EntityId) -> Result<Vec<ReplyRecord>, BackendError> {
        Ok(self.server.lock().await.fetch_replies(entity)?)
    }

    async fn create_reply(
        &self,
        entity: EntityId,
        reply: NewReply,
    ) -> Result<ReplyRecord, BackendError> {
        Ok(self
            .server
            .lock()
            .await
            .create_reply(self.token, entity, reply)?)
    }

    async fn create_review(
        &self,
        entity: EntityId,
        review: NewReview,
    ) -> Result<ReviewRecord, BackendError> {
        Ok(self
            .server
            .lock()
            .await
            .create_review(self.token, entity, review)?)
    }
}
