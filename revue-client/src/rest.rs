use anyhow::Context;
use async_trait::async_trait;

use crate::{
    api::{
        self, AuthToken, EntityId, Faculty, LoginResponse, NewReply, NewReview, NewSession,
        ReplyRecord, ReviewRecord,
    },
    Backend, BackendError,
};

/// `Backend` talking to the real REST service at `host`
#[derive(Clone, Debug)]
pub struct RestBackend {
    host: String,
    token: Option<AuthToken>,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(host: String, token: Option<AuthToken>) -> RestBackend {
        RestBackend {
            host: host.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `POST /users/login`
    pub async fn login(host: &str, session: NewSession) -> Result<AuthToken, BackendError> {
        session.validate()?;
        let backend = RestBackend::new(host.to_string(), None);
        let resp = backend
            .client
            .post(backend.url("users/login"))
            .json(&session)
            .send()
            .await
            .context("sending login request")?;
        let resp: LoginResponse = parse_response(resp).await?;
        Ok(resp.token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(token) => req.bearer_auth(token.0),
            None => req,
        }
    }

    async fn get<R>(&self, path: String) -> Result<R, BackendError>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = self
            .authed(self.client.get(self.url(&path)))
            .send()
            .await
            .with_context(|| format!("fetching {path}"))?;
        parse_response(resp).await
    }

    async fn post<B, R>(&self, path: String, body: &B) -> Result<R, BackendError>
    where
        B: serde::Serialize,
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = self
            .authed(self.client.post(self.url(&path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("posting to {path}"))?;
        parse_response(resp).await
    }
}

async fn parse_response<R>(resp: reqwest::Response) -> Result<R, BackendError>
where
    R: for<'de> serde::Deserialize<'de>,
{
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await.context("parsing backend response")?);
    }
    let body = resp.bytes().await.context("reading error response")?;
    Err(BackendError::Api(parse_error(status, &body)))
}

/// Understands both the structured error bodies and the bare `{"message": ...}` ones
fn parse_error(status: reqwest::StatusCode, body: &[u8]) -> api::Error {
    if let Ok(err) = api::Error::parse(body) {
        return err;
    }
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(String::from));
    match (status, message) {
        (status, None)
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN =>
        {
            api::Error::PermissionDenied
        }
        (_, message) => {
            tracing::debug!(%status, "backend error without a structured body");
            api::Error::Unknown(message.unwrap_or_default())
        }
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn fetch_faculties(&self) -> Result<Vec<Faculty>, BackendError> {
        self.get(String::from("faculty")).await
    }

    async fn fetch_faculty(&self, entity: EntityId) -> Result<Faculty, BackendError> {
        self.get(format!("faculty/{}", entity.0)).await
    }

    async fn fetch_reviews(&self, entity: EntityId) -> Result<Vec<ReviewRecord>, BackendError> {
        self.get(format!("reviews/{}", entity.0)).await
    }

    async fn fetch_replies(&self, entity: EntityId) -> Result<Vec<ReplyRecord>, BackendError> {
        self.get(format!("reviews/replies/{}", entity.0)).await
    }

    async fn create_reply(
        &self,
        entity: EntityId,
        reply: NewReply,
    ) -> Result<ReplyRecord, BackendError> {
        self.post(format!("reviews/reply/{}", entity.0), &reply)
            .await
    }

    async fn create_review(
        &self,
        entity: EntityId,
        review: NewReview,
    ) -> Result<ReviewRecord, BackendError> {
        self.post(format!("reviews/{}", entity.0), &review).await
    }
}
