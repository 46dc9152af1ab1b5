use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Uuid already used {0}")]
    UuidAlreadyUsed(Uuid),

    #[error("Name already used {0}")]
    NameAlreadyUsed(String),

    #[error("Nothing found with id {0}")]
    NotFound(Uuid),

    #[error("Reply parent {0} does not exist")]
    UnknownParent(Uuid),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("A course must be selected")]
    MissingCourse,

    #[error("Comment must not be empty")]
    EmptyComment,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::UuidAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::NameAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UnknownParent(_) => StatusCode::BAD_REQUEST,
            Error::InvalidRating(_) => StatusCode::BAD_REQUEST,
            Error::MissingCourse => StatusCode::BAD_REQUEST,
            Error::EmptyComment => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable message, as the backend would put in the `message` field
    pub fn message(&self) -> String {
        match self {
            Error::Unknown(msg) => msg.clone(),
            e => e.to_string(),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        let message = self.message();
        serde_json::to_vec(&match self {
            Error::Unknown(_) => json!({
                "message": message,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": message,
                "type": "permission-denied",
            }),
            Error::UuidAlreadyUsed(u) => json!({
                "message": message,
                "type": "conflict-uuid",
                "uuid": u,
            }),
            Error::NameAlreadyUsed(n) => json!({
                "message": message,
                "type": "conflict-name",
                "name": n,
            }),
            Error::NotFound(u) => json!({
                "message": message,
                "type": "not-found",
                "uuid": u,
            }),
            Error::UnknownParent(u) => json!({
                "message": message,
                "type": "unknown-parent",
                "uuid": u,
            }),
            Error::InvalidRating(r) => json!({
                "message": message,
                "type": "invalid-rating",
                "rating": r,
            }),
            Error::MissingCourse => json!({
                "message": message,
                "type": "missing-course",
            }),
            Error::EmptyComment => json!({
                "message": message,
                "type": "empty-comment",
            }),
            Error::NullByteInString(s) => json!({
                "message": message,
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        macro_rules! uuid_field {
            ($what:expr) => {
                data.get("uuid")
                    .and_then(|uuid| uuid.as_str())
                    .and_then(|uuid| Uuid::from_str(uuid).ok())
                    .ok_or_else(|| anyhow!("error is {} without a proper uuid", $what))?
            };
        }
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "permission-denied" => Error::PermissionDenied,
                "conflict-uuid" => Error::UuidAlreadyUsed(uuid_field!("a uuid conflict")),
                "conflict-name" => Error::NameAlreadyUsed(String::from(
                    data.get("name")
                        .and_then(|n| n.as_str())
                        .ok_or_else(|| anyhow!("error is a name conflict without a name"))?,
                )),
                "not-found" => Error::NotFound(uuid_field!("a not-found")),
                "unknown-parent" => Error::UnknownParent(uuid_field!("an unknown parent")),
                "invalid-rating" => Error::InvalidRating(
                    data.get("rating")
                        .and_then(|r| r.as_u64())
                        .and_then(|r| u8::try_from(r).ok())
                        .ok_or_else(|| anyhow!("error is an invalid rating without a rating"))?,
                ),
                "missing-course" => Error::MissingCourse,
                "empty-comment" => Error::EmptyComment,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
