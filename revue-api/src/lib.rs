use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod auth;
pub use auth::{AuthToken, LoginResponse, NewSession};

mod error;
pub use error::Error;

mod faculty;
pub use faculty::{EntityId, Faculty};

mod reply;
pub use reply::{NewReply, ReplyRecord, ReplyTarget};

mod review;
pub use review::{NewReview, Rating, RecordId, ReviewRecord};

mod user;
pub use user::{User, UserId};

// The `validate` functions throughout revue-api are called by both the client, before
// sending anything, and the backend, before accepting anything. They only check what
// can be checked without looking at any other record.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(s.to_string()));
    }
    Ok(())
}

/// Comment bodies must be non-blank, for both reviews and replies
pub fn validate_comment(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::EmptyComment);
    }
    Ok(())
}
