use chrono::Utc;
use uuid::Uuid;

use crate::{Error, RecordId, Time, User};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,

    /// Review this reply transitively belongs to, set whatever the nesting depth
    pub parent_review_id: RecordId,

    /// Immediate parent, `None` when replying directly to the review
    #[serde(default)]
    pub parent_reply_id: Option<RecordId>,

    #[serde(rename = "userId", default)]
    pub author: Option<User>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub comment: String,

    pub created_at: Time,
}

impl ReplyRecord {
    pub fn now(author: Option<User>, reply: NewReply) -> ReplyRecord {
        ReplyRecord {
            id: RecordId(Uuid::new_v4()),
            parent_review_id: reply.parent_review_id,
            parent_reply_id: reply.parent_reply_id,
            author,
            is_anonymous: false,
            comment: reply.comment,
            created_at: Utc::now(),
        }
    }

    /// Id of the record this reply hangs under
    pub fn immediate_parent(&self) -> RecordId {
        self.parent_reply_id.unwrap_or(self.parent_review_id)
    }

    pub fn display_author(&self) -> Option<&str> {
        match self.is_anonymous {
            true => None,
            false => self.author.as_ref().map(|u| &u.name as &str),
        }
    }

    pub fn target(&self) -> ReplyTarget {
        ReplyTarget {
            review_id: self.parent_review_id,
            reply_id: Some(self.id),
        }
    }
}

/// Where a new reply goes: `review_id` is always the root review, `reply_id` is set
/// only when answering a nested reply
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ReplyTarget {
    pub review_id: RecordId,
    pub reply_id: Option<RecordId>,
}

impl ReplyTarget {
    pub fn review(review_id: RecordId) -> ReplyTarget {
        ReplyTarget {
            review_id,
            reply_id: None,
        }
    }

    /// Id of the node the composer is attached to
    pub fn node(&self) -> RecordId {
        self.reply_id.unwrap_or(self.review_id)
    }
}

/// Body of `POST /reviews/reply/{entityId}`
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReply {
    pub comment: String,
    pub parent_review_id: RecordId,
    pub parent_reply_id: Option<RecordId>,
}

impl NewReply {
    pub fn new(target: ReplyTarget, comment: String) -> NewReply {
        NewReply {
            comment,
            parent_review_id: target.review_id,
            parent_reply_id: target.reply_id,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_comment(&self.comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_explicit_null_parent() {
        let body = NewReply::new(ReplyTarget::review(RecordId::stub()), String::from("hi"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["comment"], "hi");
        assert_eq!(json["parentReviewId"], "ffffffff-ffff-ffff-ffff-ffffffffffff");
        assert!(json["parentReplyId"].is_null());
        assert!(json.as_object().unwrap().contains_key("parentReplyId"));
    }

    #[test]
    fn immediate_parent() {
        let review = RecordId(Uuid::new_v4());
        let parent = RecordId(Uuid::new_v4());
        let mut r = ReplyRecord::now(None, NewReply::new(ReplyTarget::review(review), "a".into()));
        assert_eq!(r.immediate_parent(), review);
        r.parent_reply_id = Some(parent);
        assert_eq!(r.immediate_parent(), parent);
        assert_eq!(r.target().review_id, review);
        assert_eq!(r.target().node(), r.id);
    }
}
