use chrono::Utc;
use uuid::Uuid;

use crate::{Error, Time, User, STUB_UUID};

/// Identifier shared by reviews and replies: both live in the same id space, so a
/// reply can point to either kind of record as its parent
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn stub() -> RecordId {
        RecordId(STUB_UUID)
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = Error;

    fn try_from(r: u8) -> Result<Rating, Error> {
        match r {
            Rating::MIN..=Rating::MAX => Ok(Rating(r)),
            _ => Err(Error::InvalidRating(r)),
        }
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,

    /// Kept even for anonymous reviews, only hidden when displaying
    #[serde(rename = "userId", default)]
    pub author: Option<User>,
    #[serde(default)]
    pub is_anonymous: bool,

    /// `None` when absent, and also when the backend sent something out of range
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub comment: String,

    pub created_at: Time,
}

// A single bad rating must not make the whole list of reviews unreadable
fn lenient_rating<'de, D>(d: D) -> Result<Option<Rating>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = <Option<i64> as serde::Deserialize>::deserialize(d)?;
    Ok(raw
        .and_then(|r| u8::try_from(r).ok())
        .and_then(|r| Rating::try_from(r).ok()))
}

impl ReviewRecord {
    pub fn now(author: Option<User>, review: NewReview) -> ReviewRecord {
        ReviewRecord {
            id: RecordId(Uuid::new_v4()),
            author,
            is_anonymous: review.is_anonymous,
            rating: Some(review.rating),
            course: Some(review.course),
            comment: review.comment,
            created_at: Utc::now(),
        }
    }

    /// Name to display for the author, `None` if it must not be shown
    pub fn display_author(&self) -> Option<&str> {
        match self.is_anonymous {
            true => None,
            false => self.author.as_ref().map(|u| &u.name as &str),
        }
    }
}

/// Body of `POST /reviews/{entityId}`
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: Rating,
    pub course: String,
    pub comment: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.course)?;
        if self.course.trim().is_empty() {
            return Err(Error::MissingCourse);
        }
        crate::validate_comment(&self.comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert_eq!(Rating::try_from(0), Err(Error::InvalidRating(0)));
        assert_eq!(Rating::try_from(1).map(Rating::get), Ok(1));
        assert_eq!(Rating::try_from(5).map(Rating::get), Ok(5));
        assert_eq!(Rating::try_from(6), Err(Error::InvalidRating(6)));
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().get(), 4);
    }

    #[test]
    fn parses_backend_review() {
        let r: ReviewRecord = serde_json::from_str(
            r#"{
                "_id": "ffffffff-ffff-ffff-ffff-ffffffffffff",
                "userId": {"_id": "ffffffff-ffff-ffff-ffff-ffffffffffff", "name": "Alice"},
                "isAnonymous": true,
                "rating": 5,
                "course": "CSE110",
                "comment": "Great",
                "createdAt": "2024-03-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(r.id, RecordId::stub());
        assert_eq!(r.rating.map(Rating::get), Some(5));
        assert_eq!(r.author.as_ref().map(|u| &u.name as &str), Some("Alice"));
        assert_eq!(r.display_author(), None);
    }

    #[test]
    fn out_of_range_ratings_are_dropped() {
        let reviews: Vec<ReviewRecord> = serde_json::from_str(
            r#"[
                {"_id": "00000000-0000-0000-0000-000000000001", "rating": 9, "createdAt": "2024-03-01T10:00:00Z"},
                {"_id": "00000000-0000-0000-0000-000000000002", "rating": -3, "createdAt": "2024-03-01T10:00:00Z"},
                {"_id": "00000000-0000-0000-0000-000000000003", "rating": null, "createdAt": "2024-03-01T10:00:00Z"},
                {"_id": "00000000-0000-0000-0000-000000000004", "createdAt": "2024-03-01T10:00:00Z"},
                {"_id": "00000000-0000-0000-0000-000000000005", "rating": 3, "createdAt": "2024-03-01T10:00:00Z"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            reviews.iter().map(|r| r.rating.map(Rating::get)).collect::<Vec<_>>(),
            vec![None, None, None, None, Some(3)]
        );

        // New reviews are still strict
        assert!(serde_json::from_str::<NewReview>(
            r#"{"rating": 9, "course": "CSE110", "comment": "hi"}"#
        )
        .is_err());
    }

    #[test]
    fn new_review_validation() {
        let mut r = NewReview {
            rating: Rating::try_from(4).unwrap(),
            course: String::from("CSE110"),
            comment: String::from("Clear lectures"),
            is_anonymous: false,
        };
        assert_eq!(r.validate(), Ok(()));
        r.course = String::from("  ");
        assert_eq!(r.validate(), Err(Error::MissingCourse));
        r.course = String::from("CSE110");
        r.comment = String::new();
        assert_eq!(r.validate(), Err(Error::EmptyComment));
    }
}
