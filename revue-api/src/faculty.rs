use uuid::Uuid;

use crate::STUB_UUID;

/// Identifies a rated entity, ie. a faculty member
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn stub() -> EntityId {
        EntityId(STUB_UUID)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub initials: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub courses: Vec<String>,

    /// Recomputed by the backend whenever a review is added
    #[serde(default)]
    pub avg_rating: f64,
}

impl Faculty {
    /// Case-insensitive substring match against the courses this faculty teaches.
    /// The empty query matches everyone.
    pub fn teaches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        query.is_empty() || self.courses.iter().any(|c| c.to_lowercase().contains(&query))
    }

    pub fn filter_by_course<'a>(faculties: &'a [Faculty], query: &str) -> Vec<&'a Faculty> {
        faculties.iter().filter(|f| f.teaches(query)).collect()
    }
}
