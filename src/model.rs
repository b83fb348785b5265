//! Request-scoped data model.
//!
//! Everything here is built fresh from store snapshots for one listing request
//! and dropped when the response is written.

use crate::text::{fold, non_empty_str, value_to_float};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A schemaless stored document body.
pub type Record = Map<String, Value>;

/// Canonical field names. Legacy spellings are folded onto these by
/// [`crate::store::normalize`] before records reach the core.
pub mod fields {
    pub const POST_TAGS: &str = "postTags";
    pub const POST_TITLE: &str = "postTitle";
    pub const POST_DESCRIPTION: &str = "postDescription";
    pub const DATE_POSTED: &str = "datePosted";

    pub const USER_EMAIL: &str = "userEmail";
    pub const USER_TAGS: &str = "userTags";
    pub const USER_FIRST_NAME: &str = "userFirstname";
    pub const USER_LAST_NAME: &str = "userLastname";
    pub const USER_ABOUT: &str = "userAbout";
    pub const USER_TUTORING_CENTER: &str = "userTutoringCenter";
    pub const USER_SESSION_PRICE: &str = "userSessionPrice";
    pub const USER_RATING: &str = "userRating";
    pub const FCM_TOKEN: &str = "fcmToken";

    pub const CENTER_NAME: &str = "name";
    pub const CENTER_UUID: &str = "uuid";
    pub const OVERALL_RATING: &str = "overallRating";
    pub const NUMBER_OF_TUTORS: &str = "numberOfTutors";

    pub const REVIEWEE_EMAIL: &str = "revieweeEmail";
    pub const REVIEW_RATING: &str = "userRating";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    /// Tutor or learner profile.
    User,
    Center,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Post => "posts",
            ItemKind::User => "users",
            ItemKind::Center => "centers",
        }
    }

    fn tag_field(&self) -> Option<&'static str> {
        match self {
            ItemKind::Post => Some(fields::POST_TAGS),
            ItemKind::User => Some(fields::USER_TAGS),
            ItemKind::Center => None,
        }
    }

    /// Field a `rating` query compares against. Only centers are filterable by rating.
    pub fn rating_field(&self) -> Option<&'static str> {
        match self {
            ItemKind::Post | ItemKind::User => None,
            ItemKind::Center => Some(fields::OVERALL_RATING),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing candidate with its tag set pulled out of the stored body.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedItem {
    pub id: String,
    pub kind: ItemKind,
    /// Stored casing, compared case-insensitively.
    pub tags: Vec<String>,
    pub fields: Record,
}

impl TaggedItem {
    pub fn new(id: impl Into<String>, kind: ItemKind, fields: Record) -> Self {
        let tags = kind
            .tag_field()
            .and_then(|f| fields.get(f))
            .map(string_list)
            .unwrap_or_default();
        Self {
            id: id.into(),
            kind,
            tags,
            fields,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = fold(tag);
        self.tags.iter().any(|t| fold(t) == needle)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        non_empty_str(self.fields.get(name))
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn into_fields(self) -> Record {
        self.fields
    }
}

/// Collect the string entries of a JSON array, skipping anything else.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub reviewee_key: String,
    /// NaN when the stored rating is missing or not numeric.
    pub rating: f64,
}

impl ReviewRecord {
    /// Reviews without a reviewee cannot be attributed and are dropped.
    pub fn from_record(record: &Record) -> Option<Self> {
        let reviewee_key = non_empty_str(record.get(fields::REVIEWEE_EMAIL))?.to_string();
        let rating = match record.get(fields::REVIEW_RATING) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            _ => f64::NAN,
        };
        Some(Self {
            reviewee_key,
            rating,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingAggregate {
    pub key: String,
    pub average_rating: f64,
    pub rated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterRatingAggregate {
    pub center_key: String,
    pub average_rating: f64,
    /// Tutors with a positive rating; the denominator of `average_rating`.
    pub rated_tutor_count: usize,
    /// Every tutor assigned to the center, rated or not.
    pub total_tutor_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Topic,
    Title,
    Description,
    Date,
    FirstName,
    LastName,
    About,
    TutorCenter,
    Price,
    Rating,
    Name,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Topic => "topic",
            QueryType::Title => "title",
            QueryType::Description => "description",
            QueryType::Date => "date",
            QueryType::FirstName => "firstName",
            QueryType::LastName => "lastName",
            QueryType::About => "about",
            QueryType::TutorCenter => "tutorCenter",
            QueryType::Price => "price",
            QueryType::Rating => "rating",
            QueryType::Name => "name",
        }
    }

    /// Query types a listing kind understands; anything else is a no-op filter.
    pub fn supported_by(&self, kind: ItemKind) -> bool {
        use QueryType::*;
        match kind {
            ItemKind::Post => matches!(self, Topic | Title | Description | Date),
            ItemKind::User => matches!(
                self,
                Topic | FirstName | LastName | About | TutorCenter | Price
            ),
            ItemKind::Center => matches!(self, Name | Rating),
        }
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "topic" => QueryType::Topic,
            "title" => QueryType::Title,
            "description" => QueryType::Description,
            "date" => QueryType::Date,
            "firstName" => QueryType::FirstName,
            "lastName" => QueryType::LastName,
            "about" => QueryType::About,
            "tutorCenter" => QueryType::TutorCenter,
            "price" => QueryType::Price,
            "rating" => QueryType::Rating,
            "name" => QueryType::Name,
            other => return Err(format!("Unknown query type: {other}")),
        })
    }
}

/// The `queryType` / `query` pair of a listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub kind: Option<QueryType>,
    pub value: Option<String>,
}

impl Query {
    pub fn from_params(query_type: Option<&str>, value: Option<&str>) -> Self {
        let kind = query_type.and_then(|raw| match raw.parse::<QueryType>() {
            Ok(kind) => Some(kind),
            Err(err) => {
                tracing::debug!(%err, "Ignoring query type");
                None
            }
        });
        Self {
            kind,
            value: value.map(str::to_string),
        }
    }

    /// The selected predicate, or `None` when the filter is the identity.
    pub fn active(&self) -> Option<(QueryType, &str)> {
        match (self.kind, self.value.as_deref()) {
            (Some(kind), Some(value)) if !value.is_empty() => Some((kind, value)),
            _ => None,
        }
    }

    pub fn active_for(&self, kind: ItemKind) -> Option<(QueryType, &str)> {
        self.active().filter(|(qt, _)| qt.supported_by(kind))
    }
}

/// Read a numeric field, accepting numbers stored as strings.
pub fn float_field(record: &Record, name: &str) -> Option<f64> {
    record.get(name).and_then(value_to_float)
}
