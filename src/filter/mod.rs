//! Query filters applied to sorted, rating-annotated listings.
//!
//! Exactly one predicate is active per request. A query is compiled once into
//! a [`QueryFilterEngine`] and then evaluated per item; evaluation never fails,
//! items lacking the filtered field simply do not match.

pub mod date;

use crate::model::{fields, ItemKind, Query, QueryType, Record, TaggedItem};
use crate::text::{fold, is_truthy, non_empty_str, parse_float_prefix, starts_with_ignore_case, value_to_float};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Identity,
    Nothing,
    TagPrefix(String),
    FieldPrefix { field: &'static str, prefix: String },
    OnDay(DateTime<Utc>),
    CenterIn(HashSet<String>),
    PriceAtMost(f64),
    RatingAtLeast { field: &'static str, min: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilterEngine {
    predicate: Predicate,
}

impl QueryFilterEngine {
    pub fn identity() -> Self {
        Self {
            predicate: Predicate::Identity,
        }
    }

    /// Compile `query` for a listing of `kind`.
    ///
    /// `centers` is only read for `tutorCenter` queries; see [`needs_centers`].
    pub fn compile(query: &Query, kind: ItemKind, centers: &[Record]) -> Self {
        let Some((query_type, value)) = query.active_for(kind) else {
            return Self::identity();
        };

        let prefix = |field: &'static str| Predicate::FieldPrefix {
            field,
            prefix: fold(value),
        };

        let predicate = match query_type {
            QueryType::Topic => Predicate::TagPrefix(fold(value)),
            QueryType::Title => prefix(fields::POST_TITLE),
            QueryType::Description => prefix(fields::POST_DESCRIPTION),
            QueryType::FirstName => prefix(fields::USER_FIRST_NAME),
            QueryType::LastName => prefix(fields::USER_LAST_NAME),
            QueryType::About => prefix(fields::USER_ABOUT),
            QueryType::Name => prefix(fields::CENTER_NAME),
            QueryType::Date => match date::parse_query_date(value) {
                Ok(day) => Predicate::OnDay(day),
                Err(err) => {
                    tracing::warn!(error = %err, "Date query matches nothing");
                    Predicate::Nothing
                }
            },
            QueryType::TutorCenter => Predicate::CenterIn(resolve_center_ids(centers, value)),
            QueryType::Price => match parse_float_prefix(value) {
                Some(max) => Predicate::PriceAtMost(max),
                None => Predicate::Nothing,
            },
            QueryType::Rating => match (kind.rating_field(), parse_float_prefix(value)) {
                (Some(field), Some(min)) => Predicate::RatingAtLeast { field, min },
                _ => Predicate::Nothing,
            },
        };

        tracing::debug!(
            kind = %kind,
            query_type = query_type.as_str(),
            predicate = ?predicate,
            "Compiled listing filter"
        );
        Self { predicate }
    }

    pub fn is_identity(&self) -> bool {
        self.predicate == Predicate::Identity
    }

    pub fn matches(&self, item: &TaggedItem) -> bool {
        match &self.predicate {
            Predicate::Identity => true,
            Predicate::Nothing => false,
            Predicate::TagPrefix(prefix) => item.tags.iter().any(|t| fold(t).starts_with(prefix)),
            Predicate::FieldPrefix { field, prefix } => item
                .field(field)
                .and_then(|v| v.as_str())
                .is_some_and(|s| fold(s).starts_with(prefix)),
            Predicate::OnDay(day) => item
                .field(fields::DATE_POSTED)
                .is_some_and(|stored| date::matches_day(*day, stored)),
            Predicate::CenterIn(ids) => item
                .str_field(fields::USER_TUTORING_CENTER)
                .is_some_and(|id| ids.contains(id)),
            Predicate::PriceAtMost(max) => item
                .field(fields::USER_SESSION_PRICE)
                .filter(|v| is_truthy(v))
                .and_then(value_to_float)
                .is_some_and(|price| price <= *max),
            Predicate::RatingAtLeast { field, min } => item
                .field(field)
                .filter(|v| is_truthy(v))
                .and_then(value_to_float)
                .is_some_and(|rating| rating >= *min),
        }
    }

    pub fn apply(&self, items: Vec<TaggedItem>) -> Vec<TaggedItem> {
        if self.is_identity() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Whether compiling `query` for `kind` needs the tutoring center list.
pub fn needs_centers(query: &Query, kind: ItemKind) -> bool {
    matches!(query.active_for(kind), Some((QueryType::TutorCenter, _)))
}

/// Ids of the centers whose name starts with `prefix`.
pub fn resolve_center_ids(centers: &[Record], prefix: &str) -> HashSet<String> {
    centers
        .iter()
        .filter(|c| {
            non_empty_str(c.get(fields::CENTER_NAME))
                .is_some_and(|name| starts_with_ignore_case(name, prefix))
        })
        .filter_map(|c| non_empty_str(c.get(fields::CENTER_UUID)).map(str::to_string))
        .collect()
}
