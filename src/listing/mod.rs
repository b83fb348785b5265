//! Per-request listing pipelines for posts, users and tutoring centers.
//!
//! Posts and users: profile lookup, candidate load, oracle round trip, stable
//! sort by tag rank, then the query filter. Centers carry no tags, so their
//! listing is rating annotation plus the filter.

use crate::error::{ListingError, Result};
use crate::filter::{self, QueryFilterEngine};
use crate::metrics::MetricsRegistry;
use crate::model::{fields, ItemKind, Query, Record, ReviewRecord, TaggedItem};
use crate::oracle::RelevanceOracleClient;
use crate::ranking::{candidate_universe, StableItemSorter, TagRankModel};
use crate::ratings::{aggregate_centers, aggregate_reviews, rating_or_default};
use crate::store::{self, paths, DataStore, Document, StoreFilter};
use crate::text::non_empty_str;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// The `(userType, email)` pair identifying who is browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_type: String,
    pub email: String,
}

impl Requester {
    pub fn from_params(user_type: Option<&str>, email: Option<&str>) -> Result<Self> {
        let mut missing = Vec::new();
        let user_type = user_type.filter(|v| !v.is_empty());
        let email = email.filter(|v| !v.is_empty());
        if user_type.is_none() {
            missing.push("userType");
        }
        if email.is_none() {
            missing.push("email");
        }
        match (user_type, email) {
            (Some(user_type), Some(email)) => Ok(Self {
                user_type: user_type.to_string(),
                email: email.to_string(),
            }),
            _ => Err(ListingError::MissingFields(missing)),
        }
    }

    /// The type whose posts and profiles this requester browses.
    pub fn counterpart(&self) -> &'static str {
        paths::counterpart_type(&self.user_type)
    }
}

#[derive(Debug, Clone)]
pub struct PostListingRequest {
    pub requester: Requester,
    pub query: Query,
}

#[derive(Debug, Clone)]
pub struct UserListingRequest {
    pub requester: Requester,
    /// Restrict candidates to the tutors of one center.
    pub center_id: Option<String>,
    pub query: Query,
}

#[derive(Debug, Clone, Default)]
pub struct CenterListingRequest {
    pub query: Query,
}

#[derive(Clone)]
pub struct ListingAssembler {
    store: Arc<dyn DataStore>,
    oracle: RelevanceOracleClient,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ListingAssembler {
    pub fn new(store: Arc<dyn DataStore>, oracle: RelevanceOracleClient) -> Self {
        Self {
            store,
            oracle,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[tracing::instrument(
        name = "list_posts",
        skip_all,
        fields(kind = "posts", user_type = %request.requester.user_type, query_type = ?request.query.kind)
    )]
    pub async fn list_posts(&self, request: &PostListingRequest) -> Result<Vec<Record>> {
        self.observed(ItemKind::Post, self.assemble_posts(request))
            .await
    }

    #[tracing::instrument(
        name = "list_users",
        skip_all,
        fields(kind = "users", user_type = %request.requester.user_type, query_type = ?request.query.kind)
    )]
    pub async fn list_users(&self, request: &UserListingRequest) -> Result<Vec<Record>> {
        self.observed(ItemKind::User, self.assemble_users(request))
            .await
    }

    #[tracing::instrument(
        name = "list_centers",
        skip_all,
        fields(kind = "centers", query_type = ?request.query.kind)
    )]
    pub async fn list_centers(&self, request: &CenterListingRequest) -> Result<Vec<Record>> {
        self.observed(ItemKind::Center, self.assemble_centers(request))
            .await
    }

    async fn observed<F>(&self, kind: ItemKind, listing: F) -> Result<Vec<Record>>
    where
        F: Future<Output = Result<Vec<Record>>>,
    {
        let started = Instant::now();
        let result = listing.await;
        let elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.observe_listing(
                kind.as_str(),
                elapsed.as_secs_f64(),
                result.as_ref().ok().map(Vec::len),
            );
        }
        if let Ok(items) = &result {
            tracing::info!(
                returned = items.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Listing assembled"
            );
        }
        result
    }

    async fn assemble_posts(&self, request: &PostListingRequest) -> Result<Vec<Record>> {
        let requester = &request.requester;
        let candidates_path = paths::posts(requester.counterpart());

        let (profile_tags, docs) = futures::try_join!(
            self.profile_tags(requester),
            store::read_collection(self.store.as_ref(), &candidates_path, None),
        )?;

        let items = tagged(docs, ItemKind::Post);
        if items.is_empty() {
            tracing::debug!(path = %candidates_path, "No candidate posts");
            return Ok(Vec::new());
        }

        let sorted = self.rank(&profile_tags, items).await?;
        let engine = QueryFilterEngine::compile(&request.query, ItemKind::Post, &[]);
        Ok(finish(engine.apply(sorted)))
    }

    async fn assemble_users(&self, request: &UserListingRequest) -> Result<Vec<Record>> {
        let requester = &request.requester;
        let center_filter = request
            .center_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| StoreFilter::any_spelling(fields::USER_TUTORING_CENTER, id));
        // a center only has tutors, whoever is asking
        let candidates_path = match center_filter {
            Some(_) => paths::users(paths::TUTOR),
            None => paths::users(requester.counterpart()),
        };

        let (profile_tags, docs, reviews) = futures::try_join!(
            self.profile_tags(requester),
            store::read_collection(self.store.as_ref(), &candidates_path, center_filter.as_ref()),
            store::read_collection(self.store.as_ref(), paths::REVIEWS, None),
        )?;

        let mut items = tagged(docs, ItemKind::User);
        if items.is_empty() {
            tracing::debug!(path = %candidates_path, "No candidate users");
            return Ok(Vec::new());
        }

        let ratings = aggregate_reviews(&review_records(&reviews));
        for item in &mut items {
            let rating = rating_or_default(&ratings, item.str_field(fields::USER_EMAIL));
            item.set_field(fields::USER_RATING, rating);
        }

        let sorted = self.rank(&profile_tags, items).await?;

        let centers = if filter::needs_centers(&request.query, ItemKind::User) {
            records(store::read_collection(self.store.as_ref(), paths::CENTERS, None).await?)
        } else {
            Vec::new()
        };
        let engine = QueryFilterEngine::compile(&request.query, ItemKind::User, &centers);
        Ok(finish(engine.apply(sorted)))
    }

    async fn assemble_centers(&self, request: &CenterListingRequest) -> Result<Vec<Record>> {
        let tutors_path = paths::users(paths::TUTOR);
        let (tutors, reviews, centers) = futures::try_join!(
            store::read_collection(self.store.as_ref(), &tutors_path, None),
            store::read_collection(self.store.as_ref(), paths::REVIEWS, None),
            store::read_collection(self.store.as_ref(), paths::CENTERS, None),
        )?;

        let tutor_ratings = aggregate_reviews(&review_records(&reviews));
        let center_ratings = aggregate_centers(tutors.iter().filter_map(|tutor| {
            let center = non_empty_str(tutor.data.get(fields::USER_TUTORING_CENTER))?;
            let email = non_empty_str(tutor.data.get(fields::USER_EMAIL));
            Some((center, rating_or_default(&tutor_ratings, email)))
        }));
        tracing::debug!(
            tutors = tutors.len(),
            centers_with_tutors = center_ratings.len(),
            "Aggregated center ratings"
        );

        let mut items = tagged(centers, ItemKind::Center);
        for item in &mut items {
            let aggregate = item
                .str_field(fields::CENTER_UUID)
                .and_then(|uuid| center_ratings.get(uuid));
            let (rating, tutor_count) = match aggregate {
                Some(agg) if agg.average_rating.is_finite() => {
                    (agg.average_rating, agg.total_tutor_count)
                }
                Some(agg) => (0.0, agg.total_tutor_count),
                None => (0.0, 0),
            };
            item.set_field(fields::OVERALL_RATING, rating);
            item.set_field(fields::NUMBER_OF_TUTORS, tutor_count);
        }

        let engine = QueryFilterEngine::compile(&request.query, ItemKind::Center, &[]);
        Ok(finish(engine.apply(items)))
    }

    /// Tags of the requester's profile. Fails when no profile exists.
    async fn profile_tags(&self, requester: &Requester) -> Result<Vec<String>> {
        let filter = StoreFilter::eq(fields::USER_EMAIL, requester.email.as_str());
        let profiles = store::read_collection(
            self.store.as_ref(),
            &paths::users(&requester.user_type),
            Some(&filter),
        )
        .await?;

        let profile = profiles
            .into_iter()
            .next()
            .ok_or_else(|| ListingError::UserNotFound {
                user_type: requester.user_type.clone(),
                email: requester.email.clone(),
            })?;
        Ok(TaggedItem::new(profile.id, ItemKind::User, profile.data).tags)
    }

    async fn rank(&self, profile_tags: &[String], items: Vec<TaggedItem>) -> Result<Vec<TaggedItem>> {
        let universe = candidate_universe(&items);
        tracing::debug!(profile = ?profile_tags, universe = ?universe, "Candidate tag universe");

        let order = self.oracle.reorder(profile_tags, &universe).await?;
        let model = TagRankModel::new(&order);
        Ok(StableItemSorter::new(&model).sort(items))
    }
}

fn tagged(docs: Vec<Document>, kind: ItemKind) -> Vec<TaggedItem> {
    docs.into_iter()
        .map(|doc| TaggedItem::new(doc.id, kind, doc.data))
        .collect()
}

fn records(docs: Vec<Document>) -> Vec<Record> {
    docs.into_iter().map(|doc| doc.data).collect()
}

fn review_records(docs: &[Document]) -> Vec<ReviewRecord> {
    docs.iter()
        .filter_map(|doc| ReviewRecord::from_record(&doc.data))
        .collect()
}

fn finish(items: Vec<TaggedItem>) -> Vec<Record> {
    items.into_iter().map(TaggedItem::into_fields).collect()
}
