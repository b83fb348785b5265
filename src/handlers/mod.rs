//! HTTP handlers

use crate::error::{ListingError, Result};
use crate::listing::{CenterListingRequest, PostListingRequest, Requester, UserListingRequest};
use crate::messaging::{self, EmailRequest, NotificationRequest};
use crate::model::{Query as ListingQuery, Record};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;

pub use state::AppState;

mod state;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub user_type: Option<String>,
    pub email: Option<String>,
    pub center_id: Option<String>,
    pub query: Option<String>,
    pub query_type: Option<String>,
}

impl ListingParams {
    fn requester(&self) -> Result<Requester> {
        Requester::from_params(self.user_type.as_deref(), self.email.as_deref())
    }

    fn listing_query(&self) -> ListingQuery {
        ListingQuery::from_params(self.query_type.as_deref(), self.query.as_deref())
    }
}

pub async fn get_user_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Result<Json<Vec<Record>>> {
    let request = PostListingRequest {
        requester: params.requester()?,
        query: params.listing_query(),
    };
    Ok(Json(state.listings.list_posts(&request).await?))
}

pub async fn get_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Result<Json<Vec<Record>>> {
    let request = UserListingRequest {
        requester: params.requester()?,
        center_id: params.center_id.clone(),
        query: params.listing_query(),
    };
    Ok(Json(state.listings.list_users(&request).await?))
}

pub async fn get_centers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Result<Json<Vec<Record>>> {
    let request = CenterListingRequest {
        query: params.listing_query(),
    };
    Ok(Json(state.listings.list_centers(&request).await?))
}

/// Decode a JSON body, treating an absent, non-JSON or malformed body as an
/// empty request so field validation reports what is missing.
fn lenient_json<T: DeserializeOwned + Default>(headers: &HeaderMap, body: &Bytes) -> T {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"));
    if !is_json || body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "Ignoring malformed JSON body");
        T::default()
    })
}

pub async fn send_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String> {
    let request: EmailRequest = lenient_json(&headers, &body);
    messaging::send_email(state.email.as_ref(), &request).await
}

pub async fn send_notif(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String> {
    let request: NotificationRequest = lenient_json(&headers, &body);
    messaging::send_notification(state.store.as_ref(), state.push.as_ref(), &request).await
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let body = crate::metrics::render_metrics(&state.metrics.registry)
        .map_err(|err| ListingError::downstream(format!("Failed to gather metrics: {err:#}")))?;
    tracing::debug!(bytes = body.len(), "Served metrics");
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

pub async fn healthz() -> &'static str {
    "ok"
}
