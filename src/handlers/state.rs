//! Application state

use crate::config::Config;
use crate::listing::ListingAssembler;
use crate::messaging::{EmailService, NotificationService};
use crate::metrics::MetricsRegistry;
use crate::store::DataStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub listings: ListingAssembler,
    pub store: Arc<dyn DataStore>,
    pub email: Arc<dyn EmailService>,
    pub push: Arc<dyn NotificationService>,
    pub metrics: Arc<MetricsRegistry>,
}
