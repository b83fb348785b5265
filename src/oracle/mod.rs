//! Relevance oracle: the external capability that orders a tag universe by
//! relevance to a user's interests.
//!
//! The oracle is the only nondeterministic step in a listing request. It sits
//! behind [`RelevanceOracle`] so any backend, or a scripted stand-in, can be
//! plugged in.

pub mod llm;

pub use llm::{LlmRelevanceOracle, OracleBackend};

use crate::config::Config;
use crate::error::{ListingError, Result};
use crate::metrics::MetricsRegistry;
use crate::ranking::RelevanceOrder;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// A ranking backend.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    /// Return the candidates reordered most to least relevant to the profile,
    /// as JSON text. Errors here are transport failures.
    async fn rank(&self, profile_tags: &[String], candidates: &[String]) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Process-wide client wrapping one oracle backend.
#[derive(Clone)]
pub struct RelevanceOracleClient {
    oracle: Arc<dyn RelevanceOracle>,
    max_retries: u32,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl RelevanceOracleClient {
    pub fn new(oracle: Arc<dyn RelevanceOracle>) -> Self {
        Self {
            oracle,
            max_retries: 0,
            metrics: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One oracle round trip for `universe`, which is folded and deduplicated
    /// before sending.
    pub async fn reorder(
        &self,
        profile_tags: &[String],
        universe: &[String],
    ) -> Result<RelevanceOrder> {
        let candidates = dedup_folded(universe);
        let started = Instant::now();
        let result = self.call_with_retries(profile_tags, &candidates).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .oracle_duration
                .observe(started.elapsed().as_secs_f64());
        }

        let parsed = result.and_then(|text| parse_relevance_order(&text));
        match &parsed {
            Ok(order) => {
                tracing::debug!(
                    oracle = self.oracle.name(),
                    candidates = candidates.len(),
                    ranked = order.len(),
                    order = ?order.tags(),
                    "Relevance order received"
                );
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.oracle_errors_total.inc();
                }
                tracing::error!(oracle = self.oracle.name(), error = %err, "Relevance oracle failed");
            }
        }
        parsed
    }

    async fn call_with_retries(
        &self,
        profile_tags: &[String],
        candidates: &[String],
    ) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.oracle.rank(profile_tags, candidates).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        oracle = self.oracle.name(),
                        attempt,
                        error = %err,
                        "Relevance oracle call failed, retrying"
                    );
                }
                Err(err) => return Err(ListingError::RelevanceOracle(format!("{err:#}"))),
            }
        }
    }
}

/// Parse oracle output. Anything but a JSON array of strings is an error;
/// there is no fallback to an unranked order.
pub fn parse_relevance_order(text: &str) -> Result<RelevanceOrder> {
    let tags: Vec<String> = serde_json::from_str(text.trim())
        .context("Oracle response is not a JSON array of strings")
        .map_err(|err| ListingError::RelevanceOracle(format!("{err:#}")))?;
    Ok(RelevanceOrder::new(tags))
}

fn dedup_folded(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Build the configured oracle backend.
pub fn create_oracle(config: &Config) -> anyhow::Result<Arc<dyn RelevanceOracle>> {
    let oracle = LlmRelevanceOracle::from_config(config)?;
    tracing::info!(
        backend = oracle.name(),
        model = %config.oracle_model,
        "Relevance oracle configured"
    );
    Ok(Arc::new(oracle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned answers and records what it was asked.
    struct Scripted {
        answers: Mutex<Vec<anyhow::Result<String>>>,
        calls: AtomicUsize,
        last_candidates: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(answers: Vec<anyhow::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                calls: AtomicUsize::new(0),
                last_candidates: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RelevanceOracle for Scripted {
        async fn rank(&self, _profile: &[String], candidates: &[String]) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_candidates.lock().unwrap() = candidates.to_vec();
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted answer")))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn strings(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn reorder_folds_and_dedups_universe() {
        let oracle = Scripted::new(vec![Ok(r#"["Physics","math"]"#.to_string())]);
        let client = RelevanceOracleClient::new(oracle.clone());

        let order = client
            .reorder(&strings(&["math"]), &strings(&["Math", "physics", "math"]))
            .await
            .unwrap();

        assert_eq!(order.tags(), &["physics", "math"]);
        assert_eq!(*oracle.last_candidates.lock().unwrap(), strings(&["math", "physics"]));
    }

    #[tokio::test]
    async fn non_json_response_is_an_error() {
        let oracle = Scripted::new(vec![Ok("math, physics".to_string())]);
        let client = RelevanceOracleClient::new(oracle);
        let err = client
            .reorder(&strings(&["math"]), &strings(&["math"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::RelevanceOracle(_)));
    }

    #[tokio::test]
    async fn parse_failures_are_not_retried() {
        let oracle = Scripted::new(vec![Ok("{}".to_string()), Ok("[]".to_string())]);
        let client = RelevanceOracleClient::new(oracle.clone()).with_max_retries(3);
        assert!(client.reorder(&[], &strings(&["a"])).await.is_err());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_failures_retry_up_to_limit() {
        let oracle = Scripted::new(vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok(r#"["a"]"#.to_string()),
        ]);
        let client = RelevanceOracleClient::new(oracle.clone()).with_max_retries(1);
        let order = client.reorder(&[], &strings(&["a"])).await.unwrap();
        assert_eq!(order.tags(), &["a"]);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_failure_without_retries_surfaces() {
        let oracle = Scripted::new(vec![Err(anyhow::anyhow!("timeout"))]);
        let client = RelevanceOracleClient::new(oracle.clone());
        let err = client.reorder(&[], &strings(&["a"])).await.unwrap_err();
        assert!(err.to_string().contains("timeout"));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parse_accepts_partial_permutations() {
        let order = parse_relevance_order(" [\"Art\"] ").unwrap();
        assert_eq!(order.tags(), &["art"]);
        assert!(parse_relevance_order("[1, 2]").is_err());
        assert!(parse_relevance_order("").is_err());
    }
}
