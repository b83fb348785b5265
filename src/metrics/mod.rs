//! Prometheus metrics for listings and oracle calls, served on `/metrics`.

use prometheus::{Counter, CounterVec, Histogram, HistogramVec, Opts, Registry, TextEncoder};

pub struct MetricsRegistry {
    pub registry: Registry,

    // Listing metrics, labelled by listing kind
    pub listing_requests_total: CounterVec,
    pub listing_errors_total: CounterVec,
    pub listing_results_total: CounterVec,
    pub listing_duration: HistogramVec,

    // Oracle metrics
    pub oracle_duration: Histogram,
    pub oracle_errors_total: Counter,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let listing_requests_total = CounterVec::new(
            Opts::new("listing_requests_total", "Total number of listing requests"),
            &["kind"],
        )?;

        let listing_errors_total = CounterVec::new(
            Opts::new("listing_errors_total", "Total number of failed listing requests"),
            &["kind"],
        )?;

        let listing_results_total = CounterVec::new(
            Opts::new("listing_results_total", "Total number of listed items returned"),
            &["kind"],
        )?;

        // Listing duration histogram (1ms to 60 seconds)
        let listing_duration = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "listing_duration_seconds",
                "Listing request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["kind"],
        )?;

        // Oracle round trips are dominated by model latency
        let oracle_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "oracle_duration_seconds",
                "Relevance oracle call duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 15.0, 30.0, 60.0]),
        )?;

        let oracle_errors_total = Counter::new(
            "oracle_errors_total",
            "Total number of failed or unparseable oracle calls",
        )?;

        registry.register(Box::new(listing_requests_total.clone()))?;
        registry.register(Box::new(listing_errors_total.clone()))?;
        registry.register(Box::new(listing_results_total.clone()))?;
        registry.register(Box::new(listing_duration.clone()))?;
        registry.register(Box::new(oracle_duration.clone()))?;
        registry.register(Box::new(oracle_errors_total.clone()))?;

        Ok(Self {
            registry,
            listing_requests_total,
            listing_errors_total,
            listing_results_total,
            listing_duration,
            oracle_duration,
            oracle_errors_total,
        })
    }

    /// Record one finished listing request; `returned` is `None` when it failed.
    pub fn observe_listing(&self, kind: &str, seconds: f64, returned: Option<usize>) {
        self.listing_requests_total.with_label_values(&[kind]).inc();
        self.listing_duration
            .with_label_values(&[kind])
            .observe(seconds);
        match returned {
            Some(count) => self
                .listing_results_total
                .with_label_values(&[kind])
                .inc_by(count as f64),
            None => self.listing_errors_total.with_label_values(&[kind]).inc(),
        }
    }
}

/// Text exposition of everything in `registry`.
pub fn render_metrics(registry: &Registry) -> anyhow::Result<String> {
    let families = registry.gather();
    Ok(TextEncoder::new().encode_to_string(&families)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_observations_are_labelled_by_kind() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.observe_listing("posts", 0.2, Some(3));
        metrics.observe_listing("posts", 0.1, None);
        metrics.observe_listing("users", 0.1, Some(0));

        let posts = metrics.listing_requests_total.with_label_values(&["posts"]);
        assert_eq!(posts.get(), 2.0);
        assert_eq!(
            metrics.listing_results_total.with_label_values(&["posts"]).get(),
            3.0
        );
        assert_eq!(metrics.listing_errors_total.with_label_values(&["posts"]).get(), 1.0);
        assert_eq!(metrics.listing_errors_total.with_label_values(&["users"]).get(), 0.0);

        let text = render_metrics(&metrics.registry).unwrap();
        assert!(text.contains("listing_requests_total{kind=\"posts\"} 2"));
        assert!(text.contains("listing_duration_seconds_bucket"));
    }
}
