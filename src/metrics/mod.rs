//! Optional Prometheus metrics, exposed when `[metrics]` is set in config.
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct MetricsRegistry {
    registry: Registry,
    pub requests_total: IntCounter,
    pub issuances_total: IntCounterVec,
    pub cache_hits_total: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounter::new("acmex_requests_total", "Total HTTP requests served").unwrap();
        let issuances_total = IntCounterVec::new(
            Opts::new("acmex_issuances_total", "Certificate issuance attempts by provider and outcome"),
            &["provider", "outcome"],
        )
        .unwrap();
        let cache_hits_total = IntCounter::new("acmex_cache_hits_total", "Renewals skipped due to a valid cached cert").unwrap();

        registry.register(Box::new(requests_total.clone())).unwrap();
        registry.register(Box::new(issuances_total.clone())).unwrap();
        registry.register(Box::new(cache_hits_total.clone())).unwrap();

        Self { registry, requests_total, issuances_total, cache_hits_total }
    }

    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer).unwrap();
        String::from_utf8_lossy(&buffer).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_text_includes_registered_metric_names() {
        let metrics = MetricsRegistry::new();
        metrics.requests_total.inc();
        metrics.issuances_total.with_label_values(&["letsencrypt", "success"]).inc();

        let text = metrics.gather_text();
        assert!(text.contains("acmex_requests_total"));
        assert!(text.contains("acmex_issuances_total"));
    }
}
