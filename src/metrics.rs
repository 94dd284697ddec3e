//! Prometheus counters for the relay, served at `GET /metrics`.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::RelayError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests: IntCounter,
    pub fragments: IntCounter,
    pub errors: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounter::new("relay_requests_total", "Chat requests accepted")?;
        let fragments = IntCounter::new("relay_fragments_total", "Text fragments relayed")?;
        let errors = IntCounterVec::new(
            Opts::new("relay_errors_total", "Relays that ended in an error"),
            &["kind"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(fragments.clone()))?;
        registry.register(Box::new(errors.clone()))?;

        Ok(Self {
            registry,
            requests,
            fragments,
            errors,
        })
    }

    pub fn record_error(&self, err: &RelayError) {
        self.errors.with_label_values(&[err.kind()]).inc();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
