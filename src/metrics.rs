//! Prometheus counters for logins and store mutations.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static LOGIN_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("easyfind_login_attempts_total", "Login attempts by outcome"),
        &["outcome"],
    )
    .expect("login counter definition");
    register(&counter);
    counter
});

static STORE_MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("easyfind_store_mutations_total", "Applied mock store mutations"),
        &["op"],
    )
    .expect("mutation counter definition");
    register(&counter);
    counter
});

fn register(counter: &IntCounterVec) {
    if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
        tracing::warn!(error = %e, "failed to register metric");
    }
}

/// Count a login attempt; `outcome` is `ok` or a failure reason
pub fn record_login(outcome: &str) {
    LOGIN_ATTEMPTS.with_label_values(&[outcome]).inc();
}

pub fn record_mutation(op: &str) {
    STORE_MUTATIONS.with_label_values(&[op]).inc();
}

/// Text exposition of every registered metric
pub fn render() -> String {
    // Touch the counters so they appear even before the first event.
    Lazy::force(&LOGIN_ATTEMPTS);
    Lazy::force(&STORE_MUTATIONS);

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!(error = %e, "failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
