//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`. Module paths are hidden; the structured fields
//! (`order_id`, `tenant`, `error`) and span names (`alert`, `timeline`,
//! `poll_once`) carry the context instead.
//!
//! ## What Gets Traced
//!
//! - **Desk lifecycle**: start, poller activation, shutdown
//! - **Working set**: alerts raised, reconcile summaries, evictions with reason
//! - **Per-alert tasks**: escalation outcome, deadline reached
//! - **Failures**: poll and accept failures at `warn`, with the mapped error
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run          # lifecycle and evictions
//! RUST_LOG=debug cargo run         # per-message detail, ticks rejected, skipped orders
//! RUST_LOG=order_alerts=debug,keyed_actor=info cargo run
//! ```
//!
//! With `RUST_LOG=info` a poll that raises one alert, followed by an accept,
//! reads roughly:
//!
//! ```text
//! INFO Poller activated permission=Granted
//! INFO poll_once: Alert raised order_id=ord_1 remaining=119s tenant=corner-shop
//! INFO poll_once: Working set reconciled added=1 evicted=0 kept=0 tenant=corner-shop
//! INFO accept: Accept resolved outcome=Accepted id=ord_1
//! INFO accept:evict: Alert evicted order_id=ord_1 reason=Accepted
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
