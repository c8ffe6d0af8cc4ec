//! Runs an alert desk against the in-memory backend: two orders arrive, the
//! first is accepted by hand (twice, to show the second resolving quietly),
//! and the second is left to the server's auto-accept.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=debug cargo run -- desk.toml
//! ```

use async_trait::async_trait;
use order_alerts::backend::memory::NewOrder;
use order_alerts::backend::MemoryBackend;
use order_alerts::capability::{AudioCue, Capabilities, CapabilityError, NoNotifier};
use order_alerts::clock::{Clock, SystemClock};
use order_alerts::config::DeskConfig;
use order_alerts::events::AlertEvent;
use order_alerts::lifecycle::{setup_tracing, AlertDesk};
use order_alerts::model::{AcceptParams, TenantId};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

/// Rings the terminal bell.
struct TerminalBell;

#[async_trait]
impl AudioCue for TerminalBell {
    async fn play(&self) -> Result<(), CapabilityError> {
        print!("\x07");
        Ok(())
    }
}

fn demo_config() -> DeskConfig {
    DeskConfig {
        tenant: TenantId::from("corner-shop"),
        poll_interval_secs: 1,
        min_acceptance_window_secs: 5,
        ..DeskConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => DeskConfig::from_file(Path::new(&path)).map_err(|e| e.to_string())?,
        None => demo_config(),
    };
    info!(tenant = %config.tenant, "Starting alert desk demo");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = Arc::new(MemoryBackend::new(clock.clone()).with_min_window(config.min_acceptance_window()));
    let server = CancellationToken::new();
    let sweep = backend.clone().spawn_auto_accept(Duration::from_secs(1), server.clone());

    let capabilities = Capabilities::new(Arc::new(TerminalBell), Arc::new(NoNotifier));
    let desk = AlertDesk::start(config.clone(), backend.clone(), clock, capabilities)
        .map_err(|e| e.to_string())?;

    let mut events = desk.subscribe();
    let printer = tokio::spawn(
        async move {
            while let Ok(event) = events.recv().await {
                match event {
                    AlertEvent::Tick { .. } => {}
                    AlertEvent::Evicted { order_id, reason } => match reason.message() {
                        Some(message) => info!(%order_id, "{message}"),
                        None => info!(%order_id, ?reason, "Alert removed"),
                    },
                    other => info!(event = ?other, "Alert event"),
                }
            }
        }
        .instrument(tracing::info_span!("surface")),
    );

    let window = config.min_acceptance_window();
    let place = |number: &str| {
        backend.place_order(NewOrder {
            tenant: config.tenant.clone(),
            order_number: number.to_string(),
            total: Decimal::new(2450, 2),
            window,
            delivery_address: Some("12 Market Lane".to_string()),
        })
    };
    let first = place("#1001").map_err(|e| e.to_string())?;
    let second = place("#1002").map_err(|e| e.to_string())?;

    // Let a poll pick both up.
    tokio::time::sleep(config.poll_interval() + Duration::from_millis(500)).await;
    let alerts = desk.alerts().await.map_err(|e| e.to_string())?;
    info!(count = alerts.len(), "Alerts showing");

    let timeline = desk
        .watch_timeline(first.clone())
        .await
        .map_err(|e| e.to_string())?;

    for attempt in 1..=2 {
        match desk.accept(first.clone(), AcceptParams::default()).await {
            Ok(outcome) => info!(attempt, ?outcome, "Accept returned"),
            Err(e) => warn!(attempt, error = %e, "Accept failed"),
        }
    }
    backend
        .record_event(&first, "preparing", "Kitchen started", Some("staff"))
        .map_err(|e| e.to_string())?;

    // Leave the second order to the server.
    tokio::time::sleep(window + config.poll_interval() * 2).await;
    info!(
        second = ?backend.acceptance_status(&second),
        stale = desk.is_stale(),
        "Deadline passed"
    );

    let current = timeline.borrow().clone();
    info!(
        stage = ?current.current_stage(),
        progress = current.progress(),
        eta = ?current.estimated_completion(&config.timeline.eta),
        "Timeline of first order"
    );
    let history: Vec<_> = current.entries().iter().map(|e| &e.event).collect();
    match serde_json::to_string_pretty(&history) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "Could not render history"),
    }

    desk.shutdown().await?;
    server.cancel();
    let _ = sweep.await;
    printer.abort();

    info!("Demo completed");
    Ok(())
}
