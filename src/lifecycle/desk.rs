use crate::accept::{AcceptCoordinator, AcceptOutcome};
use crate::alert_actor::{self, AlertContext, AlertError, AlertView};
use crate::backend::OrderBackend;
use crate::capability::Capabilities;
use crate::clients::WorkingSetClient;
use crate::clock::Clock;
use crate::config::{ConfigError, DeskConfig};
use crate::error::{AcceptError, TimelineError};
use crate::events::{event_bus, AlertEvent, EventBus, EvictReason};
use crate::model::{AcceptParams, OrderId};
use crate::poller::{PendingOrderPoller, PollStatus};
use crate::timeline::{Timeline, TimelineWatcher};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const EVENT_CAPACITY: usize = 256;

/// The running alert desk for one tenant.
///
/// `AlertDesk` is responsible for:
/// - **Wiring**: the working-set actor gets its context (clock, capabilities,
///   event bus, and a weak handle to itself) when it starts
/// - **Ownership**: the poller holds the only long-lived strong handle to the
///   working set besides the desk; alerts and the accept coordinator hold
///   weak ones
/// - **Shutdown**: one root token stops every alert ticker and the poller
///
/// # Example
///
/// ```ignore
/// let desk = AlertDesk::start(config, backend, Arc::new(SystemClock), Capabilities::none())?;
/// let mut events = desk.subscribe();
///
/// desk.accept(order_id, AcceptParams::default()).await?;
/// desk.shutdown().await?;
/// ```
pub struct AlertDesk {
    working_set: WorkingSetClient,
    coordinator: AcceptCoordinator,
    events: EventBus,
    poll_status: watch::Receiver<PollStatus>,
    backend: Arc<dyn OrderBackend>,
    clock: Arc<dyn Clock>,
    config: DeskConfig,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl AlertDesk {
    /// Validates `config`, then spawns the working-set actor and the poller.
    /// Must be called inside a Tokio runtime.
    pub fn start(
        config: DeskConfig,
        backend: Arc<dyn OrderBackend>,
        clock: Arc<dyn Clock>,
        capabilities: Capabilities,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = event_bus(EVENT_CAPACITY);
        let shutdown = CancellationToken::new();

        // 1. Create the actor; it learns its own weak handle through the context
        let (actor, working_set) = alert_actor::new(config.mailbox_capacity, events.clone());
        let context = AlertContext {
            clock: clock.clone(),
            capabilities: capabilities.clone(),
            events: events.clone(),
            tick_interval: config.tick_interval(),
            shutdown: shutdown.clone(),
            working_set: working_set.downgrade(),
        };
        let actor_handle = tokio::spawn(actor.run(context));

        // 2. Start the poller, the working set's owner
        let poller = PendingOrderPoller::new(
            backend.clone(),
            working_set.clone(),
            config.tenant.clone(),
            clock.clone(),
            capabilities,
            config.poll_interval(),
        );
        let poll_status = poller.status();
        let poller_handle = tokio::spawn(poller.run(shutdown.child_token()));

        let coordinator = AcceptCoordinator::new(
            backend.clone(),
            working_set.downgrade(),
            events.clone(),
            clock.clone(),
            config.accept_timeout(),
        );

        info!(tenant = %config.tenant, "Alert desk started");
        Ok(Self {
            working_set,
            coordinator,
            events,
            poll_status,
            backend,
            clock,
            config,
            shutdown,
            // The poller first: it holds a strong handle the actor waits on.
            handles: vec![poller_handle, actor_handle],
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// A handle for issuing accepts from elsewhere; it does not keep the
    /// desk alive.
    pub fn coordinator(&self) -> AcceptCoordinator {
        self.coordinator.clone()
    }

    pub async fn accept(
        &self,
        id: OrderId,
        params: AcceptParams,
    ) -> Result<AcceptOutcome, AcceptError> {
        self.coordinator.accept(id, params).await
    }

    /// Hide an alert on this client only. The order stays pending on the
    /// server and the next poll raises it again.
    pub async fn dismiss(&self, id: OrderId) -> Result<bool, AlertError> {
        self.working_set.evict(id, EvictReason::Dismissed).await
    }

    /// Current alerts, soonest deadline first.
    pub async fn alerts(&self) -> Result<Vec<AlertView>, AlertError> {
        self.working_set.views().await
    }

    pub fn poll_status(&self) -> PollStatus {
        self.poll_status.borrow().clone()
    }

    pub fn poll_status_updates(&self) -> watch::Receiver<PollStatus> {
        self.poll_status.clone()
    }

    pub fn is_stale(&self) -> bool {
        self.poll_status
            .borrow()
            .is_stale(self.clock.now(), self.config.stale_after())
    }

    /// Follow one order's timeline until the desk shuts down or the returned
    /// receiver is dropped.
    pub async fn watch_timeline(
        &self,
        id: OrderId,
    ) -> Result<watch::Receiver<Timeline>, TimelineError> {
        let watcher = TimelineWatcher::new(self.backend.clone(), id, self.config.refetch_interval());
        let (timeline, _task) = watcher.start(self.shutdown.child_token()).await?;
        Ok(timeline)
    }

    /// Stops every ticker and the poller, closes the working set, and waits
    /// for the tasks to finish.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if every task finished cleanly
    /// - `Err(String)` if a task panicked
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down alert desk...");

        // Step 1: cancel the alert tickers, the poller, and timeline watchers
        self.shutdown.cancel();

        // Step 2: drop our strong handle; the actor exits once the poller's is gone too
        drop(self.working_set);
        drop(self.coordinator);

        // Step 3: wait for the tasks
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Desk task failed: {:?}", e);
                return Err(format!("Desk task failed: {:?}", e));
            }
        }

        info!("Alert desk shutdown complete.");
        Ok(())
    }
}
