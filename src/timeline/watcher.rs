//! Keeps one order's [`Timeline`] current while a detail view is open.
//!
//! Pushed events are applied one at a time when the backend can push. Without
//! a subscription, or once it ends, the whole timeline is re-fetched on a
//! timer. A failed re-fetch keeps the previous timeline.

use crate::backend::OrderBackend;
use crate::error::TimelineError;
use crate::model::{OrderId, OrderTimeline, StatusEvent};
use crate::timeline::engine::Timeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};

pub struct TimelineWatcher {
    backend: Arc<dyn OrderBackend>,
    order_id: OrderId,
    refetch_interval: Duration,
}

impl TimelineWatcher {
    pub fn new(backend: Arc<dyn OrderBackend>, order_id: OrderId, refetch_interval: Duration) -> Self {
        Self {
            backend,
            order_id,
            refetch_interval,
        }
    }

    /// Fetch the timeline once, then keep it current in the background until
    /// `token` is cancelled or every receiver is dropped.
    #[instrument(skip(self, token), fields(order_id = %self.order_id))]
    pub async fn start(
        self,
        token: CancellationToken,
    ) -> Result<(watch::Receiver<Timeline>, JoinHandle<()>), TimelineError> {
        let initial = Timeline::new(self.fetch().await?);
        let (tx, rx) = watch::channel(initial);
        let push = self.backend.subscribe(&self.order_id).await;

        let span = tracing::info_span!("timeline", order_id = %self.order_id);
        let task = tokio::spawn(self.run(tx, push, token).instrument(span));
        Ok((rx, task))
    }

    async fn fetch(&self) -> Result<OrderTimeline, TimelineError> {
        Ok(self.backend.order_timeline(&self.order_id).await?)
    }

    async fn run(
        self,
        tx: watch::Sender<Timeline>,
        push: Option<mpsc::Receiver<StatusEvent>>,
        token: CancellationToken,
    ) {
        let mut refetch_now = false;
        if let Some(mut events) = push {
            info!("Following pushed events");
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tx.closed() => return,
                    event = events.recv() => {
                        let Some(event) = event else {
                            warn!("Push subscription ended, falling back to re-fetch");
                            refetch_now = true;
                            break;
                        };
                        tx.send_if_modified(|timeline| timeline.apply(event));
                    }
                }
            }
        } else {
            info!(every = ?self.refetch_interval, "No push subscription, re-fetching");
        }
        self.refetch_loop(&tx, &token, refetch_now).await;
    }

    async fn refetch_loop(&self, tx: &watch::Sender<Timeline>, token: &CancellationToken, refetch_now: bool) {
        let mut interval = tokio::time::interval(self.refetch_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !refetch_now {
            // The initial fetch already covers the first tick.
            interval.tick().await;
        }
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tx.closed() => break,
                _ = interval.tick() => {
                    match self.fetch().await {
                        Ok(snapshot) => {
                            if tx.send_if_modified(|timeline| timeline.replace(snapshot)) {
                                debug!("Timeline updated");
                            }
                        }
                        Err(e) => warn!(error = %e, "Timeline re-fetch failed, keeping previous"),
                    }
                }
            }
        }
        debug!("Timeline watcher stopped");
    }
}
