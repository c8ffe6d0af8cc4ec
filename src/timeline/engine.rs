//! [`Timeline`]: the order-history state machine detail views render from.
//!
//! The backend owns transition legality. This engine renders whatever
//! sequence it is given, in the order given, and reports irregularities
//! through [`Timeline::anomalies`] instead of rejecting them.

use crate::model::{EventId, OrderSummary, OrderTimeline, StatusEvent};
use crate::timeline::stage::{Stage, FORWARD_STAGES};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Estimated completion, as minutes after order creation, per stage. Later
/// stages carry smaller offsets so the estimate shrinks as the order moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtaOffsets {
    pub pending_minutes: u32,
    pub confirmed_minutes: u32,
    pub preparing_minutes: u32,
    pub shipped_minutes: u32,
}

impl Default for EtaOffsets {
    fn default() -> Self {
        Self {
            pending_minutes: 60,
            confirmed_minutes: 50,
            preparing_minutes: 40,
            shipped_minutes: 20,
        }
    }
}

impl EtaOffsets {
    /// `None` once nothing is left to estimate.
    pub fn offset(&self, stage: Stage) -> Option<chrono::Duration> {
        let minutes = match stage {
            Stage::Pending => self.pending_minutes,
            Stage::Confirmed => self.confirmed_minutes,
            Stage::Preparing => self.preparing_minutes,
            Stage::Shipped => self.shipped_minutes,
            Stage::Delivered | Stage::Cancelled | Stage::Returned => return None,
        };
        Some(chrono::Duration::minutes(i64::from(minutes)))
    }

    /// True when no stage's offset exceeds the one before it.
    pub fn is_shrinking(&self) -> bool {
        self.pending_minutes >= self.confirmed_minutes
            && self.confirmed_minutes >= self.preparing_minutes
            && self.preparing_minutes >= self.shipped_minutes
    }
}

/// One rendered history row.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub event: StatusEvent,
    /// Stage to draw. Unknown event types draw as [`Stage::Pending`].
    pub stage: Stage,
    pub recognized: bool,
}

impl TimelineEntry {
    fn new(event: StatusEvent) -> Self {
        match Stage::parse(&event.event_type) {
            Some(stage) => Self {
                event,
                stage,
                recognized: true,
            },
            None => {
                debug!(event_type = %event.event_type, "Unknown event type, rendering as pending");
                Self {
                    event,
                    stage: Stage::Pending,
                    recognized: false,
                }
            }
        }
    }
}

/// Irregularities in a history. Informational only.
#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    /// A recognized stage earlier on the forward path than the one before it.
    Backward { event_id: EventId, from: Stage, to: Stage },
    /// Any event after a terminal stage.
    AfterTerminal { event_id: EventId, terminal: Stage },
    /// Timestamp earlier than the previous event's.
    OutOfOrder { event_id: EventId },
    Unrecognized { event_id: EventId, event_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    order: OrderSummary,
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new(snapshot: OrderTimeline) -> Self {
        Self {
            order: snapshot.order,
            entries: snapshot.events.into_iter().map(TimelineEntry::new).collect(),
        }
    }

    pub fn order(&self) -> &OrderSummary {
        &self.order
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Raw event type of the most recent event.
    pub fn current_status(&self) -> Option<&str> {
        self.entries.last().map(|e| e.event.event_type.as_str())
    }

    /// Stage of the most recent recognized event, or `Pending` when there is
    /// none. An unknown latest event does not move the order backwards.
    pub fn current_stage(&self) -> Stage {
        self.entries
            .iter()
            .rev()
            .find(|e| e.recognized)
            .map_or(Stage::Pending, |e| e.stage)
    }

    /// Position on the forward path. For a cancelled or returned order this
    /// is the furthest forward stage reached before the branch.
    pub fn current_index(&self) -> usize {
        let stage = self.current_stage();
        stage.index().unwrap_or_else(|| self.furthest_index())
    }

    /// `(index + 1) / stages`, in `(0, 1]`.
    pub fn progress(&self) -> f64 {
        (self.current_index() + 1) as f64 / FORWARD_STAGES.len() as f64
    }

    /// Display-only estimate: creation time plus the current stage's offset.
    pub fn estimated_completion(&self, offsets: &EtaOffsets) -> Option<DateTime<Utc>> {
        offsets
            .offset(self.current_stage())
            .map(|offset| self.order.created_at + offset)
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut found = Vec::new();
        let mut previous: Option<&TimelineEntry> = None;
        let mut last_stage: Option<Stage> = None;
        let mut terminal: Option<Stage> = None;

        for entry in &self.entries {
            let event_id = entry.event.id.clone();
            if let Some(prev) = previous {
                if entry.event.at < prev.event.at {
                    found.push(Anomaly::OutOfOrder {
                        event_id: event_id.clone(),
                    });
                }
            }
            if let Some(terminal) = terminal {
                found.push(Anomaly::AfterTerminal {
                    event_id: event_id.clone(),
                    terminal,
                });
            }

            if !entry.recognized {
                found.push(Anomaly::Unrecognized {
                    event_id,
                    event_type: entry.event.event_type.clone(),
                });
            } else {
                if let (Some(from), Some(to_index)) = (last_stage, entry.stage.index()) {
                    if from.index().is_some_and(|from_index| to_index < from_index) {
                        found.push(Anomaly::Backward {
                            event_id,
                            from,
                            to: entry.stage,
                        });
                    }
                }
                last_stage = Some(entry.stage);
                if entry.stage.is_terminal() && terminal.is_none() {
                    terminal = Some(entry.stage);
                }
            }
            previous = Some(entry);
        }
        found
    }

    /// Apply one pushed event. An event whose id is already present replaces
    /// that entry whole; a new id is appended. Returns whether anything
    /// changed.
    pub fn apply(&mut self, event: StatusEvent) -> bool {
        if event.order_id != self.order.id {
            debug!(order_id = %event.order_id, "Ignoring event for another order");
            return false;
        }
        match self.entries.iter().position(|e| e.event.id == event.id) {
            Some(i) if self.entries[i].event == event => false,
            Some(i) => {
                self.entries[i] = TimelineEntry::new(event);
                true
            }
            None => {
                self.entries.push(TimelineEntry::new(event));
                true
            }
        }
    }

    /// Replace order and history wholesale with a fresh fetch.
    pub fn replace(&mut self, snapshot: OrderTimeline) -> bool {
        let fresh = Timeline::new(snapshot);
        if *self == fresh {
            return false;
        }
        *self = fresh;
        true
    }

    fn furthest_index(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.recognized)
            .filter_map(|e| e.stage.index())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderId;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn event(id: &str, event_type: &str, minute: i64) -> StatusEvent {
        StatusEvent {
            id: EventId::from(id),
            order_id: OrderId::from("o1"),
            event_type: event_type.into(),
            note: String::new(),
            at: t0() + chrono::Duration::minutes(minute),
            actor: None,
        }
    }

    fn timeline(events: Vec<StatusEvent>) -> Timeline {
        Timeline::new(OrderTimeline {
            order: OrderSummary {
                id: OrderId::from("o1"),
                order_number: "#1001".into(),
                total: Decimal::new(4250, 2),
                created_at: t0(),
                delivery_address: Some("1 Old Street".into()),
            },
            events,
        })
    }

    #[test]
    fn test_progress_follows_current_stage() {
        let mut tl = timeline(vec![event("e1", "pending", 0)]);
        assert_eq!(tl.current_index(), 0);
        assert!((tl.progress() - 0.2).abs() < f64::EPSILON);

        tl.apply(event("e2", "confirmed", 1));
        tl.apply(event("e3", "packed", 5));
        assert_eq!(tl.current_stage(), Stage::Preparing);
        assert!((tl.progress() - 0.6).abs() < f64::EPSILON);

        tl.apply(event("e4", "delivered", 30));
        assert!((tl.progress() - 1.0).abs() < f64::EPSILON);
        assert_eq!(tl.estimated_completion(&EtaOffsets::default()), None);
    }

    #[test]
    fn test_unknown_event_type_renders_as_pending() {
        let tl = timeline(vec![
            event("e1", "pending", 0),
            event("e2", "shipped", 10),
            event("e3", "drone_launched", 11),
        ]);
        let last = &tl.entries()[2];
        assert_eq!(last.stage, Stage::Pending);
        assert!(!last.recognized);
        assert_eq!(tl.current_status(), Some("drone_launched"));
        assert_eq!(tl.current_stage(), Stage::Shipped);
    }

    #[test]
    fn test_empty_history_is_pending() {
        let tl = timeline(Vec::new());
        assert_eq!(tl.current_stage(), Stage::Pending);
        assert_eq!(tl.current_status(), None);
        assert!(tl.anomalies().is_empty());
    }

    #[test]
    fn test_cancelled_keeps_furthest_progress() {
        let tl = timeline(vec![
            event("e1", "pending", 0),
            event("e2", "confirmed", 1),
            event("e3", "cancelled", 2),
        ]);
        assert_eq!(tl.current_stage(), Stage::Cancelled);
        assert_eq!(tl.current_index(), 1);
        assert_eq!(tl.estimated_completion(&EtaOffsets::default()), None);
    }

    #[test]
    fn test_estimate_shrinks_as_order_advances() {
        let offsets = EtaOffsets::default();
        let mut tl = timeline(vec![event("e1", "pending", 0)]);
        let at_pending = tl.estimated_completion(&offsets).unwrap();
        tl.apply(event("e2", "confirmed", 1));
        let at_confirmed = tl.estimated_completion(&offsets).unwrap();

        assert_eq!(at_pending, t0() + chrono::Duration::minutes(60));
        assert!(at_confirmed < at_pending);
    }

    #[test]
    fn test_anomalies_are_reported_not_rejected() {
        let tl = timeline(vec![
            event("e1", "pending", 0),
            event("e2", "shipped", 10),
            event("e3", "confirmed", 5),
            event("e4", "delivered", 20),
            event("e5", "mystery", 21),
        ]);
        let anomalies = tl.anomalies();
        assert!(anomalies.contains(&Anomaly::OutOfOrder {
            event_id: EventId::from("e3")
        }));
        assert!(anomalies.contains(&Anomaly::Backward {
            event_id: EventId::from("e3"),
            from: Stage::Shipped,
            to: Stage::Confirmed,
        }));
        assert!(anomalies.contains(&Anomaly::AfterTerminal {
            event_id: EventId::from("e5"),
            terminal: Stage::Delivered,
        }));
        assert_eq!(tl.entries().len(), 5);
    }

    #[test]
    fn test_apply_replaces_by_event_id() {
        let mut tl = timeline(vec![event("e1", "pending", 0), event("e2", "confirmed", 1)]);

        let mut corrected = event("e2", "packed", 1);
        corrected.note = "Packed instead".into();
        assert!(tl.apply(corrected.clone()));
        assert!(!tl.apply(corrected));
        assert_eq!(tl.entries().len(), 2);
        assert_eq!(tl.entries()[1].stage, Stage::Preparing);

        let mut foreign = event("e9", "shipped", 2);
        foreign.order_id = OrderId::from("o2");
        assert!(!tl.apply(foreign));
    }

    #[test]
    fn test_replace_drops_stale_fields() {
        let mut tl = timeline(vec![event("e1", "pending", 0)]);
        let mut fresh = OrderTimeline {
            order: tl.order().clone(),
            events: vec![event("e1", "pending", 0), event("e2", "shipped", 9)],
        };
        fresh.order.delivery_address = None;

        assert!(tl.replace(fresh.clone()));
        assert_eq!(tl.order().delivery_address, None);
        assert!(!tl.replace(fresh));
    }
}
