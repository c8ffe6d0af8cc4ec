//! Canonical lifecycle stages and the event-type vocabulary that maps onto them.

use serde::{Deserialize, Serialize};

/// One canonical stage of an order's lifecycle.
///
/// The forward path is `Pending → Confirmed → Preparing → Shipped →
/// Delivered`. `Cancelled` and `Returned` branch off from any non-terminal
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

pub const FORWARD_STAGES: [Stage; 5] = [
    Stage::Pending,
    Stage::Confirmed,
    Stage::Preparing,
    Stage::Shipped,
    Stage::Delivered,
];

impl Stage {
    /// Maps a raw event type to its stage. Case, surrounding whitespace, and
    /// `-`/space separators are ignored. `None` for types this client does
    /// not know.
    pub fn parse(event_type: &str) -> Option<Stage> {
        let normalized: String = event_type
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        let stage = match normalized.as_str() {
            "pending" | "placed" | "created" => Stage::Pending,
            "confirmed" | "accepted" | "auto_accepted" => Stage::Confirmed,
            "preparing" | "packed" | "processing" => Stage::Preparing,
            "shipped" | "out_for_delivery" | "in_transit" => Stage::Shipped,
            "delivered" | "completed" => Stage::Delivered,
            "cancelled" | "canceled" => Stage::Cancelled,
            "returned" => Stage::Returned,
            _ => return None,
        };
        Some(stage)
    }

    /// Position on the forward path; `None` for the branch stages.
    pub fn index(&self) -> Option<usize> {
        FORWARD_STAGES.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Delivered | Stage::Cancelled | Stage::Returned)
    }

    /// `Cancelled` or `Returned`.
    pub fn is_branch(&self) -> bool {
        self.index().is_none()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Pending => "Pending",
            Stage::Confirmed => "Confirmed",
            Stage::Preparing => "Preparing",
            Stage::Shipped => "Out for delivery",
            Stage::Delivered => "Delivered",
            Stage::Cancelled => "Cancelled",
            Stage::Returned => "Returned",
        }
    }
}
