use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::stock_movement::MovementType;

/// Domain events emitted after a ledger write has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    StockReceived {
        product_ids: Vec<Uuid>,
        movement_ids: Vec<Uuid>,
        total_quantity: Decimal,
        location_id: Option<Uuid>,
        reference: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    StockTransferred {
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: Decimal,
        reference: String,
    },
    #[serde(rename_all = "camelCase")]
    StockAdjusted {
        product_id: Uuid,
        location_id: Uuid,
        lot_id: Uuid,
        quantity: Decimal,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    MovementRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        location_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StockReceived { .. } => "stock_received",
            Event::StockTransferred { .. } => "stock_transferred",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::MovementRecorded { .. } => "movement_recorded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Best-effort publish. Never blocks and never fails the caller; a full or
    /// closed channel only produces a log line.
    pub fn publish(&self, event: Event) {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => debug!(event = name, "Event published"),
            Err(TrySendError::Full(_)) => {
                warn!(event = name, "Event channel full; dropping event")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(event = name, "Event channel closed; dropping event")
            }
        }
    }
}

/// Consumers of domain events (log sink, kiosk websocket fan-out).
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Writes every event to the log as structured JSON.
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
        info!(event = event.name(), %payload, "Domain event");
        Ok(())
    }
}

/// Drains the channel, handing each event to every handler in order.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!(handlers = handlers.len(), "Starting event processing loop");

    while let Some(event) = rx.recv().await {
        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(event = event.name(), error = %e, "Event handler failed");
            }
        }
    }

    warn!("Event processing loop has ended");
}
