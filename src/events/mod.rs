use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Domain events published after a unit of work commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    WorksheetGenerated {
        worksheet_id: Uuid,
        name: String,
        worksheet_type: String,
        detail_count: usize,
    },
    WorksheetActivated {
        worksheet_id: Uuid,
        name: String,
    },
    WorksheetCompleted {
        worksheet_id: Uuid,
        name: String,
        ref_order_status: Option<String>,
    },
    InspectionRecorded {
        worksheet_detail: String,
        tally: bool,
    },
    InventoryAdjusted {
        inventory_id: Uuid,
        qty_delta: i32,
        weight_delta: rust_decimal::Decimal,
    },
    PalletPicked {
        worksheet_detail: String,
        inventory_id: Uuid,
        release_qty: i32,
    },
    LoadingRecorded {
        release_good: String,
        delivery_order_id: Uuid,
        loaded_targets: usize,
    },
    LoadingUndone {
        delivery_order_id: Uuid,
        reverted_targets: usize,
        delivery_order_deleted: bool,
    },
    NotificationRequested {
        receivers: Vec<Uuid>,
        title: String,
        message: String,
        url: String,
    },
}

/// Cloneable handle onto the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends without waiting; a full or closed channel drops the event.
    pub fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Creates a bounded channel and the sender handle for it.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging every event until all senders are gone.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::NotificationRequested {
                receivers, title, ..
            } => {
                if receivers.is_empty() {
                    warn!(title = %title, "Notification has no receivers");
                } else {
                    info!(title = %title, receivers = receivers.len(), "Delivering notification");
                }
            }
            Event::WorksheetCompleted {
                name,
                ref_order_status,
                ..
            } => {
                info!(worksheet = %name, ref_order_status = ?ref_order_status, "Worksheet completed");
            }
            other => info!("Received event: {:?}", other),
        }
    }

    error!("Event channel closed; event processing stopped");
}
