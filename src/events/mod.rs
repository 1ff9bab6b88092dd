use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::OrderStatus;

/// Events emitted by the order service. Downstream reactions to a
/// status change (notification dispatch, driver reassignment, payment
/// capture or refund) hang off this channel; they are collaborators of
/// the transition contract, not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(i64),
    OrderStatusChanged {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderCancelled(i64),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes events until the channel closes. Currently only logs; this
/// is the attachment point for notification and payment integrations.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "order created");
            }
            Event::OrderStatusChanged { order_id, from, to } => {
                info!(order_id = %order_id, from = %from, to = %to, "order status changed");
            }
            Event::OrderCancelled(order_id) => {
                info!(order_id = %order_id, "order cancelled");
            }
        }
    }
    warn!("Event channel closed; event processor shutting down");
}
