use std::sync::Arc;

use crate::services::OrderService;

pub mod orders;

/// Shared service registry handed to every handler through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }
}
