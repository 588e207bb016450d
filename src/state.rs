//! Shared application state handed to every handler.

use crate::services::{file_store::FileStore, order_service::OrderService};

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub files: FileStore,
}

impl AppState {
    pub fn new(orders: OrderService, files: FileStore) -> Self {
        Self { orders, files }
    }
}
