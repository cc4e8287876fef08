//! Stock accounting for rentable items.
//!
//! The item row is the single source of truth for `available_stock`.
//! Every mutation keeps `0 <= available_stock <= stock`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ServiceError;

#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Take one unit. Fails with `StockInsufficient` at zero, `NotFound`
    /// for an unknown item.
    async fn reserve(&self, item_id: Uuid) -> Result<(), ServiceError>;

    /// Return one unit, never exceeding total stock.
    async fn release(&self, item_id: Uuid) -> Result<(), ServiceError>;

    /// Advisory read; a later `reserve` may still fail.
    async fn check_availability(&self, item_id: Uuid) -> Result<bool, ServiceError>;
}

/// In-process stock counter with the same rules as the SQL ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub stock: i32,
    pub available: i32,
}

impl StockLevel {
    pub fn new(stock: i32, available: i32) -> Self {
        Self { stock, available }
    }

    pub fn try_reserve(&mut self) -> bool {
        if self.available > 0 {
            self.available -= 1;
            true
        } else {
            false
        }
    }

    pub fn release(&mut self) {
        self.available = (self.available + 1).min(self.stock);
    }

    /// Move total stock, shifting availability by the same delta.
    pub fn restock(&mut self, stock: i32) {
        let stock = stock.max(0);
        let delta = stock - self.stock;
        self.stock = stock;
        self.available = (self.available + delta).clamp(0, stock);
    }
}
