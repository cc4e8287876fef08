//! Inventory: catalog listings, categories and stock accounting.

mod catalog;
mod ledger;
mod model;

pub use catalog::CatalogService;
pub use ledger::{InventoryLedger, StockLevel};
pub use model::{
    ApprovalStatus, Category, CreateCategoryRequest, CreateItemRequest, Item, ItemCondition,
    ItemFilter, ItemQuery, RejectRequest, UpdateCategoryRequest, UpdateItemRequest,
    UpdateStockRequest,
};
