//! Business logic services

pub mod alert;
pub mod batch;
pub mod import;
pub mod inventory;
pub mod notification;
pub mod transfer;
pub mod warehouse;

pub use alert::AlertService;
pub use batch::BatchService;
pub use import::ImportService;
pub use inventory::InventoryService;
pub use notification::NotificationService;
pub use transfer::TransferService;
pub use warehouse::WarehouseService;
