//! HTTP request handlers

pub mod alert;
pub mod batch;
pub mod health;
pub mod import;
pub mod inventory;
pub mod warehouse;

pub use alert::*;
pub use batch::*;
pub use health::*;
pub use import::*;
pub use inventory::*;
pub use warehouse::*;
