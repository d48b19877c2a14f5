//! Domain models for the Warehouse Stock Management Platform

mod alert;
mod batch;
mod import;
mod inventory;
mod warehouse;

pub use alert::*;
pub use batch::*;
pub use import::*;
pub use inventory::*;
pub use warehouse::*;
