//! Re-exports of the shared domain models

pub use shared::models::*;
pub use shared::types::*;
