//! Warehouse registry models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A warehouse in the registry
///
/// At most one warehouse may carry `is_central = true` at any time; the
/// central flag is reassigned with an atomic swap, never set directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub is_central: bool,
    pub is_active: bool,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub notes_th: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
