//! API handlers module

pub mod conversations;
pub mod documents;
pub mod health;
pub mod query;

use serde::Serialize;

/// Marker carried by every successful body; errors carry `"error"`
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}
