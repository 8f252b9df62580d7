//! Shared job status enum.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a background job.
///
/// Transitions are one-way: `Pending` to `Processing`, then `Completed` or
/// `Failed`. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued, waiting for a worker.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Picked up by a worker.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Finished; counters and results recorded.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Aborted; the error message says why.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
