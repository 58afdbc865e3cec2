//! Three-way stage results
//!
//! Every pipeline stage reports one of:
//! - `Success(value)`: the stage produced something for the next stage
//! - `NoMatch`: nothing to process, e.g. no matching catalog entry
//! - `HardFailure(cause)`: the stage could not complete

use crate::error::IngestError;

#[derive(Debug)]
pub enum StageOutcome<T> {
    Success(T),
    NoMatch,
    HardFailure(IngestError),
}

impl<T> StageOutcome<T> {
    /// The produced value, if any
    pub fn success(self) -> Option<T> {
        match self {
            StageOutcome::Success(v) => Some(v),
            _ => None,
        }
    }
}
