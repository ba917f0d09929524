//! Shared types for dayseal.
//!
//! Everything here is plain data: the decoded daily record, its sealed
//! on-disk/on-wire form, the sealed identity record, temporary goal
//! definitions and the pluggable scoring policy. No I/O and no crypto.
//!
//! # Keys
//!
//! Daily records are keyed by [`RecordDate`], a zero-padded `YYYY-MM-DD`
//! string. Lexicographic order of the string equals chronological order,
//! which is what the local store's range scans rely on.

mod date;
mod error;
mod goal;
mod record;
pub mod scoring;

pub use date::{RecordDate, month_range};
pub use error::{TypesError, TypesResult};
pub use goal::{TempGoalDef, active_temp_goals, is_valid_goal_id};
pub use record::{
    AlcoholLevel, DailyRecord, IDENTITY_RECORD_ID, SealedIdentity, SealedRecord, SyncMeta,
    TriState,
};
pub use scoring::{Question, ScoringPolicy, WeightedScoring};
