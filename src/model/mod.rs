//! Configuration data model.
//!
//! # Data Flow
//! ```text
//! admin submission
//!     → admin::classify (assigns a Mode per name)
//!     → store (persists ConfigEntry rows, stamps updated_at)
//!     → cache (immutable Snapshot of ConfigEntry)
//!     → query (filters by Key.service / name / updated_at)
//! ```
//!
//! # Design Decisions
//! - `Mode` is a closed enum; every consumer matches it exhaustively
//! - `updated_at` is always the store clock, never the caller's

pub mod types;

pub use types::{ConfigEntry, Key, Mode, ParseModeError, ValidationError};
