//! Client query subsystem.
//!
//! # Data Flow
//! ```text
//! POST /configs/values
//!     → types.rs (ValuesRequest)
//!     → engine.rs (select → since filter → partition by mode → watermark)
//!     → types.rs (ValuesResponse)
//! ```
//!
//! # Design Decisions
//! - Reads only the current snapshot; never the store
//! - `since` is inclusive so a client passing back its watermark cannot
//!   miss an update stamped at exactly that instant
//! - An empty result still advances the watermark to the current time

pub mod engine;
pub mod types;

pub use engine::QueryEngine;
pub use types::{ValuesRequest, ValuesResponse};
