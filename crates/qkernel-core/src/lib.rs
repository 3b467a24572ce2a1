#![forbid(unsafe_code)]
//! qkernel-core: the typed columnar `Table` model shared by every kernel.
//!
//! Design intent:
//! - Keep this crate pure and synchronous (no async, no IO).
//! - The value-type set is closed; dispatch is an exhaustive `match`, never a
//!   fallback numeric promotion.

pub mod budget;
pub mod column;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod table;
pub mod types;
