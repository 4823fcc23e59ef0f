//! Core types shared by the runtime, combinator and reporting layers.
//!
//! - [`id`]: Identifier types (`TaskId`, `RaceId`)
//! - [`rejection`]: A clonable fault value with an optional reason

pub mod id;
pub mod rejection;

pub use id::{RaceId, TaskId};
pub use rejection::Rejection;
