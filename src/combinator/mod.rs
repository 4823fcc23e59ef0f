//! Combinators over [`Task`](crate::runtime::Task).
//!
//! - [`race`]: The unwrapped first-to-settle combinator
//! - [`host`]: [`RaceHost`], the replaceable slot holding the race function

pub mod host;
pub mod race;

pub use host::{RaceFn, RaceHost};
pub use race::race_all;
