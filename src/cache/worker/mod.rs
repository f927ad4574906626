//! Background workers
//!
//! Periodic maintenance runs as tokio tasks driven by [`Ticker`], each with an explicit
//! stop handle owned by the cache.

pub mod maintenance;
pub mod ticker;

pub use maintenance::spawn_maintenance;
pub use ticker::Ticker;
