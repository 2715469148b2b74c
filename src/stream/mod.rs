//! Feed synchronization
//!
//! Deduplicating, cursor-driven copies of pod feeds.

pub mod location;
pub mod state;
pub mod sync;

pub use location::FeedLocation;
pub use state::StreamState;
pub use sync::StreamSync;
