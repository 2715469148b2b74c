//! Type definitions shared by the session and stream layers
//!
//! Request options, eagerly-read responses, credentials, handles and feed items.

pub mod credentials;
pub mod feed;
pub mod handle;
pub mod request;
pub mod response;

pub use credentials::Credentials;
pub use feed::{FeedItem, Presence, StreamPage};
pub use handle::Handle;
pub use request::{RequestBody, RequestOptions};
pub use response::PodResponse;
