//! diaspora* pod client - Rust Implementation
//!
//! An authenticated client for a diaspora* pod and a synchronizer that keeps
//! a local, duplicate-free copy of the pod's feeds.
//!
//! # Architecture
//!
//! The crate consists of two layers:
//! - **Session**: cookie session, login state machine and CSRF token cache,
//!   exposing `get`/`post`/`put`/`delete` against the pod
//! - **StreamSync**: paginated feed fetching that merges pages into an
//!   ordered item list, newest first, keyed by post GUID
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diaspora_pod_client::{Credentials, FeedLocation, Session, Settings, StreamSync};
//!
//! # tokio_test::block_on(async {
//! let session = Arc::new(Session::new("pod.example.org", Settings::default())?);
//! session.login(Credentials::new("alice", "secret")).await?;
//!
//! let mut stream = StreamSync::filled(session.clone(), FeedLocation::Stream).await?;
//! stream.more(None).await?;
//! for item in &stream {
//!     println!("{} {}", item.created_at, item.id);
//! }
//!
//! session.logout().await?;
//! # Ok::<(), diaspora_pod_client::Error>(())
//! # });
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, Settings};
pub use error::{Error, Result};
pub use session::{PageSource, Session, SessionState, TokenCache};
pub use stream::{FeedLocation, StreamState, StreamSync};
pub use types::{
    Credentials, FeedItem, Handle, Presence, PodResponse, RequestBody, RequestOptions, StreamPage,
};
