//! Session management for pod access
//!
//! This module handles the authenticated cookie session, the CSRF token
//! cache and the markup extractors both rely on.

pub mod extract;
pub mod manager;
pub mod network;
pub mod token;

pub use extract::{Extractor, PatternExtractor};
pub use manager::{Session, SessionState};
pub use network::HttpClients;
pub use token::{PageSource, TokenCache};
