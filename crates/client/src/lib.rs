//! # Kayan Client
//!
//! Async client for the Kayan REST API.
//!
//! A [`Session`] keeps the access token in memory, persists the last user and refresh token
//! through a [`SessionStore`], and transparently refreshes an expired access token with at most
//! one refresh call in flight.

pub mod endpoints;
pub mod error;
pub mod session;
pub mod store;

pub use error::{ClientError, ClientResult};
pub use session::{Session, BOOTSTRAP_TIMEOUT};
pub use store::{PersistedSession, SessionStore};
