//! Database-backed services.
//!
//! Each service holds a [`Db`](crate::Db) handle and the shared
//! [`CoreConfig`](crate::CoreConfig), and is cheap to clone.

pub mod appointments;
pub mod auth;
pub mod billing;
pub mod finance;
pub mod treatments;
pub mod users;
