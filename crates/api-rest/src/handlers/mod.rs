pub mod appointments;
pub mod auth;
pub mod finance;
pub mod health;
pub mod treatments;
pub mod users;
