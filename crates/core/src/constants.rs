//! Constants used throughout the Kayan core crate.
//!
//! Defaults for configuration values and the fixed limits applied by validation live here so
//! that the binaries, the REST layer and the tests agree on them.

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://kayan.db";

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TOKEN_TTL: &str = "15m";

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TOKEN_TTL: &str = "7d";

/// Default bcrypt cost for password and refresh-token hashing.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Minimum length of a user's full name, in characters.
pub const MIN_FULL_NAME_LEN: usize = 2;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Default page size for finance search.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size accepted by finance search.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum pooled database connections.
pub const MAX_DB_CONNECTIONS: u32 = 8;
