//! HTTP surface settings, resolved once at startup alongside [`kayan_core::CoreConfig`].

use axum::http::HeaderValue;
use kayan_core::{CoreError, CoreResult};

pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:4000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    addr: String,
    cors_origin: HeaderValue,
    secure_cookies: bool,
}

impl ServerConfig {
    pub fn new(addr: String, cors_origin: &str, secure_cookies: bool) -> CoreResult<Self> {
        let cors_origin = HeaderValue::from_str(cors_origin.trim()).map_err(|_| {
            CoreError::InvalidConfig(format!("CORS_ORIGIN is not a valid origin: {cors_origin}"))
        })?;

        Ok(Self {
            addr,
            cors_origin,
            secure_cookies,
        })
    }

    /// Reads `KAYAN_REST_ADDR`, `CORS_ORIGIN` and `KAYAN_ENV`.
    ///
    /// Cookies carry the `Secure` attribute only when `KAYAN_ENV=production`.
    pub fn from_env() -> CoreResult<Self> {
        let addr =
            std::env::var("KAYAN_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
        let origin = std::env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.into());
        let secure_cookies = std::env::var("KAYAN_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Self::new(addr, &origin, secure_cookies)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn cors_origin(&self) -> &HeaderValue {
        &self.cors_origin
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_origin_with_control_characters() {
        let err = ServerConfig::new(DEFAULT_REST_ADDR.into(), "http://bad\norigin", false)
            .expect_err("newline is not a valid header value");
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_trims_origin() {
        let cfg = ServerConfig::new("127.0.0.1:0".into(), " http://localhost:5173 ", true)
            .expect("valid config");
        assert_eq!(cfg.cors_origin(), "http://localhost:5173");
        assert!(cfg.secure_cookies());
    }
}
