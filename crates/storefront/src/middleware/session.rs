//! Session middleware configuration.
//!
//! Sessions hold the cart and the signed-in user. They live in `PostgreSQL`
//! (`tower_sessions.session`, created by the storefront migrations).

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "lotus_session";

/// Carts are kept for a week of inactivity.
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Only mark the cookie `Secure` when served over HTTPS, so local HTTP works.
fn is_secure(base_url: &str) -> bool {
    base_url.starts_with("https://")
}

/// Create the session layer with `PostgreSQL` store.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    // Lax so the browser keeps the cookie on the VNPay return redirect
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(is_secure(&config.base_url))
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_secure() {
        assert!(is_secure("https://lotus.vn"));
        assert!(!is_secure("http://localhost:3000"));
    }
}
