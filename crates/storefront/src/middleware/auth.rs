//! Authentication extractors.
//!
//! Sign-in is handled outside the storefront; it leaves a [`CurrentUser`] in
//! the session under [`session_keys::CURRENT_USER`]. These extractors only read it.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in customer.
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("orders for {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Returned when a signed-in customer is required but absent.
#[derive(Debug)]
pub enum AuthRejection {
    /// No session layer on this route.
    MissingSession,
    /// Session exists but nobody is signed in.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingSession => {
                tracing::error!("Session layer missing for authenticated route");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required").into_response(),
        }
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        let user = current_user(session)
            .await
            .ok_or(AuthRejection::Unauthorized)?;

        set_sentry_user(&user.id, Some(&user.email));
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current customer.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use lotus_core::UserId;
    use tower_sessions::MemoryStore;

    use super::*;

    fn parts_with(session: Option<Session>) -> Parts {
        let (mut parts, ()) = Request::builder().uri("/orders").body(()).unwrap().into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_require_auth_rejects_anonymous() {
        let mut parts = parts_with(Some(session()));
        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));
    }

    #[tokio::test]
    async fn test_require_auth_reads_current_user() {
        let session = session();
        session
            .insert(
                session_keys::CURRENT_USER,
                CurrentUser {
                    id: UserId::new(7),
                    email: "lan@lotus.vn".to_string(),
                },
            )
            .await
            .unwrap();

        let mut parts = parts_with(Some(session));
        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(user.id, UserId::new(7));
    }

    #[tokio::test]
    async fn test_optional_auth_without_session() {
        let mut parts = parts_with(None);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
