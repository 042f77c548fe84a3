//! VNPay callbacks.
//!
//! `GET /payment/vnpay/return` is where the customer's browser lands after
//! paying; it renders a result page. `GET /payment/vnpay/ipn` is the
//! server-to-server notification; it answers with the JSON VNPay expects.
//! Both may arrive in any order and any number of times.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use lotus_core::{Cart, CartContext, IpnResponse, ReturnOutcome};
use tower_sessions::Session;
use tracing::{error, instrument};

use crate::routes::cart::{load_cart, save_cart};
use crate::state::AppState;

/// Payment result page.
#[derive(Template, WebTemplate)]
#[template(path = "payment/result.html")]
pub struct PaymentResultTemplate {
    pub success: bool,
    pub heading: String,
    pub message: String,
    pub order_id: Option<String>,
    pub amount: Option<String>,
}

impl PaymentResultTemplate {
    fn from_outcome(outcome: &ReturnOutcome) -> (StatusCode, Self) {
        match outcome {
            ReturnOutcome::Paid { order } => (
                StatusCode::OK,
                Self {
                    success: true,
                    heading: "Thanh toan thanh cong".to_string(),
                    message: "Cam on ban! Don hang cua ban dang duoc chuan bi.".to_string(),
                    order_id: Some(order.id.to_string()),
                    amount: Some(order.total_price.to_string()),
                },
            ),
            ReturnOutcome::PaymentFailed { order, reason } => (
                StatusCode::OK,
                Self {
                    success: false,
                    heading: "Thanh toan khong thanh cong".to_string(),
                    message: reason.clone(),
                    order_id: Some(order.id.to_string()),
                    amount: Some(order.total_price.to_string()),
                },
            ),
            ReturnOutcome::NeedsAttention { order } => (
                StatusCode::OK,
                Self {
                    success: false,
                    heading: "Dang xu ly don hang".to_string(),
                    message: "Chung toi da nhan thong bao thanh toan. Nhan vien se lien he voi ban."
                        .to_string(),
                    order_id: Some(order.id.to_string()),
                    amount: None,
                },
            ),
            ReturnOutcome::InvalidSignature => (
                StatusCode::BAD_REQUEST,
                Self::failure("Chu ky khong hop le", None),
            ),
            ReturnOutcome::OrderNotFound { order_ref } => (
                StatusCode::NOT_FOUND,
                Self::failure("Khong tim thay don hang", Some(order_ref.clone())),
            ),
            ReturnOutcome::Error => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Self::failure("Da xay ra loi, vui long thu lai sau", None),
            ),
        }
    }

    fn failure(heading: &str, order_id: Option<String>) -> Self {
        Self {
            success: false,
            heading: heading.to_string(),
            message: String::new(),
            order_id,
            amount: None,
        }
    }
}

/// Browser return from VNPay.
#[instrument(skip_all)]
pub async fn vnpay_return(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let mut context = cart_or_empty(&session).await;
    let outcome = state
        .coordinator()
        .handle_return(&mut context, &params)
        .await;
    if let Err(e) = save_cart(&session, &context).await {
        error!(error = %e, "Failed to save cart after VNPay return");
    }

    PaymentResultTemplate::from_outcome(&outcome)
}

/// The session cart, or an empty one when the session store is unavailable.
/// The payment outcome is reconciled either way.
async fn cart_or_empty(session: &Session) -> CartContext {
    match load_cart(session).await {
        Ok(context) => context,
        Err(e) => {
            error!(error = %e, "Failed to load cart for VNPay return");
            let session_id = session.id().map(|id| id.to_string()).unwrap_or_default();
            CartContext::new(session_id, Cart::new())
        }
    }
}

/// Server-to-server IPN from VNPay.
#[instrument(skip_all)]
pub async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<IpnResponse> {
    Json(state.coordinator().handle_ipn(&params).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::session::{Id, Record};
    use tower_sessions::session_store::{self, SessionStore};

    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct UnavailableStore;

    #[async_trait::async_trait]
    impl SessionStore for UnavailableStore {
        async fn save(&self, _record: &Record) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_owned()))
        }

        async fn load(&self, _id: &Id) -> session_store::Result<Option<Record>> {
            Err(session_store::Error::Backend("connection refused".to_owned()))
        }

        async fn delete(&self, _id: &Id) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_session_store_yields_empty_cart() {
        let session = Session::new(Some(Id::default()), Arc::new(UnavailableStore), None);
        assert!(load_cart(&session).await.is_err());

        let context = cart_or_empty(&session).await;
        assert!(context.cart.is_empty());
        assert!(context.cart.pending_order().is_none());
    }

    #[test]
    fn test_status_codes_per_outcome() {
        let (status, page) = PaymentResultTemplate::from_outcome(&ReturnOutcome::InvalidSignature);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!page.success);

        let (status, page) = PaymentResultTemplate::from_outcome(&ReturnOutcome::OrderNotFound {
            order_ref: "abc".to_string(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(page.order_id.as_deref(), Some("abc"));

        let (status, _) = PaymentResultTemplate::from_outcome(&ReturnOutcome::Error);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_result_page_renders() {
        let html = PaymentResultTemplate::failure("Khong tim thay don hang", Some("42".to_string()))
            .render()
            .unwrap();
        assert!(html.contains("Khong tim thay don hang"));
        assert!(html.contains("42"));
    }
}
