//! Reconciliation coordinator.
//!
//! Orchestrates checkout, the VNPay browser return, the VNPay IPN and admin
//! edits. Every entry point decides against the persisted order through
//! [`OrderLedger::transition`], then performs the stock work that decision
//! calls for. The return and the IPN may arrive in either order, any number
//! of times; the version-guarded write lets exactly one of them commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::cart::CartContext;
use crate::error::{CommerceError, Result};
use crate::gateway::{GatewayCallback, VnpayGateway};
use crate::desk::{OrderDesk, settle_stock};
use crate::ledger::{Actor, OrderLedger, TransitionRequest};
use crate::notify::{OrderEvent, OrderNotifier, spawn_notification};
use crate::stock::ProductStock;
use crate::store::{OrderStore, ProductStore};
use crate::types::{
    Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ShippingInfo, UserId,
};

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// Hosted payment page to send the customer to (VNPay only).
    pub redirect_url: Option<String>,
}

impl CheckoutOutcome {
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order.id
    }
}

/// What the customer's browser should be shown after returning from VNPay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Payment confirmed (now or by an earlier notification).
    Paid { order: Order },
    /// Payment did not go through.
    PaymentFailed { order: Order, reason: String },
    /// The gateway reports an outcome for an order that has already moved
    /// past payment. Staff follow up manually.
    NeedsAttention { order: Order },
    /// Signature check failed; nothing was changed.
    InvalidSignature,
    /// The referenced order does not exist.
    OrderNotFound { order_ref: String },
    /// Local failure while processing.
    Error,
}

/// IPN acknowledgement body, serialized as `{"RspCode": "..", "Message": ".."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl IpnResponse {
    pub const SUCCESS: Self = Self::new("00", "success");
    pub const ORDER_NOT_FOUND: Self = Self::new("01", "order not found");
    pub const INVALID_AMOUNT: Self = Self::new("04", "invalid amount");
    pub const INVALID_SIGNATURE: Self = Self::new("97", "invalid signature");
    pub const UNKNOWN_ERROR: Self = Self::new("99", "unknown error");

    const fn new(rsp_code: &'static str, message: &'static str) -> Self {
        Self { rsp_code, message }
    }
}

/// How a gateway callback related to the order's state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GatewayResult {
    /// This call performed the transition.
    Applied(Order),
    /// An earlier call already did.
    AlreadyApplied(Order),
    /// The order cannot take a gateway outcome; acknowledged without a change.
    NeedsAttention(Order),
}

impl GatewayResult {
    fn into_order(self) -> Order {
        match self {
            Self::Applied(order) | Self::AlreadyApplied(order) | Self::NeedsAttention(order) => order,
        }
    }
}

enum Classification {
    Apply,
    AlreadyApplied,
    PastPayment,
}

fn classify(order: &Order, success: bool) -> Classification {
    let already = if success {
        order.payment_status.is_settled()
    } else {
        order.payment_status == PaymentStatus::Failed
    };

    if already {
        Classification::AlreadyApplied
    } else if order.status.is_past_payment() {
        Classification::PastPayment
    } else {
        Classification::Apply
    }
}

/// Entry point for every order lifecycle change.
#[derive(Debug)]
pub struct Coordinator<S, N> {
    store: S,
    gateway: VnpayGateway,
    notifier: Arc<N>,
    shipping_fee: Price,
}

impl<S, N> Coordinator<S, N>
where
    S: ProductStore + OrderStore,
    N: OrderNotifier,
{
    #[must_use]
    pub fn new(store: S, gateway: VnpayGateway, notifier: N, shipping_fee: Price) -> Self {
        Self {
            store,
            gateway,
            notifier: Arc::new(notifier),
            shipping_fee,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn gateway(&self) -> &VnpayGateway {
        &self.gateway
    }

    /// Flat shipping fee charged per order.
    pub const fn shipping_fee(&self) -> Price {
        self.shipping_fee
    }

    /// Order reads and transitions over this coordinator's store.
    pub const fn ledger(&self) -> OrderLedger<'_, S> {
        OrderLedger::new(&self.store)
    }

    /// Stock primitives over this coordinator's store.
    pub const fn stock(&self) -> ProductStock<'_, S> {
        ProductStock::new(&self.store)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turn the cart into an order.
    ///
    /// COD orders are confirmed straight away and the cart is cleared. VNPay
    /// orders wait for payment; the cart is tagged with the order and kept
    /// until the gateway confirms.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty cart or bad shipping info, `OutOfStock`
    /// if a line can no longer be supplied, or a store failure.
    #[instrument(skip(self, cart, shipping_info), fields(session_id = %cart.session_id))]
    pub async fn checkout(
        &self,
        cart: &mut CartContext,
        user_id: UserId,
        shipping_info: ShippingInfo,
        payment_method: PaymentMethod,
        client_ip: &str,
    ) -> Result<CheckoutOutcome> {
        if cart.cart.is_empty() {
            return Err(CommerceError::InvalidArgument("cart is empty".to_owned()));
        }

        let items = cart.cart.snapshot();
        for item in &items {
            let product = self
                .store
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| CommerceError::product_not_found(item.product_id))?;
            if !product.can_supply(item.quantity) {
                return Err(CommerceError::OutOfStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock_quantity,
                });
            }
        }

        let ledger = self.ledger();
        let order = ledger
            .create(user_id, items, shipping_info, payment_method, self.shipping_fee)
            .await?;

        match payment_method {
            PaymentMethod::Cod => {
                let outcome = ledger
                    .transition(
                        order.id,
                        &TransitionRequest::status(OrderStatus::Confirmed),
                        Actor::Checkout,
                    )
                    .await?;
                cart.cart.clear();
                info!(order_id = %order.id, "COD order placed");
                spawn_notification(&self.notifier, OrderEvent::Placed, outcome.order.clone());
                Ok(CheckoutOutcome {
                    order: outcome.order,
                    redirect_url: None,
                })
            }
            PaymentMethod::Vnpay => {
                let outcome = ledger
                    .transition(
                        order.id,
                        &TransitionRequest::payment_status(PaymentStatus::AwaitingPayment),
                        Actor::Checkout,
                    )
                    .await?;
                let redirect_url = self.gateway.build_redirect_url(
                    order.id,
                    outcome.order.total_price,
                    &format!("Thanh toan don hang {}", order.id),
                    client_ip,
                )?;
                cart.cart.set_pending_order(order.id);
                info!(order_id = %order.id, "VNPay order awaiting payment");
                Ok(CheckoutOutcome {
                    order: outcome.order,
                    redirect_url: Some(redirect_url),
                })
            }
        }
    }

    // =========================================================================
    // Gateway callbacks
    // =========================================================================

    /// Process the customer's browser return from VNPay. Never fails; every
    /// problem becomes an outcome to render.
    #[instrument(skip_all, fields(order_ref = params.get("vnp_TxnRef").map(String::as_str)))]
    pub async fn handle_return(
        &self,
        cart: &mut CartContext,
        params: &BTreeMap<String, String>,
    ) -> ReturnOutcome {
        if self.gateway.verify_signature(params).is_err() {
            warn!("VNPay return with invalid signature");
            return ReturnOutcome::InvalidSignature;
        }

        let callback = match self.gateway.parse_callback(params) {
            Ok(callback) => callback,
            Err(e) => {
                warn!(error = %e, "Malformed VNPay return");
                return ReturnOutcome::OrderNotFound {
                    order_ref: params.get("vnp_TxnRef").cloned().unwrap_or_default(),
                };
            }
        };

        let order = match self.load_callback_order(&callback).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                return ReturnOutcome::OrderNotFound {
                    order_ref: callback.order_ref,
                };
            }
            Err(e) => {
                error!(error = %e, "Failed to load order for VNPay return");
                return ReturnOutcome::Error;
            }
        };

        if callback.amount != Some(order.total_price) {
            warn!(
                order_id = %order.id,
                expected = %order.total_price,
                received = ?callback.amount,
                "VNPay return amount mismatch"
            );
        }

        let success = callback.is_success();
        match self.apply_callback(order, &callback).await {
            Ok(GatewayResult::NeedsAttention(order)) => ReturnOutcome::NeedsAttention { order },
            Ok(result) => {
                let order = result.into_order();
                if success {
                    if cart.cart.pending_order() == Some(order.id) {
                        cart.cart.clear();
                    }
                    ReturnOutcome::Paid { order }
                } else {
                    ReturnOutcome::PaymentFailed {
                        order,
                        reason: callback.describe().to_owned(),
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to apply VNPay return");
                ReturnOutcome::Error
            }
        }
    }

    /// Process a server-to-server IPN from VNPay.
    #[instrument(skip_all, fields(order_ref = params.get("vnp_TxnRef").map(String::as_str)))]
    pub async fn handle_ipn(&self, params: &BTreeMap<String, String>) -> IpnResponse {
        if self.gateway.verify_signature(params).is_err() {
            warn!("VNPay IPN with invalid signature");
            return IpnResponse::INVALID_SIGNATURE;
        }

        let callback = match self.gateway.parse_callback(params) {
            Ok(callback) => callback,
            Err(e) => {
                warn!(error = %e, "Malformed VNPay IPN");
                return IpnResponse::UNKNOWN_ERROR;
            }
        };

        let order = match self.load_callback_order(&callback).await {
            Ok(Some(order)) => order,
            Ok(None) => return IpnResponse::ORDER_NOT_FOUND,
            Err(e) => {
                error!(error = %e, "Failed to load order for VNPay IPN");
                return IpnResponse::UNKNOWN_ERROR;
            }
        };

        if callback.amount != Some(order.total_price) {
            let err = CommerceError::AmountMismatch {
                expected: order.total_price,
                received: callback.amount.unwrap_or(Price::ZERO),
            };
            warn!(order_id = %order.id, error = %err, "Rejecting VNPay IPN");
            return IpnResponse::INVALID_AMOUNT;
        }

        match self.apply_callback(order, &callback).await {
            Ok(_) => IpnResponse::SUCCESS,
            Err(e) => {
                error!(error = %e, "Failed to apply VNPay IPN");
                IpnResponse::UNKNOWN_ERROR
            }
        }
    }

    async fn load_callback_order(&self, callback: &GatewayCallback) -> Result<Option<Order>> {
        let Some(order_id) = callback.order_id else {
            return Ok(None);
        };
        match self.ledger().get(order_id).await {
            Ok(order) => Ok(Some(order)),
            Err(CommerceError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn apply_callback(&self, order: Order, callback: &GatewayCallback) -> Result<GatewayResult> {
        let success = callback.is_success();
        let request = if success {
            TransitionRequest {
                status: Some(OrderStatus::Paid),
                payment_status: Some(PaymentStatus::Paid),
                details: Some(callback.payment_details(Utc::now())),
            }
        } else {
            TransitionRequest {
                status: Some(OrderStatus::PaymentFailed),
                payment_status: Some(PaymentStatus::Failed),
                details: Some(callback.payment_details(Utc::now())),
            }
        };

        if order.payment_method != PaymentMethod::Vnpay {
            error!(
                order_id = %order.id,
                payment_method = %order.payment_method,
                response_code = %callback.response_code,
                transaction_no = ?callback.transaction_no,
                "Gateway outcome for an order not paid through VNPay, manual follow-up required"
            );
            return Ok(GatewayResult::NeedsAttention(order));
        }

        match classify(&order, success) {
            Classification::AlreadyApplied => return Ok(GatewayResult::AlreadyApplied(order)),
            Classification::PastPayment => return Ok(self.past_payment(order, callback)),
            Classification::Apply => {}
        }

        let outcome = match self
            .ledger()
            .transition(order.id, &request, Actor::Gateway)
            .await
        {
            Ok(outcome) => outcome,
            Err(CommerceError::IllegalTransition { .. }) => {
                // Lost a race with another writer; judge the fresh state.
                let fresh = self.ledger().get(order.id).await?;
                return match classify(&fresh, success) {
                    Classification::AlreadyApplied => Ok(GatewayResult::AlreadyApplied(fresh)),
                    Classification::PastPayment => Ok(self.past_payment(fresh, callback)),
                    Classification::Apply => Err(CommerceError::IllegalTransition {
                        from: fresh.status.to_string(),
                        to: request
                            .status
                            .map_or_else(String::new, |status| status.to_string()),
                    }),
                };
            }
            Err(e) => return Err(e),
        };

        if !outcome.changed {
            return Ok(GatewayResult::AlreadyApplied(outcome.order));
        }

        info!(
            order_id = %outcome.order.id,
            response_code = %callback.response_code,
            transaction_no = ?callback.transaction_no,
            success,
            "VNPay payment recorded"
        );
        let order = settle_stock(&self.store, outcome).await;
        let event = if success {
            OrderEvent::Paid
        } else {
            OrderEvent::PaymentFailed
        };
        spawn_notification(&self.notifier, event, order.clone());
        Ok(GatewayResult::Applied(order))
    }

    fn past_payment(&self, order: Order, callback: &GatewayCallback) -> GatewayResult {
        error!(
            order_id = %order.id,
            status = %order.status,
            payment_status = %order.payment_status,
            response_code = %callback.response_code,
            transaction_no = ?callback.transaction_no,
            tmn_code = %self.gateway.tmn_code(),
            "Gateway outcome for order past payment stage, manual follow-up required"
        );
        GatewayResult::NeedsAttention(order)
    }

    // =========================================================================
    // Admin edits
    // =========================================================================

    /// Back-office edits sharing this coordinator's store and notifier.
    pub const fn desk(&self) -> OrderDesk<'_, S, N> {
        OrderDesk::new(&self.store, &self.notifier)
    }

    /// See [`OrderDesk::set_order_status`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `IllegalTransition`, or a store failure.
    pub async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        self.desk().set_order_status(order_id, status).await
    }

    /// See [`OrderDesk::set_payment_status`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `IllegalTransition`, or a store failure.
    pub async fn set_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order> {
        self.desk().set_payment_status(order_id, payment_status).await
    }
}
