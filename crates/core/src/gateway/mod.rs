//! VNPay payment gateway adapter.
//!
//! Pure functions over query parameters: building the signed redirect URL,
//! verifying the signature on return/IPN callbacks, and turning callback
//! parameters into a typed [`GatewayCallback`]. No I/O.
//!
//! # Signing
//!
//! Parameters are sorted by key, each key and value is form-url-encoded
//! (space as `+`), joined as `k=v&k=v`, and signed with HMAC-SHA512 keyed by
//! the merchant hash secret. The hex digest travels as `vnp_SecureHash`.

pub mod response_code;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{CommerceError, Result};
use crate::types::{OrderId, PaymentDetails, Price};

type HmacSha512 = Hmac<Sha512>;

/// Gateway API version.
pub const VERSION: &str = "2.1.0";
/// Signature parameter name.
pub const SECURE_HASH: &str = "vnp_SecureHash";
/// Signature-type parameter name; excluded from signing like the hash itself.
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// How long the customer has to complete payment.
const PAYMENT_WINDOW_MINUTES: i64 = 15;
/// VNPay timestamps are local Vietnam time.
const GMT_PLUS_7_SECS: i32 = 7 * 3600;
const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Merchant credentials and endpoints.
#[derive(Debug, Clone)]
pub struct VnpayConfig {
    /// Terminal (merchant) code issued by VNPay.
    pub tmn_code: String,
    /// Shared secret for HMAC-SHA512.
    pub hash_secret: SecretString,
    /// Hosted payment page, e.g. `https://sandbox.vnpayment.vn/paymentv2/vpcpay.html`.
    pub pay_url: String,
    /// Where the customer's browser is sent back to.
    pub return_url: String,
}

/// Typed view of return/IPN query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCallback {
    /// `vnp_TxnRef` as sent.
    pub order_ref: String,
    /// `order_ref` parsed as an order id, if it is one.
    pub order_id: Option<OrderId>,
    pub response_code: String,
    pub transaction_status: Option<String>,
    /// Converted back from minor units.
    pub amount: Option<Price>,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub pay_date: Option<DateTime<Utc>>,
}

impl GatewayCallback {
    /// Approved by both the response code and, when present, the
    /// transaction status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_code == response_code::SUCCESS
            && self
                .transaction_status
                .as_deref()
                .is_none_or(|status| status == response_code::SUCCESS)
    }

    /// Description of the response code.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        response_code::describe(&self.response_code)
    }

    /// Metadata to merge into the order for this callback.
    #[must_use]
    pub fn payment_details(&self, received_at: DateTime<Utc>) -> PaymentDetails {
        let success = self.is_success();
        PaymentDetails {
            transaction_no: self.transaction_no.clone(),
            bank_code: self.bank_code.clone(),
            response_code: Some(self.response_code.clone()),
            paid_at: success.then(|| self.pay_date.unwrap_or(received_at)),
            failed_at: (!success).then_some(received_at),
            failure_reason: (!success).then(|| self.describe().to_owned()),
        }
    }
}

/// Signs outbound redirects and verifies inbound callbacks.
#[derive(Debug, Clone)]
pub struct VnpayGateway {
    config: VnpayConfig,
}

impl VnpayGateway {
    #[must_use]
    pub const fn new(config: VnpayConfig) -> Self {
        Self { config }
    }

    /// Merchant terminal code.
    #[must_use]
    pub fn tmn_code(&self) -> &str {
        &self.config.tmn_code
    }

    /// Build the signed redirect URL to the hosted payment page, dated now.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the amount is negative or too large to express in
    /// minor units.
    pub fn build_redirect_url(
        &self,
        order_id: OrderId,
        amount: Price,
        description: &str,
        client_ip: &str,
    ) -> Result<String> {
        self.build_redirect_url_at(order_id, amount, description, client_ip, Utc::now())
    }

    /// [`VnpayGateway::build_redirect_url`] with an explicit creation time.
    ///
    /// # Errors
    ///
    /// Same as [`VnpayGateway::build_redirect_url`].
    pub fn build_redirect_url_at(
        &self,
        order_id: OrderId,
        amount: Price,
        description: &str,
        client_ip: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        if amount.is_negative() {
            return Err(CommerceError::InvalidArgument(format!(
                "payment amount {amount} is negative"
            )));
        }
        let minor = amount.to_minor_units().ok_or_else(|| {
            CommerceError::InvalidArgument(format!("payment amount {amount} is out of range"))
        })?;

        let create_date = format_gateway_date(created_at);
        let expire_date =
            format_gateway_date(created_at + Duration::minutes(PAYMENT_WINDOW_MINUTES));

        let params = BTreeMap::from([
            ("vnp_Version".to_owned(), VERSION.to_owned()),
            ("vnp_Command".to_owned(), "pay".to_owned()),
            ("vnp_TmnCode".to_owned(), self.config.tmn_code.clone()),
            ("vnp_Amount".to_owned(), minor.to_string()),
            ("vnp_CurrCode".to_owned(), "VND".to_owned()),
            ("vnp_TxnRef".to_owned(), order_id.to_string()),
            ("vnp_OrderInfo".to_owned(), description.to_owned()),
            ("vnp_OrderType".to_owned(), "other".to_owned()),
            ("vnp_Locale".to_owned(), "vn".to_owned()),
            ("vnp_ReturnUrl".to_owned(), self.config.return_url.clone()),
            ("vnp_IpAddr".to_owned(), client_ip.to_owned()),
            ("vnp_CreateDate".to_owned(), create_date),
            ("vnp_ExpireDate".to_owned(), expire_date),
        ]);

        let sign_data = canonical_query(&params);
        let signature = self.sign(&sign_data)?;

        debug!(order_id = %order_id, amount = minor, "Built VNPay redirect");
        Ok(format!(
            "{}?{sign_data}&{SECURE_HASH}={signature}",
            self.config.pay_url
        ))
    }

    /// Check `vnp_SecureHash` against the other parameters.
    ///
    /// # Errors
    ///
    /// `SignatureInvalid` if the hash is missing or does not match.
    pub fn verify_signature(&self, params: &BTreeMap<String, String>) -> Result<()> {
        let provided = params
            .get(SECURE_HASH)
            .filter(|hash| !hash.is_empty())
            .ok_or(CommerceError::SignatureInvalid)?;

        let signed: BTreeMap<String, String> = params
            .iter()
            .filter(|(key, _)| key.as_str() != SECURE_HASH && key.as_str() != SECURE_HASH_TYPE)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let expected = self.sign(&canonical_query(&signed))?;
        if constant_time_compare(&expected, &provided.to_ascii_lowercase()) {
            Ok(())
        } else {
            Err(CommerceError::SignatureInvalid)
        }
    }

    /// Typed view of callback parameters. Does not verify the signature.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `vnp_TxnRef` or `vnp_ResponseCode` is missing.
    pub fn parse_callback(&self, params: &BTreeMap<String, String>) -> Result<GatewayCallback> {
        let non_empty = |key: &str| {
            params
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        let order_ref = non_empty("vnp_TxnRef")
            .ok_or_else(|| CommerceError::InvalidArgument("missing vnp_TxnRef".to_owned()))?;
        let response_code = non_empty("vnp_ResponseCode").ok_or_else(|| {
            CommerceError::InvalidArgument("missing vnp_ResponseCode".to_owned())
        })?;

        Ok(GatewayCallback {
            order_id: order_ref.parse().ok(),
            order_ref,
            response_code,
            transaction_status: non_empty("vnp_TransactionStatus"),
            amount: non_empty("vnp_Amount")
                .and_then(|amount| amount.parse::<i64>().ok())
                .map(Price::from_minor_units),
            transaction_no: non_empty("vnp_TransactionNo"),
            bank_code: non_empty("vnp_BankCode"),
            pay_date: non_empty("vnp_PayDate").and_then(|date| parse_gateway_date(&date)),
        })
    }

    pub(crate) fn sign(&self, data: &str) -> Result<String> {
        let mut mac =
            HmacSha512::new_from_slice(self.config.hash_secret.expose_secret().as_bytes())
                .map_err(|e| CommerceError::InvalidArgument(format!("hash secret: {e}")))?;
        mac.update(data.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Describe a response code (see [`response_code::describe`]).
#[must_use]
pub fn describe_response_code(code: &str) -> &'static str {
    response_code::describe(code)
}

/// `k=v&k=v` over key-sorted, form-url-encoded pairs.
fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn gateway_offset() -> FixedOffset {
    FixedOffset::east_opt(GMT_PLUS_7_SECS).unwrap_or_else(|| Utc.fix())
}

fn format_gateway_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&gateway_offset())
        .format(DATE_FORMAT)
        .to_string()
}

fn parse_gateway_date(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, DATE_FORMAT).ok()?;
    gateway_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gateway() -> VnpayGateway {
        VnpayGateway::new(VnpayConfig {
            tmn_code: "LOTUS001".to_owned(),
            hash_secret: SecretString::from("K8qz3TnW1vXyR5sD0pLmA7cE2hJ9uF4g"),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_owned(),
            return_url: "https://shop.example.vn/payment/vnpay/return".to_owned(),
        })
    }

    fn query_params(url: &str) -> BTreeMap<String, String> {
        let query = url.split_once('?').unwrap().1;
        form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_redirect_url_parameters() {
        let url = gateway()
            .build_redirect_url_at(
                OrderId::new(42),
                Price::from_dong(215_000),
                "Thanh toan don hang 42",
                "203.0.113.9",
                created_at(),
            )
            .unwrap();

        assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
        let params = query_params(&url);
        assert_eq!(params.get("vnp_Amount").unwrap(), "21500000");
        assert_eq!(params.get("vnp_TxnRef").unwrap(), "42");
        assert_eq!(params.get("vnp_Version").unwrap(), "2.1.0");
        assert_eq!(params.get("vnp_Command").unwrap(), "pay");
        assert_eq!(params.get("vnp_CurrCode").unwrap(), "VND");
        assert_eq!(params.get("vnp_OrderType").unwrap(), "other");
        assert_eq!(params.get("vnp_Locale").unwrap(), "vn");
        assert_eq!(params.get("vnp_OrderInfo").unwrap(), "Thanh toan don hang 42");
        // 03:00 UTC is 10:00 in GMT+7.
        assert_eq!(params.get("vnp_CreateDate").unwrap(), "20240301100000");
        assert_eq!(params.get("vnp_ExpireDate").unwrap(), "20240301101500");
    }

    #[test]
    fn test_redirect_url_verifies() {
        let gateway = gateway();
        let url = gateway
            .build_redirect_url_at(
                OrderId::new(7),
                Price::from_dong(90_000),
                "Don hang #7 & qua tang",
                "127.0.0.1",
                created_at(),
            )
            .unwrap();

        gateway.verify_signature(&query_params(&url)).unwrap();
    }

    #[test]
    fn test_signature_accepts_uppercase_hex() {
        let gateway = gateway();
        let url = gateway
            .build_redirect_url_at(OrderId::new(7), Price::from_dong(1), "x", "::1", created_at())
            .unwrap();
        let mut params = query_params(&url);
        let upper = params.get(SECURE_HASH).unwrap().to_ascii_uppercase();
        params.insert(SECURE_HASH.to_owned(), upper);
        params.insert(SECURE_HASH_TYPE.to_owned(), "HmacSHA512".to_owned());

        gateway.verify_signature(&params).unwrap();
    }

    #[test]
    fn test_single_character_tampering_rejected() {
        let gateway = gateway();
        let url = gateway
            .build_redirect_url_at(
                OrderId::new(12),
                Price::from_dong(500_000),
                "Don hang 12",
                "10.0.0.1",
                created_at(),
            )
            .unwrap();
        let params = query_params(&url);

        for key in params.keys().filter(|key| key.as_str() != SECURE_HASH) {
            let mut tampered = params.clone();
            let value = tampered.get_mut(key).unwrap();
            let last = value.pop().unwrap_or('0');
            value.push(if last == '1' { '2' } else { '1' });

            assert!(
                matches!(
                    gateway.verify_signature(&tampered),
                    Err(CommerceError::SignatureInvalid)
                ),
                "tampering with {key} was accepted"
            );
        }

        let mut tampered_hash = params.clone();
        let hash = tampered_hash.get_mut(SECURE_HASH).unwrap();
        let first = hash.remove(0);
        hash.insert(0, if first == 'a' { 'b' } else { 'a' });
        assert!(gateway.verify_signature(&tampered_hash).is_err());
    }

    #[test]
    fn test_missing_signature_rejected() {
        let mut params = BTreeMap::new();
        params.insert("vnp_TxnRef".to_owned(), "1".to_owned());
        assert!(matches!(
            gateway().verify_signature(&params),
            Err(CommerceError::SignatureInvalid)
        ));

        params.insert(SECURE_HASH.to_owned(), String::new());
        assert!(gateway().verify_signature(&params).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let url = gateway()
            .build_redirect_url_at(OrderId::new(1), Price::from_dong(10), "x", "::1", created_at())
            .unwrap();
        let other = VnpayGateway::new(VnpayConfig {
            hash_secret: SecretString::from("another-secret-entirely-0123456789"),
            ..gateway().config
        });
        assert!(other.verify_signature(&query_params(&url)).is_err());
    }

    #[test]
    fn test_parse_callback() {
        let params: BTreeMap<String, String> = [
            ("vnp_TxnRef", "42"),
            ("vnp_ResponseCode", "00"),
            ("vnp_TransactionStatus", "00"),
            ("vnp_Amount", "21500000"),
            ("vnp_TransactionNo", "14123456"),
            ("vnp_BankCode", "NCB"),
            ("vnp_PayDate", "20240301101200"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let callback = gateway().parse_callback(&params).unwrap();
        assert_eq!(callback.order_id, Some(OrderId::new(42)));
        assert_eq!(callback.amount, Some(Price::from_dong(215_000)));
        assert!(callback.is_success());
        assert_eq!(
            callback.pay_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 3, 12, 0).unwrap())
        );

        let details = callback.payment_details(Utc::now());
        assert_eq!(details.transaction_no.as_deref(), Some("14123456"));
        assert!(details.paid_at.is_some());
        assert!(details.failed_at.is_none());
    }

    #[test]
    fn test_parse_callback_failure_and_missing_fields() {
        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("vnp_TxnRef".to_owned(), "abc".to_owned());
        params.insert("vnp_ResponseCode".to_owned(), "24".to_owned());

        let callback = gateway().parse_callback(&params).unwrap();
        assert_eq!(callback.order_id, None);
        assert!(!callback.is_success());
        let details = callback.payment_details(Utc::now());
        assert_eq!(
            details.failure_reason.as_deref(),
            Some("Customer cancelled the transaction")
        );

        params.remove("vnp_ResponseCode");
        assert!(gateway().parse_callback(&params).is_err());
    }

    #[test]
    fn test_success_requires_transaction_status_when_present() {
        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("vnp_TxnRef".to_owned(), "5".to_owned());
        params.insert("vnp_ResponseCode".to_owned(), "00".to_owned());
        params.insert("vnp_TransactionStatus".to_owned(), "02".to_owned());
        assert!(!gateway().parse_callback(&params).unwrap().is_success());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = gateway()
            .build_redirect_url(OrderId::new(1), Price::from_dong(-1), "x", "::1")
            .unwrap_err();
        assert!(matches!(err, CommerceError::InvalidArgument(_)));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }
}
