//! VNPay `vnp_ResponseCode` descriptions.

/// Code the gateway sends for an approved payment.
pub const SUCCESS: &str = "00";

/// Code the gateway sends when the customer abandons the payment page.
pub const CUSTOMER_CANCELLED: &str = "24";

const UNKNOWN: &str = "Unknown error";

/// Human-readable description of a response code. Unknown codes map to a
/// generic message.
#[must_use]
pub fn describe(code: &str) -> &'static str {
    match code {
        "00" => "Transaction successful",
        "07" => "Amount deducted, transaction flagged as suspicious",
        "09" => "Card or account is not registered for internet banking",
        "10" => "Card or account verification failed more than 3 times",
        "11" => "Payment window expired",
        "12" => "Card or account is locked",
        "13" => "Incorrect one-time password",
        "24" => "Customer cancelled the transaction",
        "51" => "Insufficient account balance",
        "65" => "Daily transaction limit exceeded",
        "75" => "Issuing bank is under maintenance",
        "79" => "Payment password entered incorrectly too many times",
        "99" => "Other error",
        _ => UNKNOWN,
    }
}
