//! Order emails.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. When SMTP is
//! not configured the storefront falls back to logging the notification.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use lotus_core::{Order, OrderEvent, OrderItem, OrderNotifier, TracingNotifier};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML template for order emails.
#[derive(Template)]
#[template(path = "email/order_update.html")]
struct OrderEmailHtml<'a> {
    subject: &'a str,
    customer_name: &'a str,
    headline: &'a str,
    items: &'a [OrderItem],
    total: String,
    shipping_fee: String,
    address: &'a str,
}

/// Plain text template for order emails.
#[derive(Template)]
#[template(path = "email/order_update.txt")]
struct OrderEmailText<'a> {
    customer_name: &'a str,
    headline: &'a str,
    items: &'a [OrderItem],
    total: String,
    shipping_fee: String,
    address: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Subject line and headline for an order event.
fn event_copy(event: OrderEvent, order: &Order) -> (String, String) {
    match event {
        OrderEvent::Placed => (
            format!("Lotus Market: don hang #{} da duoc dat", order.id),
            format!(
                "Don hang #{} da duoc xac nhan. Vui long thanh toan {} khi nhan hang.",
                order.id,
                order.total_price + order.shipping_fee
            ),
        ),
        OrderEvent::Paid => (
            format!("Lotus Market: da nhan thanh toan don hang #{}", order.id),
            format!(
                "Chung toi da nhan {} qua VNPay cho don hang #{}.",
                order.total_price, order.id
            ),
        ),
        OrderEvent::PaymentFailed => (
            format!("Lotus Market: thanh toan don hang #{} that bai", order.id),
            format!(
                "Thanh toan cho don hang #{} khong thanh cong. Ban co the dat lai don hang bat cu luc nao.",
                order.id
            ),
        ),
        OrderEvent::Cancelled => (
            format!("Lotus Market: don hang #{} da bi huy", order.id),
            format!("Don hang #{} da bi huy.", order.id),
        ),
    }
}

/// Email service for sending order emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the email for `event` to the order's shipping contact.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_email(&self, event: OrderEvent, order: &Order) -> Result<(), EmailError> {
        let (subject, headline) = event_copy(event, order);
        let info = &order.shipping_info;

        let html = OrderEmailHtml {
            subject: &subject,
            customer_name: &info.name,
            headline: &headline,
            items: &order.items,
            total: order.total_price.to_string(),
            shipping_fee: order.shipping_fee.to_string(),
            address: &info.address,
        }
        .render()?;
        let text = OrderEmailText {
            customer_name: &info.name,
            headline: &headline,
            items: &order.items,
            total: order.total_price.to_string(),
            shipping_fee: order.shipping_fee.to_string(),
            address: &info.address,
        }
        .render()?;

        self.send_multipart_email(&info.email, &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Notifier handed to the coordinator: SMTP when configured, logs otherwise.
#[derive(Clone)]
pub enum StorefrontNotifier {
    Email(EmailService),
    Log(TracingNotifier),
}

impl StorefrontNotifier {
    /// Build from optional SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if SMTP settings are present but the relay cannot be configured.
    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        match config {
            Some(config) => Ok(Self::Email(EmailService::new(config)?)),
            None => {
                tracing::warn!("SMTP not configured, order emails will only be logged");
                Ok(Self::Log(TracingNotifier))
            }
        }
    }
}

impl OrderNotifier for StorefrontNotifier {
    type Error = EmailError;

    async fn notify(&self, event: OrderEvent, order: &Order) -> Result<(), Self::Error> {
        match self {
            Self::Email(service) => service.send_order_email(event, order).await,
            Self::Log(notifier) => {
                let Ok(()) = notifier.notify(event, order).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use lotus_core::{
        OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId, ShippingInfo, UserId,
    };

    use super::*;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(17),
            user_id: UserId::new(1),
            items: vec![OrderItem {
                product_id: ProductId::new(3),
                title: "Tra sen".to_string(),
                quantity: 2,
                price: Price::from_dong(50_000),
            }],
            total_price: Price::from_dong(100_000),
            shipping_fee: Price::from_dong(30_000),
            shipping_info: ShippingInfo {
                name: "Nguyen Van A".to_string(),
                phone: "0901234567".to_string(),
                email: "a@lotus.vn".to_string(),
                address: "1 Le Loi, Quan 1".to_string(),
            },
            payment_method: PaymentMethod::Cod,
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            stock_committed: true,
            committed_items: Vec::new(),
            version: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_event_copy_mentions_order() {
        let order = order();
        for event in [
            OrderEvent::Placed,
            OrderEvent::Paid,
            OrderEvent::PaymentFailed,
            OrderEvent::Cancelled,
        ] {
            let (subject, headline) = event_copy(event, &order);
            assert!(subject.contains("#17"), "{subject}");
            assert!(headline.contains("#17"), "{headline}");
        }
    }

    #[test]
    fn test_placed_copy_includes_shipping() {
        let (_, headline) = event_copy(OrderEvent::Placed, &order());
        assert!(headline.contains(&Price::from_dong(130_000).to_string()));
    }

    #[test]
    fn test_text_template_lists_items() {
        let order = order();
        let text = OrderEmailText {
            customer_name: &order.shipping_info.name,
            headline: "hello",
            items: &order.items,
            total: order.total_price.to_string(),
            shipping_fee: order.shipping_fee.to_string(),
            address: &order.shipping_info.address,
        }
        .render()
        .unwrap();

        assert!(text.contains("Nguyen Van A"));
        assert!(text.contains("Tra sen x2"));
        assert!(text.contains("1 Le Loi, Quan 1"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = StorefrontNotifier::Log(TracingNotifier);
        assert!(notifier.notify(OrderEvent::Paid, &order()).await.is_ok());
    }
}
