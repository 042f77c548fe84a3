//! Cancellation emails.
//!
//! Staff cancellations are the only customer email the admin sends. Without
//! SMTP settings the notification is logged instead.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use lotus_core::{Order, OrderEvent, OrderNotifier, PaymentMethod, TracingNotifier};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct CancelledHtml<'a> {
    customer_name: &'a str,
    order_id: String,
    refund_due: bool,
    amount: String,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.txt")]
struct CancelledText<'a> {
    customer_name: &'a str,
    order_id: String,
    refund_due: bool,
    amount: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A cancelled VNPay order whose payment went through owes the customer a refund.
const fn refund_due(order: &Order) -> bool {
    matches!(order.payment_method, PaymentMethod::Vnpay) && order.payment_status.is_settled()
}

/// SMTP sender for back-office notifications.
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

    /// Tell the customer their order was cancelled.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_cancellation(&self, order: &Order) -> Result<(), EmailError> {
        let info = &order.shipping_info;
        let refund_due = refund_due(order);

        let html = CancelledHtml {
            customer_name: &info.name,
            order_id: order.id.to_string(),
            refund_due,
            amount: order.total_price.to_string(),
        }
        .render()?;
        let text = CancelledText {
            customer_name: &info.name,
            order_id: order.id.to_string(),
            refund_due,
            amount: order.total_price.to_string(),
        }
        .render()?;

        let subject = format!("Lotus Market: don hang #{} da bi huy", order.id);
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(info
                .email
                .parse()
                .map_err(|_| EmailError::InvalidAddress(info.email.clone()))?)
            .subject(&subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(order_id = %order.id, to = %info.email, "Cancellation email sent");
        Ok(())
    }
}

/// Notifier handed to the order desk.
#[derive(Clone)]
pub enum AdminNotifier {
    Email(EmailService),
    Log(TracingNotifier),
}

impl AdminNotifier {
    /// Build from optional SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if SMTP settings are present but the relay cannot be configured.
    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        match config {
            Some(config) => Ok(Self::Email(EmailService::new(config)?)),
            None => {
                tracing::warn!("SMTP not configured, cancellations will only be logged");
                Ok(Self::Log(TracingNotifier))
            }
        }
    }
}

impl OrderNotifier for AdminNotifier {
    type Error = EmailError;

    async fn notify(&self, event: OrderEvent, order: &Order) -> Result<(), Self::Error> {
        match (self, event) {
            (Self::Email(service), OrderEvent::Cancelled) => service.send_cancellation(order).await,
            (Self::Email(_), _) => {
                tracing::debug!(order_id = %order.id, ?event, "No admin email for event");
                Ok(())
            }
            (Self::Log(notifier), _) => {
                let Ok(()) = notifier.notify(event, order).await;
                Ok(())
            }
        }
    }
}
