//! Customer notifications.
//!
//! Uses SMTP via lettre for delivery with Askama templates. When no SMTP
//! server is configured the [`LogNotifier`] records what would have been sent.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use cartwright_core::Email;

use crate::config::EmailConfig;
use crate::models::{Order, OrderItem, ShippingAddress};

/// A message the storefront sends to a customer.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// Sent once after an order is persisted.
    OrderConfirmation(&'a Order),
}

impl Notification<'_> {
    /// Template name, used in logs.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match self {
            Self::OrderConfirmation(_) => "order_confirmation",
        }
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::OrderConfirmation(order) => format!("Order {} confirmed", order.order_number),
        }
    }
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a Order,
    items: &'a [OrderItem],
    address: &'a ShippingAddress,
    orders_url: &'a str,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a Order,
    items: &'a [OrderItem],
    address: &'a ShippingAddress,
    orders_url: &'a str,
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
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

/// Delivers notifications to customers.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Send `notification` to `to`.
    async fn send(&self, to: &Email, notification: &Notification<'_>) -> Result<(), NotificationError>;
}

/// Notification sender for transactional email over SMTP.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    orders_url: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier from configuration.
    ///
    /// `base_url` is the public storefront URL used for links in messages.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
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
            orders_url: format!("{}/account/orders", base_url.trim_end_matches('/')),
        })
    }

    /// Render the text and HTML bodies for a notification.
    fn render(&self, notification: &Notification<'_>) -> Result<(String, String), NotificationError> {
        match notification {
            Notification::OrderConfirmation(order) => {
                let text = OrderConfirmationText {
                    order,
                    items: &order.items,
                    address: &order.shipping_address,
                    orders_url: &self.orders_url,
                }
                .render()?;
                let html = OrderConfirmationHtml {
                    order,
                    items: &order.items,
                    address: &order.shipping_address,
                    orders_url: &self.orders_url,
                }
                .render()?;
                Ok((text, html))
            }
        }
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), NotificationError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for SmtpNotifier {
    async fn send(&self, to: &Email, notification: &Notification<'_>) -> Result<(), NotificationError> {
        let (text, html) = self.render(notification)?;
        self.send_multipart_email(to.as_str(), &notification.subject(), text, html)
            .await
    }
}

/// Notification sender that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(&self, to: &Email, notification: &Notification<'_>) -> Result<(), NotificationError> {
        tracing::info!(
            to = %to,
            template = notification.template(),
            subject = %notification.subject(),
            "SMTP not configured; notification logged only"
        );
        Ok(())
    }
}
