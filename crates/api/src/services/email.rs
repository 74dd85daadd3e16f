//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Emails are sent after the change they describe has been committed; a
//! failed send is logged and never undoes that change.

use askama::Template;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use bizshop_core::PlanTier;

use crate::config::EmailConfig;
use crate::models::{Order, User};

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
    trial_days: i64,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeText<'a> {
    name: &'a str,
    trial_days: i64,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscription_activated.html")]
struct ActivatedHtml<'a> {
    name: &'a str,
    plan_name: &'a str,
    renews_at: Option<String>,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscription_activated.txt")]
struct ActivatedText<'a> {
    name: &'a str,
    plan_name: &'a str,
    renews_at: Option<String>,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscription_cancelled.html")]
struct CancelledHtml<'a> {
    name: &'a str,
    plan_name: &'a str,
    access_until: Option<String>,
    dashboard_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscription_cancelled.txt")]
struct CancelledText<'a> {
    name: &'a str,
    plan_name: &'a str,
    access_until: Option<String>,
    dashboard_url: &'a str,
}

/// One order line as rendered in the confirmation email.
struct EmailLine {
    name: String,
    quantity: i32,
    line_total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderHtml<'a> {
    customer_name: &'a str,
    order_id: i32,
    store_name: &'a str,
    items: &'a [EmailLine],
    subtotal: String,
    discount: String,
    shipping: String,
    total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderText<'a> {
    customer_name: &'a str,
    order_id: i32,
    store_name: &'a str,
    items: &'a [EmailLine],
    subtotal: String,
    discount: String,
    shipping: String,
    total: String,
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

/// An email the API sends after a committed change.
#[derive(Debug, Clone)]
pub enum Notification {
    Welcome {
        to: String,
        name: String,
        trial_days: i64,
    },
    SubscriptionActivated {
        to: String,
        name: String,
        plan: PlanTier,
        renews_at: Option<DateTime<Utc>>,
    },
    SubscriptionCancelled {
        to: String,
        name: String,
        plan: PlanTier,
        access_until: Option<DateTime<Utc>>,
    },
    OrderConfirmation {
        store_name: String,
        order: Box<Order>,
    },
}

impl Notification {
    /// Welcome email for a new account.
    #[must_use]
    pub fn welcome(user: &User, trial_days: i64) -> Self {
        Self::Welcome {
            to: user.email.as_str().to_owned(),
            name: user.display_name().to_owned(),
            trial_days,
        }
    }

    /// Activation email for the user's current plan.
    #[must_use]
    pub fn activated(user: &User) -> Self {
        Self::SubscriptionActivated {
            to: user.email.as_str().to_owned(),
            name: user.display_name().to_owned(),
            plan: user.subscription_plan,
            renews_at: user.subscription_expires_at.filter(|_| user.auto_renewal),
        }
    }

    /// Cancellation email; `previous_plan` is the plan being given up.
    #[must_use]
    pub fn cancelled(user: &User, previous_plan: PlanTier) -> Self {
        Self::SubscriptionCancelled {
            to: user.email.as_str().to_owned(),
            name: user.display_name().to_owned(),
            plan: previous_plan,
            access_until: user
                .subscription_expires_at
                .filter(|_| user.cancel_at_period_end),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::SubscriptionActivated { .. } => "subscription_activated",
            Self::SubscriptionCancelled { .. } => "subscription_cancelled",
            Self::OrderConfirmation { .. } => "order_confirmation",
        }
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    dashboard_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
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
            dashboard_url: format!("{}/dashboard", base_url.trim_end_matches('/')),
        })
    }

    /// Render and send a notification.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or the email fails to send.
    pub async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
        let rendered = render(notification, &self.dashboard_url)?;
        self.send_multipart_email(&rendered.to, &rendered.subject, &rendered.text, &rendered.html)
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

        tracing::info!(subject = %subject, "Email sent");
        Ok(())
    }
}

/// A rendered email, ready for the transport.
#[derive(Debug)]
struct RenderedEmail {
    to: String,
    subject: String,
    text: String,
    html: String,
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%-d %B %Y").to_string()
}

fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn render(notification: &Notification, dashboard_url: &str) -> Result<RenderedEmail, EmailError> {
    let rendered = match notification {
        Notification::Welcome {
            to,
            name,
            trial_days,
        } => RenderedEmail {
            to: to.clone(),
            subject: "Welcome to BizShop".to_owned(),
            text: WelcomeText {
                name,
                trial_days: *trial_days,
                dashboard_url,
            }
            .render()?,
            html: WelcomeHtml {
                name,
                trial_days: *trial_days,
                dashboard_url,
            }
            .render()?,
        },
        Notification::SubscriptionActivated {
            to,
            name,
            plan,
            renews_at,
        } => {
            let plan_name = plan.definition().name;
            let renews_at = renews_at.map(format_date);
            RenderedEmail {
                to: to.clone(),
                subject: format!("Your BizShop {plan_name} plan is active"),
                text: ActivatedText {
                    name,
                    plan_name,
                    renews_at: renews_at.clone(),
                    dashboard_url,
                }
                .render()?,
                html: ActivatedHtml {
                    name,
                    plan_name,
                    renews_at,
                    dashboard_url,
                }
                .render()?,
            }
        }
        Notification::SubscriptionCancelled {
            to,
            name,
            plan,
            access_until,
        } => {
            let plan_name = plan.definition().name;
            let access_until = access_until.map(format_date);
            RenderedEmail {
                to: to.clone(),
                subject: format!("Your BizShop {plan_name} plan has been cancelled"),
                text: CancelledText {
                    name,
                    plan_name,
                    access_until: access_until.clone(),
                    dashboard_url,
                }
                .render()?,
                html: CancelledHtml {
                    name,
                    plan_name,
                    access_until,
                    dashboard_url,
                }
                .render()?,
            }
        }
        Notification::OrderConfirmation { store_name, order } => {
            let items: Vec<EmailLine> = order
                .items
                .0
                .iter()
                .map(|item| EmailLine {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    line_total: format_amount(item.line_total()),
                })
                .collect();
            let order_id = order.id.as_i32();
            RenderedEmail {
                to: order.customer_email.clone(),
                subject: format!("{store_name}: order #{order_id} received"),
                text: OrderText {
                    customer_name: &order.customer_name,
                    order_id,
                    store_name,
                    items: &items,
                    subtotal: format_amount(order.subtotal),
                    discount: format_amount(order.discount_amount),
                    shipping: format_amount(order.shipping_fee),
                    total: format_amount(order.total),
                }
                .render()?,
                html: OrderHtml {
                    customer_name: &order.customer_name,
                    order_id,
                    store_name,
                    items: &items,
                    subtotal: format_amount(order.subtotal),
                    discount: format_amount(order.discount_amount),
                    shipping: format_amount(order.shipping_fee),
                    total: format_amount(order.total),
                }
                .render()?,
            }
        }
    };
    Ok(rendered)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::types::Json;

    use bizshop_core::{OrderId, OrderStatus, ProductId, StoreId};

    use crate::models::OrderItem;

    const DASHBOARD: &str = "https://app.bizshop.in/dashboard";

    #[test]
    fn test_welcome_mentions_trial_length() {
        let email = render(
            &Notification::Welcome {
                to: "asha@shop.in".to_owned(),
                name: "Asha".to_owned(),
                trial_days: 14,
            },
            DASHBOARD,
        )
        .unwrap();
        assert_eq!(email.to, "asha@shop.in");
        assert!(email.text.contains("Asha"));
        assert!(email.text.contains("14"));
        assert!(email.html.contains(DASHBOARD));
    }

    #[test]
    fn test_activation_with_and_without_renewal() {
        let renewing = render(
            &Notification::SubscriptionActivated {
                to: "a@shop.in".to_owned(),
                name: "A".to_owned(),
                plan: PlanTier::Pro,
                renews_at: Some(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()),
            },
            DASHBOARD,
        )
        .unwrap();
        assert!(renewing.subject.contains("Pro"));
        assert!(renewing.text.contains("1 November 2026"));

        let lifetime = render(
            &Notification::SubscriptionActivated {
                to: "a@shop.in".to_owned(),
                name: "A".to_owned(),
                plan: PlanTier::Lifetime,
                renews_at: None,
            },
            DASHBOARD,
        )
        .unwrap();
        assert!(lifetime.text.contains("never expires"));
    }

    #[test]
    fn test_order_confirmation_lists_items() {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(42),
            store_id: StoreId::new(1),
            customer_name: "Ravi".to_owned(),
            customer_email: "ravi@mail.in".to_owned(),
            shipping_address: None,
            items: Json(vec![OrderItem {
                product_id: ProductId::new(3),
                name: "Brass lamp".to_owned(),
                price_inr: Decimal::from(450),
                quantity: 2,
            }]),
            subtotal: Decimal::from(900),
            discount_amount: Decimal::from(90),
            shipping_fee: Decimal::from(50),
            total: Decimal::from(860),
            discount_code: Some("DIWALI".to_owned()),
            transaction_fee: Decimal::new(4300, 2),
            merchant_payout: Decimal::new(81_700, 2),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let email = render(
            &Notification::OrderConfirmation {
                store_name: "Diya House".to_owned(),
                order: Box::new(order),
            },
            DASHBOARD,
        )
        .unwrap();
        assert_eq!(email.to, "ravi@mail.in");
        assert!(email.subject.contains("#42"));
        assert!(email.text.contains("Brass lamp x 2: Rs. 900.00"));
        assert!(email.text.contains("Total:    Rs. 860.00"));
    }

    #[test]
    fn test_format_amount_pads_to_paise() {
        assert_eq!(format_amount(Decimal::from(5)), "5.00");
        assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
    }
}
