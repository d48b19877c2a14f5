//! Notification service for delivering alert emails
//!
//! Delivery is best-effort: alert notifications are sent after the triggering
//! transaction has committed and a gateway failure never rolls it back or
//! surfaces to the caller. Failures are logged and swallowed.

use rust_decimal::Decimal;
use serde::Serialize;

use shared::models::AlertPriority;

use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};

/// Notification service wrapping the email gateway client
#[derive(Clone)]
pub struct NotificationService {
    client: EmailGatewayClient,
    from_address: String,
    alert_recipients: Vec<String>,
}

/// HTTP client for the email gateway API
#[derive(Clone)]
pub struct EmailGatewayClient {
    endpoint: String,
    api_key: String,
    http_client: reqwest::Client,
}

/// Payload sent to the email gateway
#[derive(Debug, Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a [String],
    subject: String,
    body: String,
}

/// A stock alert ready for delivery
#[derive(Debug, Clone)]
pub struct StockAlertNotification {
    pub priority: AlertPriority,
    pub item_name: String,
    pub barcode: String,
    pub warehouse_name: String,
    pub stock_qty: Decimal,
    pub stock_alert_level: Decimal,
}

impl EmailGatewayClient {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            endpoint,
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    async fn send(&self, message: &EmailMessage<'_>) -> AppResult<()> {
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Email gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

impl NotificationService {
    /// Create a new NotificationService from configuration
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: EmailGatewayClient::new(
                config.gateway_endpoint.clone(),
                config.gateway_api_key.clone(),
            ),
            from_address: config.from_address.clone(),
            alert_recipients: config.alert_recipients.clone(),
        }
    }

    /// Send a low-stock alert email to the configured recipients
    pub async fn send_stock_alert(&self, alert: &StockAlertNotification) -> AppResult<()> {
        if self.alert_recipients.is_empty() {
            tracing::debug!("No alert recipients configured, skipping notification");
            return Ok(());
        }

        let subject = format!(
            "[{}] Low stock: {} at {}",
            alert.priority.as_str().to_uppercase(),
            alert.item_name,
            alert.warehouse_name
        );
        let body = format!(
            "Item {} (barcode {}) at warehouse {} is down to {} (alert level {}).\n\n\
             สินค้า {} (บาร์โค้ด {}) ที่คลัง {} เหลือ {} (เกณฑ์แจ้งเตือน {})",
            alert.item_name,
            alert.barcode,
            alert.warehouse_name,
            alert.stock_qty,
            alert.stock_alert_level,
            alert.item_name,
            alert.barcode,
            alert.warehouse_name,
            alert.stock_qty,
            alert.stock_alert_level,
        );

        let message = EmailMessage {
            from: &self.from_address,
            to: &self.alert_recipients,
            subject,
            body,
        };

        self.client.send(&message).await
    }

    /// Fire-and-forget delivery: spawns the send and logs any failure
    pub fn send_stock_alert_background(&self, alert: StockAlertNotification) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.send_stock_alert(&alert).await {
                tracing::warn!(
                    barcode = %alert.barcode,
                    warehouse = %alert.warehouse_name,
                    "Failed to deliver stock alert email: {}",
                    e
                );
            }
        });
    }
}
