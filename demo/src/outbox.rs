//! The CLI's notification transport.
//!
//! The command-line tool has no mail relay; each notification is handed to
//! the tracing subscriber instead, so `RUST_LOG=info` shows exactly what a
//! relay would have been asked to send.

use tracing::info;

use sentinel_contracts::{error::SentinelResult, report::DeliveryReceipt};
use sentinel_core::traits::NotificationSender;

pub struct LogSender;

impl NotificationSender for LogSender {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> SentinelResult<DeliveryReceipt> {
        info!(recipient, subject, body_len = body.len(), "alert notification queued");
        Ok(DeliveryReceipt::delivered())
    }
}
