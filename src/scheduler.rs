//! Reminder delivery.
//!
//! Every tick reads active reminders whose due date has passed, tries to
//! deliver each one, and deactivates the ones that were delivered. A failed
//! delivery, or a failed deactivation, is logged and counted; it does not
//! affect the others.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;

use crate::config::NotifierConfig;
use crate::db::Database;
use crate::llm::ProviderError;
use crate::store::reminders::{self, DueReminder};
use crate::store::to_storage_time;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: i64, html: &str) -> Result<()>;
}

/// Sends through a Telegram-style bot API (`POST /bot{token}/sendMessage`, HTML parse mode).
pub struct BotNotifier {
    client: Client,
    api_base: String,
    token: String,
}

impl BotNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        if config.bot_token.is_empty() {
            anyhow::bail!("notifier.bot_token (or MEMO_BOT_TOKEN) is not set");
        }
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for BotNotifier {
    async fn notify(&self, channel_id: i64, html: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let resp = self
            .client
            .post(url)
            .json(&json!({"chat_id": channel_id, "text": html, "parse_mode": "HTML"}))
            .send()
            .await
            // the token is part of the URL
            .map_err(|e| ProviderError::network(&e.without_url()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body).into());
        }
        Ok(())
    }
}

pub fn reminder_message(text: &str) -> String {
    format!("⏰ <b>Time for:</b>\n\n {text}")
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub delivered: usize,
    pub failed: usize,
    /// Due, but the owner has no channel to deliver to.
    pub unroutable: usize,
}

/// One scheduler tick at wall-clock `now`.
pub async fn run_due_pass(
    db: &Database,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<PassReport> {
    let now = to_storage_time(now);
    let due: Vec<DueReminder> = db
        .call(move |conn| Ok(reminders::due_reminders(conn, &now)?))
        .await
        .context("failed to read due reminders")?;

    let mut report = PassReport::default();
    for item in due {
        let id = item.reminder.id;
        let Some(channel_id) = item.channel_id else {
            tracing::debug!(reminder = id, "due reminder has no delivery channel");
            report.unroutable += 1;
            continue;
        };

        match notifier
            .notify(channel_id, &reminder_message(&item.reminder.text))
            .await
        {
            Ok(()) => match db.call(move |conn| Ok(reminders::mark_fired(conn, id)?)).await {
                Ok(_) => {
                    tracing::info!(reminder = id, owner = item.reminder.owner_id, "reminder delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    // sent but still active: it will be delivered again next tick
                    tracing::error!(reminder = id, "failed to deactivate delivered reminder: {e:#}");
                    report.failed += 1;
                }
            },
            Err(e) => {
                tracing::warn!(reminder = id, "reminder delivery failed: {e:#}");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Poll forever at `interval`. Errors in one pass are logged and the loop continues.
pub async fn run(db: Database, notifier: Arc<dyn Notifier>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tracing::info!(interval_secs = interval.as_secs(), "reminder scheduler started");

    loop {
        ticker.tick().await;
        match run_due_pass(&db, notifier.as_ref(), Utc::now()).await {
            Ok(report) if report.delivered + report.failed > 0 => {
                tracing::info!(delivered = report.delivered, failed = report.failed, "scheduler pass");
            }
            Ok(_) => {}
            Err(e) => tracing::error!("scheduler pass failed: {e:#}"),
        }
    }
}
