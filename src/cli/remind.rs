//! CLI `remind-check` command: one scheduler pass, then exit.

use anyhow::Result;

use memogenius::config::MemoConfig;
use memogenius::scheduler::{self, BotNotifier};

pub async fn remind_check(config: &MemoConfig) -> Result<()> {
    let db = memogenius::server::open_db(config)?;
    let notifier = BotNotifier::new(&config.notifier)?;

    let report = scheduler::run_due_pass(&db, &notifier, chrono::Utc::now()).await?;
    println!(
        "Delivered: {}  Failed: {}  No channel: {}",
        report.delivered, report.failed, report.unroutable
    );
    Ok(())
}
