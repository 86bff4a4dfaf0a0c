// Background task that rolls every guild over at local midnight.

use super::limits_service::LedgerService;
use super::limits_store::LedgerStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Extra sleep past midnight so the wake-up lands on the new day.
const WAKE_SLACK: StdDuration = StdDuration::from_secs(1);

/// Sleep until the next reset, sweep all guilds, repeat. Never returns.
pub async fn run_daily_reset<S: LedgerStore>(ledger: Arc<LedgerService<S>>) {
    loop {
        let wake_at = ledger.next_reset_at();
        let wait = (wake_at - Utc::now())
            .to_std()
            .unwrap_or(StdDuration::ZERO)
            + WAKE_SLACK;

        tracing::debug!(%wake_at, "Next daily limit reset scheduled");
        tokio::time::sleep(wait).await;

        match ledger.reset_due_guilds().await {
            Ok(count) => tracing::info!(guilds = count, "Daily limit reset sweep completed"),
            Err(err) => tracing::error!("Daily limit reset sweep failed: {}", err),
        }
    }
}
