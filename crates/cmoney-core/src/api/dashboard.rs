//! Landing view data: the month summary next to the latest transactions.

use super::reports::{self, Summary};
use super::transactions::{self, Transaction};
use crate::client::ApiClient;
use crate::error::ApiResult;

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub summary: Summary,
    pub recent: Vec<Transaction>,
}

/// Loads both halves concurrently; either failing fails the whole view.
///
/// # Errors
/// See [`ApiClient::send`].
pub async fn load(client: &ApiClient, month: Option<&str>) -> ApiResult<Dashboard> {
    let (summary, recent) = tokio::try_join!(
        reports::summary(client, month),
        transactions::recent(client)
    )?;
    Ok(Dashboard { summary, recent })
}
