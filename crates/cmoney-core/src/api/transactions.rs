//! Income and expense records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::categories::CategoryInfo;
use super::{Listing, amount};
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiResult;

pub const PATH: &str = "/transactions/";

/// How many rows the dashboard shows.
pub const RECENT_LIMIT: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: u64,
    #[serde(with = "amount")]
    pub amount: f64,
    #[serde(default)]
    pub category: Option<u64>,
    #[serde(default)]
    pub category_info: Option<CategoryInfo>,
    pub transaction_date: NaiveDate,
    #[serde(default, deserialize_with = "super::null_default")]
    pub description: String,
}

impl Transaction {
    pub fn category_name(&self) -> &str {
        self.category_info
            .as_ref()
            .map_or("Uncategorized", |info| info.name.as_str())
    }

    /// Signed amount: income positive, expense negative, unknown unsigned.
    pub fn signed_amount(&self) -> f64 {
        match self.category_info.as_ref().map(|info| info.kind) {
            Some(super::categories::CategoryType::Expense) => -self.amount,
            _ => self.amount,
        }
    }
}

/// Body for create and update.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionInput {
    #[serde(with = "amount")]
    pub amount: f64,
    pub category: u64,
    pub transaction_date: NaiveDate,
    pub description: String,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionPatch {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_amount"
    )]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.transaction_date.is_none()
            && self.description.is_none()
    }
}

#[allow(clippy::ref_option)]
fn serialize_opt_amount<S: serde::Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => amount::serialize(v, serializer),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub category: Option<u64>,
    /// Inclusive lower bound on `transaction_date`.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `transaction_date`.
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl TransactionFilter {
    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("category", self.category.map(|id| id.to_string()))
            .query_opt(
                "transaction_date__gte",
                self.from.map(|d| d.format("%Y-%m-%d").to_string()),
            )
            .query_opt(
                "transaction_date__lte",
                self.to.map(|d| d.format("%Y-%m-%d").to_string()),
            )
            .query_opt("limit", self.limit.map(|n| n.to_string()))
    }
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn list(client: &ApiClient, filter: &TransactionFilter) -> ApiResult<Vec<Transaction>> {
    let listing: Listing<Transaction> = client.get_json(filter.apply(ApiRequest::get(PATH))).await?;
    Ok(listing.into_vec())
}

/// The latest few transactions, newest first as ordered by the backend.
///
/// # Errors
/// See [`ApiClient::send`].
pub async fn recent(client: &ApiClient) -> ApiResult<Vec<Transaction>> {
    let filter = TransactionFilter {
        limit: Some(RECENT_LIMIT),
        ..TransactionFilter::default()
    };
    let mut rows = list(client, &filter).await?;
    rows.truncate(RECENT_LIMIT as usize);
    Ok(rows)
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn create(client: &ApiClient, input: &TransactionInput) -> ApiResult<Transaction> {
    client.post_json(PATH, input).await
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn update(client: &ApiClient, id: u64, patch: &TransactionPatch) -> ApiResult<Transaction> {
    client.patch_json(&item_path(id), patch).await
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn delete(client: &ApiClient, id: u64) -> ApiResult<()> {
    client.delete(&item_path(id)).await
}

fn item_path(id: u64) -> String {
    format!("{PATH}{id}/")
}
