//! Monthly budgets, overall or per expense category.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::categories::Category;
use super::{Listing, amount};
use crate::client::{ApiClient, ApiRequest};
use crate::error::{ApiError, ApiResult};

pub const PATH: &str = "/budgets/";
pub const CURRENT_MONTH_PATH: &str = "/budgets/current_month/";
pub const ALERTS_PATH: &str = "/budgets/alerts/";

pub const DEFAULT_ALERT_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Deserialize)]
pub struct Budget {
    pub id: u64,
    pub year_month: String,
    #[serde(with = "amount")]
    pub amount: f64,
    /// `None` is the overall monthly budget.
    #[serde(default)]
    pub category: Option<u64>,
    #[serde(default)]
    pub category_info: Option<Category>,
    #[serde(default = "default_threshold")]
    pub alert_threshold: u8,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub spent_amount: Option<f64>,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub remaining_amount: Option<f64>,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub usage_percentage: Option<f64>,
    #[serde(default)]
    pub is_exceeded: bool,
    #[serde(default)]
    pub is_alert: bool,
}

impl Budget {
    pub fn scope(&self) -> &str {
        match (&self.category_info, self.category) {
            (Some(info), _) => &info.name,
            (None, Some(_)) => "Category",
            (None, None) => "Overall",
        }
    }
}

fn default_threshold() -> u8 {
    DEFAULT_ALERT_THRESHOLD
}

fn default_active() -> bool {
    true
}

/// Body for create and full update.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetInput {
    pub year_month: String,
    #[serde(with = "amount")]
    pub amount: f64,
    /// Serialized as `null` for the overall budget.
    pub category: Option<u64>,
    pub alert_threshold: u8,
}

impl BudgetInput {
    /// # Errors
    /// Rejects a malformed month, a non-positive amount, or a threshold above 100.
    pub fn validate(&self) -> ApiResult<()> {
        validate_year_month(&self.year_month)?;
        if self.amount.is_nan() || self.amount <= 0.0 {
            return Err(ApiError::validation("budget amount must be greater than 0"));
        }
        if self.alert_threshold > 100 {
            return Err(ApiError::validation("alert threshold must be between 0 and 100"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub year_month: Option<String>,
    pub category: Option<u64>,
    pub is_active: Option<bool>,
}

/// Checks the `YYYY-MM` month format.
///
/// # Errors
/// Returns a validation error naming the expected format.
pub fn validate_year_month(value: &str) -> ApiResult<()> {
    let well_formed = value.len() == 7
        && value.as_bytes()[4] == b'-'
        && NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "invalid month '{value}', expected YYYY-MM"
        )))
    }
}

/// The local calendar month as `YYYY-MM`.
pub fn current_year_month() -> String {
    Local::now().format("%Y-%m").to_string()
}

/// # Errors
/// Rejects a malformed `year_month` filter; otherwise see [`ApiClient::send`].
pub async fn list(client: &ApiClient, filter: &BudgetFilter) -> ApiResult<Vec<Budget>> {
    if let Some(year_month) = &filter.year_month {
        validate_year_month(year_month)?;
    }
    let request = ApiRequest::get(PATH)
        .query_opt("year_month", filter.year_month.clone())
        .query_opt("category", filter.category.map(|id| id.to_string()))
        .query_opt("is_active", filter.is_active.map(|b| b.to_string()));
    let listing: Listing<Budget> = client.get_json(request).await?;
    Ok(listing.into_vec())
}

/// # Errors
/// Rejects invalid input before sending; otherwise see [`ApiClient::send`].
pub async fn create(client: &ApiClient, input: &BudgetInput) -> ApiResult<Budget> {
    input.validate()?;
    client.post_json(PATH, input).await
}

/// # Errors
/// Rejects invalid input before sending; otherwise see [`ApiClient::send`].
pub async fn update(client: &ApiClient, id: u64, input: &BudgetInput) -> ApiResult<Budget> {
    input.validate()?;
    client.patch_json(&item_path(id), input).await
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn delete(client: &ApiClient, id: u64) -> ApiResult<()> {
    client.delete(&item_path(id)).await
}

/// Copies a budget into the following month.
///
/// # Errors
/// Surfaces the backend's message verbatim, e.g. when next month's budget
/// already exists.
pub async fn copy_to_next_month(client: &ApiClient, id: u64) -> ApiResult<Budget> {
    let path = format!("{}copy_to_next_month/", item_path(id));
    client
        .send(&ApiRequest::post(path))
        .await
        .and_then(|response| response.json())
        .map_err(|err| ApiError {
            message: err.user_message_or("copy failed"),
            ..err
        })
}

/// Active budgets for the backend's current month.
///
/// # Errors
/// See [`ApiClient::send`].
pub async fn current_month(client: &ApiClient) -> ApiResult<Vec<Budget>> {
    let listing: Listing<Budget> = client.get_json(ApiRequest::get(CURRENT_MONTH_PATH)).await?;
    Ok(listing.into_vec())
}

/// Active budgets that crossed their alert threshold or were exceeded.
///
/// # Errors
/// See [`ApiClient::send`].
pub async fn alerts(client: &ApiClient) -> ApiResult<Vec<Budget>> {
    let listing: Listing<Budget> = client.get_json(ApiRequest::get(ALERTS_PATH)).await?;
    Ok(listing.into_vec())
}

fn item_path(id: u64) -> String {
    format!("{PATH}{id}/")
}
