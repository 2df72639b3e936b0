//! Read-only aggregate reports.
//!
//! Only the summary is typed; the other reports are returned as JSON
//! documents for display.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::amount;
use super::budgets::validate_year_month;
use crate::client::{ApiClient, ApiRequest};
use crate::error::{ApiError, ApiResult};

pub const SUMMARY_PATH: &str = "/reports/summary/";
pub const MONTHLY_PATH: &str = "/reports/monthly/";
pub const YEARLY_PATH: &str = "/reports/yearly/";
pub const EXPENSE_ANALYSIS_PATH: &str = "/reports/expense-analysis/";
pub const TREND_PATH: &str = "/reports/trend/";

pub const DEFAULT_TREND_MONTHS: u32 = 12;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Totals {
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub total: f64,
    #[serde(default)]
    pub count: u64,
}

/// Usage of the overall monthly budget.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetUsage {
    #[serde(with = "amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub spent: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub remaining: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub usage_percentage: f64,
    #[serde(default)]
    pub is_exceeded: bool,
    #[serde(default)]
    pub is_alert: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryShare {
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default, deserialize_with = "super::null_default")]
    pub category_name: String,
    #[serde(with = "amount")]
    pub amount: f64,
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub percentage: f64,
}

/// Dashboard summary for one month.
#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub year_month: String,
    #[serde(default)]
    pub income: Totals,
    #[serde(default)]
    pub expense: Totals,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub balance: f64,
    #[serde(default)]
    pub budget: Option<BudgetUsage>,
    #[serde(default)]
    pub category_distribution: Vec<CategoryShare>,
}

/// Monthly report with per-category detail rows.
#[derive(Debug, Clone)]
pub struct MonthlyReport {
    pub data: Value,
}

impl MonthlyReport {
    pub fn income_total(&self) -> f64 {
        sum_detail(&self.data, "income_detail")
    }

    pub fn expense_total(&self) -> f64 {
        sum_detail(&self.data, "expense_detail")
    }

    pub fn balance(&self) -> f64 {
        self.income_total() - self.expense_total()
    }
}

fn sum_detail(data: &Value, key: &str) -> f64 {
    data.get(key)
        .and_then(Value::as_array)
        .map_or(0.0, |rows| {
            rows.iter()
                .filter_map(|row| row.get("total"))
                .filter_map(number)
                .sum()
        })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn amount_or_zero<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(amount::deserialize_opt(deserializer)?.unwrap_or_default())
}

/// Summary for `month` (`YYYY-MM`), or the backend's current month.
///
/// # Errors
/// Rejects a malformed month; otherwise see [`ApiClient::send`].
pub async fn summary(client: &ApiClient, month: Option<&str>) -> ApiResult<Summary> {
    if let Some(month) = month {
        validate_year_month(month)?;
    }
    client
        .get_json(ApiRequest::get(SUMMARY_PATH).query_opt("month", month))
        .await
}

/// # Errors
/// Rejects a malformed month; otherwise see [`ApiClient::send`].
pub async fn monthly(client: &ApiClient, month: &str) -> ApiResult<MonthlyReport> {
    validate_year_month(month)?;
    let data = client
        .get_json(ApiRequest::get(MONTHLY_PATH).query("month", month))
        .await?;
    Ok(MonthlyReport { data })
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn yearly(client: &ApiClient, year: i32) -> ApiResult<Value> {
    client
        .get_json(ApiRequest::get(YEARLY_PATH).query("year", year.to_string()))
        .await
}

/// Expense breakdown over an inclusive date range.
///
/// # Errors
/// Rejects `start` after `end`; otherwise see [`ApiClient::send`].
pub async fn expense_analysis(
    client: &ApiClient,
    start: NaiveDate,
    end: NaiveDate,
) -> ApiResult<Value> {
    if start > end {
        return Err(ApiError::validation(format!(
            "start date {start} is after end date {end}"
        )));
    }
    let request = ApiRequest::get(EXPENSE_ANALYSIS_PATH)
        .query("start_date", start.format("%Y-%m-%d").to_string())
        .query("end_date", end.format("%Y-%m-%d").to_string());
    client.get_json(request).await
}

/// Income/expense trend over the last `months` months.
///
/// # Errors
/// Rejects zero months; otherwise see [`ApiClient::send`].
pub async fn trend(client: &ApiClient, months: u32) -> ApiResult<Value> {
    if months == 0 {
        return Err(ApiError::validation("months must be at least 1"));
    }
    client
        .get_json(ApiRequest::get(TREND_PATH).query("months", months.to_string()))
        .await
}
