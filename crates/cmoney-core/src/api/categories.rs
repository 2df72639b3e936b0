//! Income and expense categories.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use super::{Listing, amount};
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiResult;

pub const PATH: &str = "/categories/";
pub const INIT_DEFAULT_PATH: &str = "/categories/init_default/";
pub const STATS_PATH: &str = "/categories/stats/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            other => bail!("Unknown category type '{other}' (expected income or expense)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    #[serde(default, deserialize_with = "super::null_default")]
    pub icon: String,
    #[serde(default, deserialize_with = "super::null_default")]
    pub color: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub order: i64,
    /// Only present on list and stats responses.
    #[serde(default)]
    pub usage_count: Option<u64>,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub total_amount: Option<f64>,
}

/// The compact category embedded in transactions and budgets.
pub type CategoryInfo = Category;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CategoryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitDefaults {
    #[serde(default)]
    pub message: String,
    pub created_count: u64,
}

/// Categories grouped by type, each with usage figures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryStats {
    #[serde(default)]
    pub income: Vec<Category>,
    #[serde(default)]
    pub expense: Vec<Category>,
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn list(client: &ApiClient, kind: Option<CategoryType>) -> ApiResult<Vec<Category>> {
    let request = ApiRequest::get(PATH).query_opt("type", kind.map(CategoryType::as_str));
    let listing: Listing<Category> = client.get_json(request).await?;
    Ok(listing.into_vec())
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn create(client: &ApiClient, input: &CategoryInput) -> ApiResult<Category> {
    client.post_json(PATH, input).await
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn update(client: &ApiClient, id: u64, patch: &CategoryPatch) -> ApiResult<Category> {
    client.patch_json(&item_path(id), patch).await
}

/// The backend refuses to delete default categories or ones still in use.
///
/// # Errors
/// See [`ApiClient::send`].
pub async fn delete(client: &ApiClient, id: u64) -> ApiResult<()> {
    client.delete(&item_path(id)).await
}

/// Creates the stock category set; existing names are skipped server-side.
///
/// # Errors
/// See [`ApiClient::send`].
pub async fn init_default(client: &ApiClient) -> ApiResult<InitDefaults> {
    let response = client.send(&ApiRequest::post(INIT_DEFAULT_PATH)).await?;
    response.json()
}

/// # Errors
/// See [`ApiClient::send`].
pub async fn stats(client: &ApiClient) -> ApiResult<CategoryStats> {
    client.get_json(ApiRequest::get(STATS_PATH)).await
}

fn item_path(id: u64) -> String {
    format!("{PATH}{id}/")
}
