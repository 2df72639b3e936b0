//! Report command handlers.

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use cmoney_core::api::budgets::current_year_month;
use cmoney_core::api::reports::{self, Summary};
use cmoney_core::router::Route;

use super::{money, print_json};
use crate::cli::App;

pub async fn summary(app: &mut App, month: Option<&str>) -> Result<()> {
    app.enter(Route::Reports)?;
    let summary = reports::summary(&app.client, month).await?;
    print_summary(&summary);
    Ok(())
}

pub async fn monthly(app: &mut App, month: Option<String>) -> Result<()> {
    app.enter(Route::Reports)?;
    let month = month.unwrap_or_else(current_year_month);
    let report = reports::monthly(&app.client, &month).await?;
    println!(
        "{month}: income {}  expense {}  balance {}",
        money(report.income_total()),
        money(report.expense_total()),
        money(report.balance())
    );
    print_json(&report.data)
}

pub async fn yearly(app: &mut App, year: Option<i32>) -> Result<()> {
    app.enter(Route::Reports)?;
    let year = year.unwrap_or_else(|| Local::now().year());
    print_json(&reports::yearly(&app.client, year).await?)
}

pub async fn expense_analysis(app: &mut App, start: NaiveDate, end: NaiveDate) -> Result<()> {
    app.enter(Route::Reports)?;
    print_json(&reports::expense_analysis(&app.client, start, end).await?)
}

pub async fn trend(app: &mut App, months: u32) -> Result<()> {
    app.enter(Route::Reports)?;
    print_json(&reports::trend(&app.client, months).await?)
}

pub(crate) fn print_summary(summary: &Summary) {
    println!("Month:    {}", summary.year_month);
    println!(
        "Income:   {:>12} ({} transactions)",
        money(summary.income.total),
        summary.income.count
    );
    println!(
        "Expense:  {:>12} ({} transactions)",
        money(summary.expense.total),
        summary.expense.count
    );
    println!("Balance:  {:>12}", money(summary.balance));
    if let Some(budget) = &summary.budget {
        let flag = if budget.is_exceeded {
            "  EXCEEDED"
        } else if budget.is_alert {
            "  ALERT"
        } else {
            ""
        };
        println!(
            "Budget:   {:>12} used {:.1}% remaining {}{flag}",
            money(budget.amount),
            budget.usage_percentage,
            money(budget.remaining)
        );
    }
    for share in &summary.category_distribution {
        println!(
            "  {:<16} {:>12} {:>6.2}%",
            share.category_name,
            money(share.amount),
            share.percentage
        );
    }
}
