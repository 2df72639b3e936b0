//! Budget command handlers.

use anyhow::Result;
use cmoney_core::api::budgets::{self, Budget, BudgetFilter, BudgetInput};
use cmoney_core::router::Route;

use super::money;
use crate::cli::{App, BudgetForm};

pub async fn list(app: &mut App, filter: &BudgetFilter) -> Result<()> {
    app.enter(Route::Budgets)?;
    let rows = budgets::list(&app.client, filter).await?;
    print_rows(&rows);
    Ok(())
}

pub async fn add(app: &mut App, form: &BudgetForm) -> Result<()> {
    app.enter(Route::Budgets)?;
    let row = budgets::create(&app.client, &input_from(form)).await?;
    println!("Added {} budget for {} ({})", row.scope(), row.year_month, row.id);
    Ok(())
}

pub async fn update(app: &mut App, id: u64, form: &BudgetForm) -> Result<()> {
    app.enter(Route::Budgets)?;
    let row = budgets::update(&app.client, id, &input_from(form)).await?;
    println!("Updated budget {} for {}", row.id, row.year_month);
    Ok(())
}

pub async fn delete(app: &mut App, id: u64) -> Result<()> {
    app.enter(Route::Budgets)?;
    budgets::delete(&app.client, id).await?;
    println!("Deleted budget {id}");
    Ok(())
}

pub async fn copy_next(app: &mut App, id: u64) -> Result<()> {
    app.enter(Route::Budgets)?;
    let row = budgets::copy_to_next_month(&app.client, id).await?;
    println!("Copied budget {id} to {} ({})", row.year_month, row.id);
    Ok(())
}

pub async fn current(app: &mut App) -> Result<()> {
    app.enter(Route::Budgets)?;
    let rows = budgets::current_month(&app.client).await?;
    print_rows(&rows);
    Ok(())
}

pub async fn alerts(app: &mut App) -> Result<()> {
    app.enter(Route::Budgets)?;
    let rows = budgets::alerts(&app.client).await?;
    if rows.is_empty() {
        println!("No budget alerts.");
        return Ok(());
    }
    print_rows(&rows);
    Ok(())
}

fn input_from(form: &BudgetForm) -> BudgetInput {
    BudgetInput {
        year_month: form
            .month
            .clone()
            .unwrap_or_else(budgets::current_year_month),
        amount: form.amount,
        category: form.category,
        alert_threshold: form.threshold,
    }
}

fn print_rows(rows: &[Budget]) {
    if rows.is_empty() {
        println!("No budgets.");
        return;
    }
    for row in rows {
        let state = if row.is_exceeded {
            "EXCEEDED"
        } else if row.is_alert {
            "ALERT"
        } else {
            ""
        };
        println!(
            "{:>6}  {}  {:<16} {:>12} spent {:>12} ({:.1}%) {state}",
            row.id,
            row.year_month,
            row.scope(),
            money(row.amount),
            money(row.spent_amount.unwrap_or_default()),
            row.usage_percentage.unwrap_or_default(),
        );
    }
}
