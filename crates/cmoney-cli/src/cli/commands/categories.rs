//! Category command handlers.

use anyhow::{Result, bail};
use cmoney_core::api::categories::{self, Category, CategoryInput, CategoryPatch, CategoryType};
use cmoney_core::router::Route;

use super::money;
use crate::cli::App;

pub async fn list(app: &mut App, kind: Option<CategoryType>) -> Result<()> {
    app.enter(Route::Categories)?;
    let rows = categories::list(&app.client, kind).await?;
    print_rows(&rows);
    Ok(())
}

pub async fn add(app: &mut App, input: &CategoryInput) -> Result<()> {
    app.enter(Route::Categories)?;
    if input.name.trim().is_empty() {
        bail!("Category name must not be empty");
    }
    let row = categories::create(&app.client, input).await?;
    println!("Added {} category {} ({})", row.kind, row.name, row.id);
    Ok(())
}

pub async fn update(app: &mut App, id: u64, patch: &CategoryPatch) -> Result<()> {
    app.enter(Route::Categories)?;
    let row = categories::update(&app.client, id, patch).await?;
    println!("Updated category {} ({})", row.name, row.id);
    Ok(())
}

pub async fn delete(app: &mut App, id: u64) -> Result<()> {
    app.enter(Route::Categories)?;
    categories::delete(&app.client, id).await?;
    println!("Deleted category {id}");
    Ok(())
}

pub async fn init_defaults(app: &mut App) -> Result<()> {
    app.enter(Route::Categories)?;
    let result = categories::init_default(&app.client).await?;
    if result.message.is_empty() {
        println!("Created {} default categories", result.created_count);
    } else {
        println!("{}", result.message);
    }
    Ok(())
}

pub async fn stats(app: &mut App) -> Result<()> {
    app.enter(Route::Categories)?;
    let stats = categories::stats(&app.client).await?;
    for (label, rows) in [("Income", &stats.income), ("Expense", &stats.expense)] {
        println!("{label}:");
        if rows.is_empty() {
            println!("  (none)");
        }
        for row in rows {
            println!(
                "  {:<16} {:>4} uses {:>12}",
                row.name,
                row.usage_count.unwrap_or_default(),
                money(row.total_amount.unwrap_or_default())
            );
        }
    }
    Ok(())
}

fn print_rows(rows: &[Category]) {
    if rows.is_empty() {
        println!("No categories. Run `cmoney categories init-defaults` to create the defaults.");
        return;
    }
    for row in rows {
        let marker = if row.is_default { "*" } else { " " };
        println!("{:>6} {marker} {:<8} {}", row.id, row.kind, row.name);
    }
}
