//! Transaction command handlers.

use anyhow::{Result, bail};
use chrono::Local;
use cmoney_core::api::transactions::{
    self, Transaction, TransactionFilter, TransactionInput, TransactionPatch,
};
use cmoney_core::commands::AppCommand;
use cmoney_core::router::{Navigation, Route};

use super::money;
use crate::cli::{App, TransactionForm};

pub async fn list(app: &mut App, filter: &TransactionFilter) -> Result<()> {
    app.enter(Route::Transactions)?;
    let rows = transactions::list(&app.client, filter).await?;
    print_rows(&rows);
    Ok(())
}

pub async fn add(app: &mut App, form: &TransactionForm) -> Result<()> {
    app.enter(Route::Transactions)?;
    submit(app, form).await
}

/// Opens the transactions view through the router and fills the add form
/// once the view receives the quick-add command.
pub async fn quick_add(app: &mut App, form: &TransactionForm) -> Result<()> {
    let mut commands = app.bus.subscribe();
    if let Navigation::Redirect(target) = app.router.quick_add() {
        bail!("Not logged in (redirected to {target}). Run `cmoney login` first.");
    }

    let mut open_form = false;
    while let Ok(command) = commands.try_recv() {
        if command == AppCommand::QuickAdd {
            open_form = true;
        }
    }
    if !open_form {
        bail!("Transactions view did not receive the quick-add command");
    }
    submit(app, form).await
}

pub async fn update(app: &mut App, id: u64, patch: &TransactionPatch) -> Result<()> {
    app.enter(Route::Transactions)?;
    if patch.is_empty() {
        bail!("Nothing to update: pass at least one of --amount, --category, --date, --description");
    }
    if patch.amount.is_some_and(|a| a.is_nan() || a <= 0.0) {
        bail!("Amount must be greater than 0");
    }
    let row = transactions::update(&app.client, id, patch).await?;
    println!("Updated transaction {}", row.id);
    Ok(())
}

pub async fn delete(app: &mut App, id: u64) -> Result<()> {
    app.enter(Route::Transactions)?;
    transactions::delete(&app.client, id).await?;
    println!("Deleted transaction {id}");
    Ok(())
}

async fn submit(app: &App, form: &TransactionForm) -> Result<()> {
    if form.amount.is_nan() || form.amount <= 0.0 {
        bail!("Amount must be greater than 0");
    }
    let input = TransactionInput {
        amount: form.amount,
        category: form.category,
        transaction_date: form.date.unwrap_or_else(|| Local::now().date_naive()),
        description: form.description.clone(),
    };
    let row = transactions::create(&app.client, &input).await?;
    println!(
        "Added transaction {}: {} {} on {}",
        row.id,
        row.category_name(),
        money(row.signed_amount()),
        row.transaction_date
    );
    Ok(())
}

pub(crate) fn print_rows(rows: &[Transaction]) {
    if rows.is_empty() {
        println!("No transactions.");
        return;
    }
    for row in rows {
        println!(
            "{:>6}  {}  {:<16} {:>12}  {}",
            row.id,
            row.transaction_date,
            row.category_name(),
            money(row.signed_amount()),
            row.description
        );
    }
}
