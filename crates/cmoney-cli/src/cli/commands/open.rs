//! `open <route>`: guarded navigation by path.

use anyhow::Result;
use cmoney_core::api::transactions::TransactionFilter;
use cmoney_core::router::{Navigation, Route};

use crate::cli::App;

pub async fn run(app: &mut App, path: &str) -> Result<()> {
    let outcome = app.router.navigate(path)?;
    if let Navigation::Redirect(target) = outcome {
        println!("Not logged in; redirected to {target}");
        return Ok(());
    }

    match outcome.route() {
        Route::Dashboard => super::dashboard::run(app, None).await,
        Route::Transactions => {
            super::transactions::list(app, &TransactionFilter::default()).await
        }
        Route::Categories => super::categories::list(app, None).await,
        Route::Budgets => super::budgets::current(app).await,
        Route::Reports => super::reports::summary(app, None).await,
        Route::Login => {
            println!("Run `cmoney login --username <name>` to sign in.");
            Ok(())
        }
        Route::Register => {
            println!("Run `cmoney register --username <name> --email <email>` to create an account.");
            Ok(())
        }
    }
}
