//! Dashboard command handler.

use anyhow::Result;
use cmoney_core::api::dashboard;
use cmoney_core::router::Route;

use super::reports::print_summary;
use super::transactions::print_rows;
use crate::cli::App;

pub async fn run(app: &mut App, month: Option<&str>) -> Result<()> {
    app.enter(Route::Dashboard)?;
    let view = dashboard::load(&app.client, month).await?;
    print_summary(&view.summary);
    println!();
    println!("Recent transactions:");
    print_rows(&view.recent);
    Ok(())
}
