//! Auth command handlers.

use anyhow::{Result, bail};
use cmoney_core::api::auth::{self, Registration};
use cmoney_core::router::Route;
use cmoney_core::session::mask_token;

use super::{money, read_line};
use crate::cli::App;

pub async fn login(
    app: &mut App,
    username: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    app.router.go(Route::Login);

    let Some(username) = username.or_else(|| auth::remembered_username(&app.client)) else {
        bail!("Please specify a username with --username");
    };
    let password = match password {
        Some(password) => password,
        None => read_line("Password")?,
    };
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    auth::login(&app.client, &username, &password, remember).await?;
    app.router.go(Route::Dashboard);

    println!("Logged in as {username}");
    Ok(())
}

pub fn logout(app: &mut App) -> Result<()> {
    let was_logged_in = app.session().snapshot().is_authenticated();
    auth::logout(&app.client)?;
    app.router.sync_auth_events();

    if was_logged_in {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn register(
    app: &mut App,
    username: String,
    email: String,
    phone: Option<String>,
    student_id: Option<String>,
) -> Result<()> {
    app.router.go(Route::Register);

    let password = read_line("Password")?;
    let password_confirm = read_line("Confirm password")?;
    let form = Registration {
        username,
        email,
        phone,
        student_id,
        password,
        password_confirm,
    };

    let user = auth::register(&app.client, &form).await?;
    app.router.go(Route::Login);

    println!("Registered {}. Run `cmoney login -u {}` to sign in.", user.username, user.username);
    Ok(())
}

pub fn status(app: &App) -> Result<()> {
    let session = app.session().snapshot();
    println!("API: {}", app.client.base_url());
    match (&session.username, &session.access_token) {
        (Some(username), Some(token)) => {
            println!("Logged in as {username} (token: {})", mask_token(token));
        }
        (None, Some(token)) => println!("Logged in (token: {})", mask_token(token)),
        _ => println!("Not logged in."),
    }
    if let Some(remembered) = &session.remember_username {
        println!("Remembered username: {remembered}");
    }
    Ok(())
}

pub async fn profile(app: &mut App) -> Result<()> {
    app.enter(Route::Dashboard)?;
    let user = auth::profile(&app.client).await?;
    let stats = auth::stats(&app.client).await?;

    println!("Username:     {}", user.username);
    if let Some(name) = stats.display_name.as_deref().filter(|n| !n.is_empty()) {
        println!("Display name: {name}");
    }
    if let Some(email) = user.email.as_deref() {
        println!("Email:        {email}");
    }
    if let Some(student_id) = user.student_id.as_deref() {
        println!("Student ID:   {student_id}");
    }
    if let Some(profile) = &user.profile {
        if let Some(school) = profile.school.as_deref() {
            println!("School:       {school}");
        }
        if let Some(budget) = profile.monthly_budget {
            println!("Monthly plan: {}", money(budget));
        }
    }
    if let Some(since) = stats.member_since.as_deref() {
        println!("Member since: {since}");
    }
    Ok(())
}

pub async fn change_password(app: &mut App) -> Result<()> {
    app.enter(Route::Dashboard)?;
    let old_password = read_line("Current password")?;
    let new_password = read_line("New password")?;
    let confirm = read_line("Confirm new password")?;

    let ack = auth::change_password(&app.client, &old_password, &new_password, &confirm).await?;
    if ack.message.is_empty() {
        println!("Password changed.");
    } else {
        println!("{}", ack.message);
    }
    Ok(())
}
