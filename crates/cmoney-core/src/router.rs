//! Hash-style routes and the login guard.

use std::fmt;

use anyhow::{Result, bail};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::commands::{AppCommand, CommandBus};
use crate::session::{AuthEvent, Session, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Transactions,
    Categories,
    Budgets,
    Reports,
    Login,
    Register,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Dashboard,
        Route::Transactions,
        Route::Categories,
        Route::Budgets,
        Route::Reports,
        Route::Login,
        Route::Register,
    ];

    /// Parses `#/budgets`, `/budgets` or `budgets`. The empty path is the dashboard.
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let name = trimmed.trim_matches('/');
        match name {
            "" | "dashboard" => Some(Route::Dashboard),
            "transactions" => Some(Route::Transactions),
            "categories" => Some(Route::Categories),
            "budgets" => Some(Route::Budgets),
            "reports" => Some(Route::Reports),
            "login" => Some(Route::Login),
            "register" => Some(Route::Register),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Transactions => "/transactions",
            Route::Categories => "/categories",
            Route::Budgets => "/budgets",
            Route::Reports => "/reports",
            Route::Login => "/login",
            Route::Register => "/register",
        }
    }

    /// Everything except the login and registration views needs a session.
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a guarded navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed(Route),
    /// Navigation was cancelled and sent elsewhere instead.
    Redirect(Route),
}

impl Navigation {
    /// The route the user actually lands on.
    pub fn route(self) -> Route {
        match self {
            Navigation::Proceed(route) | Navigation::Redirect(route) => route,
        }
    }
}

/// Checks token presence only; freshness is left to the API client.
pub struct RouteGuard;

impl RouteGuard {
    pub fn check(route: Route, session: &Session) -> Navigation {
        if route.is_protected() && !session.is_authenticated() {
            Navigation::Redirect(Route::Login)
        } else {
            Navigation::Proceed(route)
        }
    }
}

/// Tracks the active view, applies the guard, and follows forced logouts.
#[derive(Debug)]
pub struct Router {
    session: SessionManager,
    bus: CommandBus,
    auth_events: broadcast::Receiver<AuthEvent>,
    current: Route,
}

impl Router {
    pub fn new(session: SessionManager, bus: CommandBus) -> Self {
        let auth_events = session.subscribe();
        Self {
            session,
            bus,
            auth_events,
            current: Route::Login,
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    /// Navigates to `path` through the guard.
    ///
    /// # Errors
    /// Returns an error if `path` names no known route.
    pub fn navigate(&mut self, path: &str) -> Result<Navigation> {
        let Some(route) = Route::parse(path) else {
            bail!("Unknown route: {path}");
        };
        Ok(self.go(route))
    }

    pub fn go(&mut self, route: Route) -> Navigation {
        self.sync_auth_events();
        let outcome = RouteGuard::check(route, &self.session.snapshot());
        if let Navigation::Redirect(target) = outcome {
            tracing::debug!(requested = %route, redirect = %target, "navigation redirected");
        }
        self.enter(outcome.route());
        outcome
    }

    /// Opens the transactions view and asks it to show the add form.
    pub fn quick_add(&mut self) -> Navigation {
        let outcome = self.go(Route::Transactions);
        if outcome == Navigation::Proceed(Route::Transactions) {
            self.bus.publish(AppCommand::QuickAdd);
        }
        outcome
    }

    /// Applies pending auth events. A logout moves the user to the login view.
    pub fn sync_auth_events(&mut self) {
        loop {
            match self.auth_events.try_recv() {
                Ok(AuthEvent::LoggedOut { reason }) => {
                    tracing::info!(?reason, "session ended; returning to login");
                    self.enter(Route::Login);
                }
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn enter(&mut self, route: Route) {
        if self.current != route {
            self.current = route;
            self.bus.publish(AppCommand::Navigate(route));
        }
    }
}
