//! Navigation guard.
//!
//! Runs before every view is entered. Protected views need an authenticated
//! session; the login view is skipped for users who already have one.

use std::sync::Arc;

use super::route::Route;
use crate::session::SessionStore;

/// Maximum redirects followed by [`RouteGuard::resolve`].
const MAX_REDIRECTS: usize = 4;

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Enter the requested view.
    Proceed(Route),
    /// Go somewhere else instead.
    Redirect(Route),
}

/// Guard consulted before entering a view.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    pub const fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decide whether `target` may be entered.
    ///
    /// May clear an expired session, see [`SessionStore::is_authenticated`].
    pub fn before_each(&self, target: Route) -> Navigation {
        match target {
            Route::Root => Navigation::Redirect(Route::Runbooks),
            Route::Login { .. } if self.session.is_authenticated() => {
                Navigation::Redirect(Route::Runbooks)
            }
            target if target.requires_auth() && !self.session.is_authenticated() => {
                tracing::debug!(route = %target, "not authenticated, redirecting to login");
                Navigation::Redirect(Route::Login {
                    redirect: Some(target.path()),
                })
            }
            target => Navigation::Proceed(target),
        }
    }

    /// Follow redirects from `target` to the view that will actually be shown.
    pub fn resolve(&self, target: Route) -> Route {
        let mut current = target;
        for _ in 0..MAX_REDIRECTS {
            match self.before_each(current) {
                Navigation::Proceed(route) => return route,
                Navigation::Redirect(route) => current = route,
            }
        }
        current
    }
}
