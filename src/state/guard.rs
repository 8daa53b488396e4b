//! Navigation guard: decides whether a screen renders or redirects.
//!
//! The decision is a pure function of the session snapshot and the route's
//! allowed roles. While startup validation is in flight the guard answers
//! `Loading` and never redirects, so a stored session is not bounced to the
//! landing page before it has been checked.

use crate::net::types::RoleSet;

use super::routes::{Access, Route};
use super::session::Session;

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not settled yet; show a neutral loading state.
    Loading,
    /// Navigate elsewhere. `from` is the attempted route when a sign-in
    /// could return the user to it.
    Redirect { to: Route, from: Option<Route> },
    Render,
}

/// Evaluate a guard with an explicit allowed-role set.
/// An empty set admits any authenticated role.
#[must_use]
pub fn evaluate(session: &Session, allowed: RoleSet) -> GuardDecision {
    match (session.loading, &session.user, &session.token) {
        (true, _, _) => GuardDecision::Loading,
        (false, Some(user), Some(_)) => {
            if allowed.is_empty() || allowed.contains(user.role) {
                GuardDecision::Render
            } else {
                GuardDecision::Redirect { to: Route::Dashboard, from: None }
            }
        }
        (false, _, _) => GuardDecision::Redirect { to: Route::Landing, from: None },
    }
}

/// Evaluate the guard for a route using its declared access.
#[must_use]
pub fn check_route(session: &Session, route: Route) -> GuardDecision {
    match route.access() {
        Access::Public => GuardDecision::Render,
        Access::Guarded(allowed) => match evaluate(session, allowed) {
            GuardDecision::Redirect { to: Route::Landing, .. } => {
                GuardDecision::Redirect { to: Route::Landing, from: Some(route) }
            }
            decision => decision,
        },
    }
}

/// Inline role gate for role-specific content within a screen: show it only
/// when the user holds one of `roles`.
#[must_use]
pub fn role_gate(session: &Session, roles: impl Into<RoleSet>) -> bool {
    session.has_role(roles)
}
