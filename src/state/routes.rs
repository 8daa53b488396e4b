//! Dashboard screens and the roles allowed to open them.

use crate::net::types::{Role, RoleSet};

use super::guard::{self, GuardDecision};
use super::session::Session;

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Signed-in users whose role is in the set; the empty set admits any role.
    Guarded(RoleSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Dashboard,
    Analytics,
    AdminUsers,
    AdminUpload,
    ManagerGenerate,
    ManagerPredictions,
    OwnerPending,
    OwnerHistory,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Landing,
        Route::Dashboard,
        Route::Analytics,
        Route::AdminUsers,
        Route::AdminUpload,
        Route::ManagerGenerate,
        Route::ManagerPredictions,
        Route::OwnerPending,
        Route::OwnerHistory,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Dashboard => "/dashboard",
            Self::Analytics => "/analytics",
            Self::AdminUsers => "/admin/users",
            Self::AdminUpload => "/admin/upload",
            Self::ManagerGenerate => "/manager/generate",
            Self::ManagerPredictions => "/manager/predictions",
            Self::OwnerPending => "/owner/pending",
            Self::OwnerHistory => "/owner/history",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Landing => "Home",
            Self::Dashboard => "Dashboard",
            Self::Analytics => "Analytics",
            Self::AdminUsers => "Users",
            Self::AdminUpload => "Data Upload",
            Self::ManagerGenerate => "Generate",
            Self::ManagerPredictions => "My Predictions",
            Self::OwnerPending => "Pending Review",
            Self::OwnerHistory => "Review History",
        }
    }

    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Self::Landing => Access::Public,
            Self::Dashboard | Self::Analytics => Access::Guarded(RoleSet::ANY),
            Self::AdminUsers | Self::AdminUpload => Access::Guarded(RoleSet::only(Role::Admin)),
            Self::ManagerGenerate | Self::ManagerPredictions => {
                Access::Guarded(RoleSet::only(Role::Manager).with(Role::Admin))
            }
            Self::OwnerPending | Self::OwnerHistory => Access::Guarded(RoleSet::only(Role::Owner).with(Role::Admin)),
        }
    }

    /// Parse a location path. A trailing slash and query string are ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }
}

/// Guarded routes the session may open, in navigation order.
#[must_use]
pub fn nav_items(session: &Session) -> Vec<Route> {
    Route::ALL
        .into_iter()
        .filter(|route| matches!(route.access(), Access::Guarded(_)))
        .filter(|route| guard::check_route(session, *route) == GuardDecision::Render)
        .collect()
}
