//! Client-side session state and navigation guarding.
//!
//! DESIGN
//! ======
//! `session` owns the only mutable state. `guard` and `routes` are pure
//! functions over [`session::Session`] snapshots, so any front end (the CLI
//! here, or a reactive UI) can evaluate them without touching the store.

pub mod guard;
pub mod routes;
pub mod session;

pub use guard::GuardDecision;
pub use routes::Route;
pub use session::{AuthError, Session, SessionStore};
