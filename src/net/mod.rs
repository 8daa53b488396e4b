//! Network layer: wire types, errors, and the REST client.

pub mod api;
pub mod error;
pub mod types;

pub use api::{AuthApi, HttpApi, Payload};
pub use error::ApiError;
pub use types::{Role, RoleSet, User};
