//! TrendSense dashboard client.
//!
//! Session lifecycle (`state::session`), route guarding (`state::guard`,
//! `state::routes`), persisted credentials (`storage`), the REST transport
//! (`net`), and typed role-area endpoints (`services`). The `cli` module wires
//! them together behind the `trendsense` binary.

pub mod cli;
pub mod config;
pub mod net;
pub mod services;
pub mod state;
pub mod storage;
