#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! agentauthd library - HTTP surface for the multi-agent token binding demo

pub mod api;
pub mod config;
pub mod error;
pub mod state;
