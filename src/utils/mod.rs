//! Shared helpers: process bootstrap and conflict retry.

pub mod bootstrap;
pub mod retry;
