//! Vitae: AI request routing and usage accounting for the resume builder.
//!
//! The crate sits between the product backend and the AI vendors. It
//! decides which provider serves each operation based on the user's
//! subscription tier, retries and falls back when vendors misbehave,
//! prices every call, and keeps an append-only ledger that doubles as
//! the source of truth for quota enforcement and analytics.

pub mod config;
pub mod db;
pub mod models;
pub mod pricing;
pub mod providers;
pub mod quota;
pub mod routes;
pub mod routing;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;
