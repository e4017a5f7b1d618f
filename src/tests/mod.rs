//! Consolidated test modules.
//!
//! Provider adapters are exercised against wiremock servers; the HTTP
//! surface is exercised end to end over a local listener.

mod provider_http;
