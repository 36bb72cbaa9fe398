//! HTTP surface of the administration service
//!
//! `/mcp` is guarded by the bearer-token middleware; `/health` and
//! `/.well-known/mcp` are public.

pub mod handlers;
