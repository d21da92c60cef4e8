//! Frame payload types.
//!
//! Payloads are grouped by concern:
//! - [`chat`]: private, group and broadcast messages plus the outbound form
//! - [`notification`]: server notifications keyed by subtype
//! - [`status`]: connection lifecycle, synthesized locally

pub mod chat;
pub mod notification;
pub mod status;
