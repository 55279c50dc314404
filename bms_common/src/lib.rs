//! # bms_common
//!
//! Shared building blocks for the BMS inventory backend. Each top-level module is
//! gated behind a cargo feature of the same name so the server only pulls in what
//! it uses.
//!
//! - **`notify`**: the process-wide registry of connected WebSocket clients and the
//!   best-effort JSON event fan-out.
//! - **`imaging`**: normalization of user-submitted data-URL images into bounded,
//!   upright, opaque JPEGs.
//! - **`store`**: a small in-memory document store with named collections.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

#[cfg(feature = "notify")]
pub mod notify;

#[cfg(feature = "imaging")]
pub mod imaging;

#[cfg(feature = "store")]
pub mod store;
