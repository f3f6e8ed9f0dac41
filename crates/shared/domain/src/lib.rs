//! # Domain Models
//!
//! Plain data shared by the Coffer crates. Only `serde` is allowed here:
//! no I/O, no crypto, no logic beyond defaults and small helpers.

pub mod config;
