//! Business logic for Parley.
//!
//! This crate owns the in-memory chat state and the service that reads
//! and mutates it. It depends only on `parley-types` -- never on any
//! storage or transport crate.

pub mod chat;
