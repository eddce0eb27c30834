//! Shared domain types for Parley.
//!
//! This crate contains the chat domain records -- `Chat`, `Message`, their
//! identifier newtypes -- and the `ChatError` failure taxonomy.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod chat;
pub mod error;
