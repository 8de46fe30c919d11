// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the engine.
//!
//! Every diagnostic the crate emits is a message struct in [`messages`]. Each
//! message implements `Display` for the human-readable line and
//! [`messages::StructuredLog`] to emit it through `tracing` with its fields
//! attached, so call sites never carry format strings.
//!
//! Installing a subscriber is left to the embedding binary; `dagflow` itself
//! only emits events.

pub mod messages;
