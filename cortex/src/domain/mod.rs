// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Domain types for the mission memory.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Knowledge nodes, relations, cortex events and the embedding contract

pub mod embedding;
pub mod events;
pub mod graph;

pub use embedding::*;
pub use events::*;
pub use graph::*;
