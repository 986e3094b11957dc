// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `conclave-cortex`: Mission Memory
//!
//! Holds the shared findings of a research mission and answers similarity
//! queries over them.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `KnowledgeNode`, `NodeId`, `NodeType`, `Relation`, `Embedder` |
//! | [`infrastructure`] | Infrastructure | `KnowledgeGraph`, `SemanticIndex`, embedding clients |
//!
//! The graph is append-only: nodes are never deleted and only their
//! `verified` flag may change after insertion. Invalidation is derived from
//! relations on every read.

pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::*;
