// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer for the mission memory

pub mod embedding_client;
pub mod graph_store;
pub mod vector_index;

pub use embedding_client::{HashingEmbedder, OpenAiEmbeddingClient};
pub use graph_store::KnowledgeGraph;
pub use vector_index::{cosine_similarity, ScoredNode, SemanticIndex, VectorEntry};
