// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod embedding;
pub mod event_bus;
pub mod kv_store;
pub mod llm;
pub mod sandbox;

pub use embedding::build_embedder;
pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use kv_store::{InMemoryKeyValueStore, SledKeyValueStore};
pub use sandbox::{DisabledSandbox, ProcessSandbox};
