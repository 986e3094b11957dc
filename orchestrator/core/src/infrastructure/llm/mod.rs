// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Generation Oracle Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the domain oracle contract and a provider
// wire format. The router binds mission roles to adapters.

pub mod openai;
pub mod registry;

pub use openai::OpenAIAdapter;
pub use registry::{OracleRouter, RoutedOracle};
