// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Mission domain: agents, stagnation tracking, the architect payload, tool
//! contracts, snapshot format and configuration.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O beyond configuration loading

pub mod agent;
pub mod config;
pub mod events;
pub mod llm;
pub mod repository;
pub mod sandbox;
pub mod snapshot;
pub mod stagnation;
pub mod synthesis;
pub mod tool;
