// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Mission orchestration engine: the cycle scheduler, agent lifecycle, the
//! architect's tool dispatch loop and mission persistence.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Wires the mission memory (`conclave-cortex`) to LLM oracles

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
