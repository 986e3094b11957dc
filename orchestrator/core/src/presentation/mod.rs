// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`conclave-core`)
//!
//! HTTP surface that translates external requests into scheduler calls.
//! No mission logic lives here; everything is delegated to
//! `crate::application::scheduler::CycleScheduler`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP/SSE (Axum) | Mission control endpoints and the live event stream |

pub mod api;
