//! Integration test suite for conductor.
//!
//! These tests drive the public API end to end: plans are loaded, the
//! orchestrator is mutated through its write path, and the execution monitor
//! observes it through shared state.
//!
//! # Test Categories
//!
//! - `orchestrator_flow`: readiness, unblocking, waves and project metrics
//! - `monitor_flow`: bottleneck lifecycle, suggestions and histories
//! - `plan_loading`: TOML plans and configuration files

mod fixtures;

mod monitor_flow;
mod orchestrator_flow;
mod plan_loading;
