// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for modelhub integration tests.
//!
//! Provides mock models, factories and provider plugins plus a harness that
//! wires a plugin manager and model client over temp directories, so
//! lifecycle and dispatch tests run without real providers.
//!
//! # Components
//!
//! - [`MockFactory`] - Builds echo models and records every invocation
//! - [`MockProviderPlugin`] - Provider plugin with injectable hook failures
//! - [`PackageBuilder`] - Builds plugin archives in memory
//! - [`TestHarness`] - Manager, adapter and client wired together

pub mod harness;
pub mod mock_model;
pub mod mock_plugin;
pub mod package;

pub use harness::TestHarness;
pub use mock_model::{Invocation, MockFactory, TaggingOptionsHandler};
pub use mock_plugin::{FailurePoint, MockProviderPlugin};
pub use package::PackageBuilder;
