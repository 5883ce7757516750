// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Options handler trait: raw caller parameters to typed invocation options.

use crate::error::HubError;
use crate::model::{ModelDefinition, Parameters};
use crate::options::ModelOptions;

/// Converts raw, untyped caller parameters into the typed options a specific
/// model or provider understands.
pub trait OptionsHandler: Send + Sync + 'static {
    fn build_options(
        &self,
        definition: &ModelDefinition,
        parameters: &Parameters,
    ) -> Result<ModelOptions, HubError>;
}
