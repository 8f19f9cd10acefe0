// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait implemented by every external collaborator.

use async_trait::async_trait;

use crate::error::MasdifError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health, and lifecycle shared by all adapters.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Probes the backing service and reports its current status.
    async fn health_check(&self) -> Result<HealthStatus, MasdifError>;

    /// Releases held resources. Called once during shutdown.
    async fn shutdown(&self) -> Result<(), MasdifError>;
}
