//! Drives one action through the gateway and decides how the view recovers.

use std::sync::Arc;

use shared::{
    domain::{Environment, Package},
    error::RemoteError,
};
use tracing::{info, warn};

use crate::{
    actions::{ActionKey, ActionRequest},
    ManagementApi,
};

/// The single state-refresh policy applied after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to refresh.
    None,
    /// Wholesale replacement of the environment list.
    Environments(Result<Vec<Environment>, RemoteError>),
    /// Wholesale replacement of one environment's packages.
    Packages {
        env: String,
        packages: Result<Vec<Package>, RemoteError>,
    },
    /// Manifest text to be saved on the client as `{env}.yml`.
    SaveManifest { env: String, manifest: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded {
        key: ActionKey,
        /// `None` for silent actions such as listing.
        notice: Option<String>,
        effect: Effect,
    },
    Failed {
        key: ActionKey,
        message: String,
    },
}

impl ActionOutcome {
    pub fn key(&self) -> &ActionKey {
        match self {
            ActionOutcome::Succeeded { key, .. } | ActionOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded { .. })
    }
}

#[derive(Clone)]
pub struct ActionCoordinator {
    gateway: Arc<dyn ManagementApi>,
}

impl ActionCoordinator {
    pub fn new(gateway: Arc<dyn ManagementApi>) -> Self {
        Self { gateway }
    }

    /// Runs `request` to completion. Failures never escape as errors; they become
    /// a `Failed` outcome and leave the caller's state as it was.
    pub async fn execute(&self, request: ActionRequest) -> ActionOutcome {
        let key = request.key();
        if let Err(err) = request.validate() {
            warn!(action = %key.kind, target = %key.target, "rejected before dispatch: {err}");
            return ActionOutcome::Failed {
                key,
                message: err.to_string(),
            };
        }

        match self.run(request).await {
            Ok((notice, effect)) => {
                info!(action = %key.kind, target = %key.target, "action completed");
                ActionOutcome::Succeeded {
                    key,
                    notice,
                    effect,
                }
            }
            Err(err) => {
                warn!(action = %key.kind, target = %key.target, "action failed: {err}");
                ActionOutcome::Failed {
                    key,
                    message: err.to_string(),
                }
            }
        }
    }

    async fn environments(&self) -> Effect {
        Effect::Environments(self.gateway.list_environments().await)
    }

    async fn packages(&self, env: String) -> Effect {
        let packages = self.gateway.list_packages(&env).await;
        Effect::Packages { env, packages }
    }

    async fn run(&self, request: ActionRequest) -> Result<(Option<String>, Effect), RemoteError> {
        let gateway = &self.gateway;
        match request {
            ActionRequest::Refresh => {
                let environments = gateway.list_environments().await?;
                Ok((None, Effect::Environments(Ok(environments))))
            }
            ActionRequest::Create {
                name,
                runtime_version,
            } => {
                let name = name.trim();
                gateway.create_environment(name, runtime_version.trim()).await?;
                Ok((
                    Some(format!("Environment '{name}' created")),
                    self.environments().await,
                ))
            }
            ActionRequest::Import {
                manifest,
                name,
                runtime_version,
            } => {
                let name = name.as_deref().map(str::trim).filter(|n| !n.is_empty());
                let runtime_version = runtime_version
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty());
                gateway
                    .import_environment(&manifest, name, runtime_version)
                    .await?;
                let notice = match name {
                    Some(name) => format!("Environment '{name}' imported from '{}'", manifest.file_name),
                    None => format!("Environment imported from '{}'", manifest.file_name),
                };
                Ok((Some(notice), self.environments().await))
            }
            ActionRequest::Clone { source, new_name } => {
                let new_name = new_name.trim();
                gateway.clone_environment(&source, new_name).await?;
                Ok((
                    Some(format!("Environment '{source}' cloned to '{new_name}'")),
                    self.environments().await,
                ))
            }
            ActionRequest::Delete { env } => {
                gateway.delete_environment(&env).await?;
                Ok((
                    Some(format!("Environment '{env}' deleted")),
                    self.environments().await,
                ))
            }
            ActionRequest::Export { env } => {
                let manifest = gateway.export_environment(&env).await?;
                Ok((
                    Some(format!("Exported '{env}' to {env}.yml")),
                    Effect::SaveManifest { env, manifest },
                ))
            }
            ActionRequest::CheckSize { env } => {
                let size = gateway.environment_size(&env).await?;
                Ok((Some(format!("Disk usage for '{env}': {size}")), Effect::None))
            }
            ActionRequest::OpenPackages { env } => {
                let packages = gateway.list_packages(&env).await?;
                Ok((
                    None,
                    Effect::Packages {
                        env,
                        packages: Ok(packages),
                    },
                ))
            }
            ActionRequest::Install { env, spec } => {
                let spec = spec.trim();
                gateway.install_package(&env, spec).await?;
                let notice = format!("Package '{spec}' installed into '{env}'");
                Ok((Some(notice), self.packages(env).await))
            }
            ActionRequest::Uninstall { env, package } => {
                gateway.uninstall_package(&env, &package).await?;
                let notice = format!("Package '{package}' uninstalled from '{env}'");
                Ok((Some(notice), self.packages(env).await))
            }
            ActionRequest::BulkInstall { env, manifest } => {
                let message = gateway.install_from_file(&env, &manifest).await?;
                Ok((Some(message), self.packages(env).await))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
