//! User-triggerable actions and their local preconditions.

use std::fmt;

use shared::domain::{ManifestFile, BASE_ENVIRONMENT};
use thiserror::Error;

/// Separator and suffix appended to a source name to suggest a clone name.
pub const CLONE_SUFFIX: &str = "_clone";

pub fn clone_default_name(source: &str) -> String {
    format!("{source}{CLONE_SUFFIX}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Refresh,
    Create,
    Import,
    Clone,
    Delete,
    Export,
    CheckSize,
    OpenPackages,
    Install,
    Uninstall,
    BulkInstall,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Refresh => "refresh",
            ActionKind::Create => "create",
            ActionKind::Import => "import",
            ActionKind::Clone => "clone",
            ActionKind::Delete => "delete",
            ActionKind::Export => "export",
            ActionKind::CheckSize => "check_size",
            ActionKind::OpenPackages => "open_packages",
            ActionKind::Install => "install",
            ActionKind::Uninstall => "uninstall",
            ActionKind::BulkInstall => "bulk_install",
        }
    }

    /// Long-running actions get a loading notice while they are in flight.
    pub fn shows_progress(self) -> bool {
        matches!(
            self,
            ActionKind::Create
                | ActionKind::Import
                | ActionKind::Clone
                | ActionKind::Delete
                | ActionKind::Install
                | ActionKind::Uninstall
                | ActionKind::BulkInstall
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of an action for in-flight tracking: kind plus target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub kind: ActionKind,
    pub target: String,
}

impl ActionKey {
    pub fn new(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Refresh,
    Create {
        name: String,
        runtime_version: String,
    },
    Import {
        manifest: ManifestFile,
        name: Option<String>,
        runtime_version: Option<String>,
    },
    Clone {
        source: String,
        new_name: String,
    },
    Delete {
        env: String,
    },
    Export {
        env: String,
    },
    CheckSize {
        env: String,
    },
    OpenPackages {
        env: String,
    },
    Install {
        env: String,
        spec: String,
    },
    Uninstall {
        env: String,
        package: String,
    },
    BulkInstall {
        env: String,
        manifest: ManifestFile,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("environment name is required")]
    MissingEnvironmentName,
    #[error("runtime version is required")]
    MissingRuntimeVersion,
    #[error("new environment name is required")]
    MissingCloneName,
    #[error("package name is required")]
    MissingPackage,
    #[error("no file selected")]
    MissingManifest,
    #[error("the '{0}' environment cannot be deleted")]
    ProtectedEnvironment(String),
}

fn required(value: &str, err: ValidationError) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Refresh => ActionKind::Refresh,
            ActionRequest::Create { .. } => ActionKind::Create,
            ActionRequest::Import { .. } => ActionKind::Import,
            ActionRequest::Clone { .. } => ActionKind::Clone,
            ActionRequest::Delete { .. } => ActionKind::Delete,
            ActionRequest::Export { .. } => ActionKind::Export,
            ActionRequest::CheckSize { .. } => ActionKind::CheckSize,
            ActionRequest::OpenPackages { .. } => ActionKind::OpenPackages,
            ActionRequest::Install { .. } => ActionKind::Install,
            ActionRequest::Uninstall { .. } => ActionKind::Uninstall,
            ActionRequest::BulkInstall { .. } => ActionKind::BulkInstall,
        }
    }

    /// Environment the action touches, if any.
    pub fn environment(&self) -> Option<&str> {
        match self {
            ActionRequest::Refresh => None,
            ActionRequest::Create { name, .. } => Some(name.as_str()),
            ActionRequest::Import { name, .. } => name.as_deref(),
            ActionRequest::Clone { source, .. } => Some(source.as_str()),
            ActionRequest::Delete { env }
            | ActionRequest::Export { env }
            | ActionRequest::CheckSize { env }
            | ActionRequest::OpenPackages { env }
            | ActionRequest::Install { env, .. }
            | ActionRequest::Uninstall { env, .. }
            | ActionRequest::BulkInstall { env, .. } => Some(env.as_str()),
        }
    }

    pub fn target(&self) -> String {
        match self {
            ActionRequest::Refresh => String::new(),
            ActionRequest::Import { manifest, name, .. } => name
                .clone()
                .unwrap_or_else(|| manifest.file_name.clone()),
            ActionRequest::Uninstall { env, package } => format!("{env}/{package}"),
            other => other.environment().unwrap_or_default().to_string(),
        }
    }

    pub fn key(&self) -> ActionKey {
        ActionKey::new(self.kind(), self.target())
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            ActionRequest::Delete { .. }
                | ActionRequest::Install { .. }
                | ActionRequest::Uninstall { .. }
                | ActionRequest::BulkInstall { .. }
        )
    }

    /// Local preconditions; a request failing these is never sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ActionRequest::Refresh => Ok(()),
            ActionRequest::Create {
                name,
                runtime_version,
            } => {
                required(name, ValidationError::MissingEnvironmentName)?;
                required(runtime_version, ValidationError::MissingRuntimeVersion)
            }
            ActionRequest::Import { manifest, .. } => {
                if manifest.is_missing() {
                    Err(ValidationError::MissingManifest)
                } else {
                    Ok(())
                }
            }
            ActionRequest::Clone { source, new_name } => {
                required(source, ValidationError::MissingEnvironmentName)?;
                required(new_name, ValidationError::MissingCloneName)
            }
            ActionRequest::Delete { env } => {
                required(env, ValidationError::MissingEnvironmentName)?;
                if env == BASE_ENVIRONMENT {
                    return Err(ValidationError::ProtectedEnvironment(env.clone()));
                }
                Ok(())
            }
            ActionRequest::Export { env }
            | ActionRequest::CheckSize { env }
            | ActionRequest::OpenPackages { env } => {
                required(env, ValidationError::MissingEnvironmentName)
            }
            ActionRequest::Install { env, spec } => {
                required(env, ValidationError::MissingEnvironmentName)?;
                required(spec, ValidationError::MissingPackage)
            }
            ActionRequest::Uninstall { env, package } => {
                required(env, ValidationError::MissingEnvironmentName)?;
                required(package, ValidationError::MissingPackage)
            }
            ActionRequest::BulkInstall { env, manifest } => {
                required(env, ValidationError::MissingEnvironmentName)?;
                if manifest.is_missing() {
                    Err(ValidationError::MissingManifest)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Text for the loading notice shown while the action runs.
    pub fn progress_message(&self) -> String {
        match self {
            ActionRequest::Refresh => "Refreshing environments...".to_string(),
            ActionRequest::Create { name, .. } => format!("Creating '{name}'..."),
            ActionRequest::Import { manifest, .. } => {
                format!("Importing from '{}'...", manifest.file_name)
            }
            ActionRequest::Clone { source, new_name } => {
                format!("Cloning '{source}' into '{new_name}'...")
            }
            ActionRequest::Delete { env } => format!("Deleting '{env}'..."),
            ActionRequest::Export { env } => format!("Exporting '{env}'..."),
            ActionRequest::CheckSize { env } => format!("Measuring '{env}'..."),
            ActionRequest::OpenPackages { env } => format!("Loading packages of '{env}'..."),
            ActionRequest::Install { env, spec } => format!("Installing '{spec}' into '{env}'..."),
            ActionRequest::Uninstall { env, package } => {
                format!("Uninstalling '{package}' from '{env}'...")
            }
            ActionRequest::BulkInstall { env, manifest } => {
                format!("Installing packages from '{}' into '{env}'...", manifest.file_name)
            }
        }
    }
}
