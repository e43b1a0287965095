use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Environment, ManifestFile, Package},
    error::{Operation, RemoteError},
    protocol::{
        fields, CloneEnvironmentRequest, CreateEnvironmentRequest, ExportResponse,
        InstallPackageRequest, MessageResponse, SizeResponse,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub mod actions;
pub mod config;
pub mod confirmation;
pub mod coordinator;
pub mod forms;
pub mod notifications;
pub mod registry;
pub mod store;

pub use actions::{ActionKey, ActionKind, ActionRequest, ValidationError};
pub use config::{load_settings, ConfigError, Settings};
pub use confirmation::{ConfirmationGate, ConfirmationPrompt};
pub use coordinator::{ActionCoordinator, ActionOutcome, Effect};
pub use forms::{CloneForm, CreateForm, CreateTab};
pub use notifications::{Notification, NotificationCenter, NotificationId, NotificationKind};
pub use registry::{EnvironmentRegistry, SortKey, SortOrder, SortState};
pub use store::{ConsoleStore, DisplayMode, ExportedManifest, SubmitError, Submission};

const API_PREFIX: [&str; 2] = ["api", "envs"];

/// The remote management API, one method per capability.
///
/// Every call is a single attempt. Transport failures and non-success replies
/// both come back as [`RemoteError`].
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn list_environments(&self) -> Result<Vec<Environment>, RemoteError>;
    async fn create_environment(&self, name: &str, runtime_version: &str)
        -> Result<(), RemoteError>;
    async fn clone_environment(&self, source: &str, new_name: &str) -> Result<(), RemoteError>;
    async fn delete_environment(&self, name: &str) -> Result<(), RemoteError>;
    async fn export_environment(&self, name: &str) -> Result<String, RemoteError>;
    async fn import_environment(
        &self,
        manifest: &ManifestFile,
        name: Option<&str>,
        runtime_version: Option<&str>,
    ) -> Result<(), RemoteError>;
    async fn environment_size(&self, name: &str) -> Result<String, RemoteError>;
    async fn list_packages(&self, env: &str) -> Result<Vec<Package>, RemoteError>;
    async fn install_package(&self, env: &str, spec: &str) -> Result<(), RemoteError>;
    async fn uninstall_package(&self, env: &str, name: &str) -> Result<(), RemoteError>;
    async fn install_from_file(
        &self,
        env: &str,
        manifest: &ManifestFile,
    ) -> Result<String, RemoteError>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// HTTP implementation of [`ManagementApi`].
pub struct ManagerClient {
    http: Client,
    base_url: Url,
}

impl ManagerClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_connect_timeout(base_url, None)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        Self::with_connect_timeout(
            &settings.api_base_url,
            settings.connect_timeout_secs.map(Duration::from_secs),
        )
    }

    fn with_connect_timeout(
        base_url: &str,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.trim()).map_err(|err| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }

        let mut builder = Client::builder().user_agent(concat!("envdeck/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/envs/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    async fn send(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(|err| {
            warn!(%operation, "management api unreachable: {err}");
            RemoteError::Transport {
                operation,
                reason: err.to_string(),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = RemoteError::from_response(operation, status.as_u16(), &body);
        warn!(%operation, status = status.as_u16(), "management api rejected request: {err}");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|err| {
            warn!(%operation, "undecodable management api response: {err}");
            RemoteError::InvalidResponse {
                operation,
                reason: err.to_string(),
            }
        })
    }
}

fn manifest_part(manifest: &ManifestFile) -> Part {
    Part::bytes(manifest.contents.clone()).file_name(manifest.file_name.clone())
}

#[async_trait]
impl ManagementApi for ManagerClient {
    async fn list_environments(&self) -> Result<Vec<Environment>, RemoteError> {
        debug!("listing environments");
        self.send_json(
            Operation::ListEnvironments,
            self.http.get(self.endpoint(&[])),
        )
        .await
    }

    async fn create_environment(
        &self,
        name: &str,
        runtime_version: &str,
    ) -> Result<(), RemoteError> {
        debug!(env = name, runtime_version, "creating environment");
        self.send(
            Operation::CreateEnvironment,
            self.http
                .post(self.endpoint(&[]))
                .json(&CreateEnvironmentRequest {
                    name: name.to_string(),
                    runtime_version: runtime_version.to_string(),
                }),
        )
        .await?;
        Ok(())
    }

    async fn clone_environment(&self, source: &str, new_name: &str) -> Result<(), RemoteError> {
        debug!(source, new_name, "cloning environment");
        self.send(
            Operation::CloneEnvironment,
            self.http
                .post(self.endpoint(&[source, "clone"]))
                .json(&CloneEnvironmentRequest {
                    new_name: new_name.to_string(),
                }),
        )
        .await?;
        Ok(())
    }

    async fn delete_environment(&self, name: &str) -> Result<(), RemoteError> {
        debug!(env = name, "deleting environment");
        self.send(
            Operation::DeleteEnvironment,
            self.http.delete(self.endpoint(&[name])),
        )
        .await?;
        Ok(())
    }

    async fn export_environment(&self, name: &str) -> Result<String, RemoteError> {
        debug!(env = name, "exporting environment");
        let response: ExportResponse = self
            .send_json(
                Operation::ExportEnvironment,
                self.http.get(self.endpoint(&[name, "export"])),
            )
            .await?;
        Ok(response.yaml)
    }

    async fn import_environment(
        &self,
        manifest: &ManifestFile,
        name: Option<&str>,
        runtime_version: Option<&str>,
    ) -> Result<(), RemoteError> {
        debug!(file = %manifest.file_name, env = ?name, "importing environment");
        let mut form = Form::new().part(fields::FILE, manifest_part(manifest));
        if let Some(name) = name {
            form = form.text(fields::NAME, name.to_string());
        }
        if let Some(runtime_version) = runtime_version {
            form = form.text(fields::RUNTIME_VERSION, runtime_version.to_string());
        }

        self.send(
            Operation::ImportEnvironment,
            self.http.post(self.endpoint(&["import"])).multipart(form),
        )
        .await?;
        Ok(())
    }

    async fn environment_size(&self, name: &str) -> Result<String, RemoteError> {
        debug!(env = name, "measuring environment");
        let response: SizeResponse = self
            .send_json(
                Operation::EnvironmentSize,
                self.http.get(self.endpoint(&[name, "size"])),
            )
            .await?;
        Ok(response.size)
    }

    async fn list_packages(&self, env: &str) -> Result<Vec<Package>, RemoteError> {
        debug!(env, "listing packages");
        self.send_json(
            Operation::ListPackages,
            self.http.get(self.endpoint(&[env, "packages"])),
        )
        .await
    }

    async fn install_package(&self, env: &str, spec: &str) -> Result<(), RemoteError> {
        debug!(env, spec, "installing package");
        self.send(
            Operation::InstallPackage,
            self.http
                .post(self.endpoint(&[env, "packages"]))
                .json(&InstallPackageRequest {
                    package: spec.to_string(),
                }),
        )
        .await?;
        Ok(())
    }

    async fn uninstall_package(&self, env: &str, name: &str) -> Result<(), RemoteError> {
        debug!(env, package = name, "uninstalling package");
        self.send(
            Operation::UninstallPackage,
            self.http.delete(self.endpoint(&[env, "packages", name])),
        )
        .await?;
        Ok(())
    }

    async fn install_from_file(
        &self,
        env: &str,
        manifest: &ManifestFile,
    ) -> Result<String, RemoteError> {
        debug!(env, file = %manifest.file_name, "installing packages from manifest");
        let form = Form::new().part(fields::FILE, manifest_part(manifest));
        let response: MessageResponse = self
            .send_json(
                Operation::InstallFromFile,
                self.http
                    .post(self.endpoint(&[env, "packages", "file"]))
                    .multipart(form),
            )
            .await?;
        Ok(response.message)
    }
}

#[cfg(test)]
#[path = "tests/fake_api.rs"]
pub(crate) mod fake_api;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
