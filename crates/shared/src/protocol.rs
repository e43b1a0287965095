//! Request and response bodies of the environment management API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnvironmentRequest {
    pub name: String,
    pub runtime_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneEnvironmentRequest {
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallPackageRequest {
    pub package: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub yaml: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeResponse {
    pub size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Multipart field names used by the upload endpoints.
pub mod fields {
    pub const FILE: &str = "file";
    pub const NAME: &str = "name";
    pub const RUNTIME_VERSION: &str = "runtime_version";
}
