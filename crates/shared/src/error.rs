use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote capability being exercised; used to phrase generic failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListEnvironments,
    CreateEnvironment,
    CloneEnvironment,
    DeleteEnvironment,
    ExportEnvironment,
    ImportEnvironment,
    EnvironmentSize,
    ListPackages,
    InstallPackage,
    UninstallPackage,
    InstallFromFile,
}

impl Operation {
    pub fn describe(self) -> &'static str {
        match self {
            Operation::ListEnvironments => "fetch environments",
            Operation::CreateEnvironment => "create environment",
            Operation::CloneEnvironment => "clone environment",
            Operation::DeleteEnvironment => "delete environment",
            Operation::ExportEnvironment => "export environment",
            Operation::ImportEnvironment => "import environment",
            Operation::EnvironmentSize => "get size",
            Operation::ListPackages => "fetch packages",
            Operation::InstallPackage => "install package",
            Operation::UninstallPackage => "uninstall package",
            Operation::InstallFromFile => "install packages from file",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Structured body the API attaches to non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiError {
    /// Extracts a usable `detail` from a raw response body, if there is one.
    pub fn detail_from_body(body: &[u8]) -> Option<String> {
        let parsed: ApiError = serde_json::from_slice(body).ok()?;
        parsed
            .detail
            .map(|detail| detail.trim().to_string())
            .filter(|detail| !detail.is_empty())
    }
}

/// The single failure channel of the remote gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never reached the server or the reply never came back.
    #[error("Failed to {operation}")]
    Transport {
        operation: Operation,
        reason: String,
    },
    /// Non-success status with a structured reason.
    #[error("{detail}")]
    Application {
        operation: Operation,
        status: u16,
        detail: String,
    },
    /// Non-success status without a usable body.
    #[error("Failed to {operation}")]
    Rejected { operation: Operation, status: u16 },
    #[error("Failed to {operation}: invalid response from server")]
    InvalidResponse {
        operation: Operation,
        reason: String,
    },
}

impl RemoteError {
    pub fn operation(&self) -> Operation {
        match self {
            RemoteError::Transport { operation, .. }
            | RemoteError::Application { operation, .. }
            | RemoteError::Rejected { operation, .. }
            | RemoteError::InvalidResponse { operation, .. } => *operation,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Application { status, .. } | RemoteError::Rejected { status, .. } => {
                Some(*status)
            }
            RemoteError::Transport { .. } | RemoteError::InvalidResponse { .. } => None,
        }
    }

    /// Builds the error for a non-success reply, preferring the server's `detail`.
    pub fn from_response(operation: Operation, status: u16, body: &[u8]) -> Self {
        match ApiError::detail_from_body(body) {
            Some(detail) => RemoteError::Application {
                operation,
                status,
                detail,
            },
            None => RemoteError::Rejected { operation, status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_errors_surface_detail_verbatim() {
        let err = RemoteError::from_response(
            Operation::CreateEnvironment,
            400,
            br#"{"detail":"Environment 'dup' already exists. Please choose a different name."}"#,
        );
        assert_eq!(
            err.to_string(),
            "Environment 'dup' already exists. Please choose a different name."
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn missing_detail_falls_back_to_generic_message() {
        let err = RemoteError::from_response(Operation::DeleteEnvironment, 500, b"oops");
        assert_eq!(err.to_string(), "Failed to delete environment");

        let err = RemoteError::from_response(Operation::UninstallPackage, 500, br#"{"detail":"  "}"#);
        assert_eq!(err.to_string(), "Failed to uninstall package");
    }

    #[test]
    fn transport_errors_name_the_operation() {
        let err = RemoteError::Transport {
            operation: Operation::ExportEnvironment,
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to export environment");
        assert_eq!(err.operation(), Operation::ExportEnvironment);
        assert_eq!(err.status(), None);
    }
}
