//! Generic two-step guard in front of destructive and bulk actions.

use tracing::debug;

use crate::actions::ActionRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: &'static str,
}

impl ConfirmationPrompt {
    pub fn for_request(request: &ActionRequest) -> Self {
        match request {
            ActionRequest::Delete { env } => Self {
                title: "Delete Environment".to_string(),
                message: format!(
                    "Are you sure you want to delete '{env}'? This action cannot be undone."
                ),
                confirm_label: "Delete",
            },
            ActionRequest::Install { env, spec } => Self {
                title: "Install Package".to_string(),
                message: format!("Install '{spec}' into '{env}'?"),
                confirm_label: "Install",
            },
            ActionRequest::Uninstall { env, package } => Self {
                title: "Uninstall Package".to_string(),
                message: format!("Are you sure you want to uninstall '{package}' from '{env}'?"),
                confirm_label: "Uninstall",
            },
            ActionRequest::BulkInstall { env, manifest } => Self {
                title: "Install From File".to_string(),
                message: format!(
                    "Install every package listed in '{}' into '{env}'?",
                    manifest.file_name
                ),
                confirm_label: "Install",
            },
            other => Self {
                title: "Confirm".to_string(),
                message: format!("Run {} for '{}'?", other.kind(), other.target()),
                confirm_label: "Confirm",
            },
        }
    }
}

/// Idle, or holding exactly one request until it is confirmed or cancelled.
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    pending: Option<ActionRequest>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    pub fn pending(&self) -> Option<&ActionRequest> {
        self.pending.as_ref()
    }

    /// Holds `request`; a request already waiting is replaced and returned.
    pub fn hold(&mut self, request: ActionRequest) -> Option<ActionRequest> {
        debug!(action = %request.kind(), target = %request.target(), "awaiting confirmation");
        self.pending.replace(request)
    }

    pub fn prompt(&self) -> Option<ConfirmationPrompt> {
        self.pending.as_ref().map(ConfirmationPrompt::for_request)
    }

    /// Releases the held request for execution; the gate is idle again immediately.
    pub fn confirm(&mut self) -> Option<ActionRequest> {
        self.pending.take()
    }

    /// Drops the held request without side effects.
    pub fn cancel(&mut self) -> Option<ActionRequest> {
        let dropped = self.pending.take();
        if let Some(request) = &dropped {
            debug!(action = %request.kind(), target = %request.target(), "confirmation cancelled");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete(env: &str) -> ActionRequest {
        ActionRequest::Delete {
            env: env.to_string(),
        }
    }

    #[test]
    fn confirm_releases_the_request_and_returns_to_idle() {
        let mut gate = ConfirmationGate::new();
        assert!(gate.hold(delete("envA")).is_none());
        assert!(!gate.is_idle());

        assert_eq!(gate.confirm(), Some(delete("envA")));
        assert!(gate.is_idle());
        assert_eq!(gate.confirm(), None);
    }

    #[test]
    fn cancel_discards_the_request() {
        let mut gate = ConfirmationGate::new();
        gate.hold(delete("envA"));
        assert_eq!(gate.cancel(), Some(delete("envA")));
        assert!(gate.is_idle());
        assert_eq!(gate.confirm(), None);
    }

    #[test]
    fn last_request_wins() {
        let mut gate = ConfirmationGate::new();
        gate.hold(delete("envA"));
        let replaced = gate.hold(delete("envB"));

        assert_eq!(replaced, Some(delete("envA")));
        assert_eq!(gate.pending(), Some(&delete("envB")));
    }

    #[test]
    fn prompt_describes_kind_and_target() {
        let mut gate = ConfirmationGate::new();
        assert!(gate.prompt().is_none());

        gate.hold(ActionRequest::Uninstall {
            env: "envA".into(),
            package: "numpy".into(),
        });
        let prompt = gate.prompt().expect("prompt");
        assert_eq!(prompt.title, "Uninstall Package");
        assert!(prompt.message.contains("'numpy'"));
        assert!(prompt.message.contains("'envA'"));
    }
}
