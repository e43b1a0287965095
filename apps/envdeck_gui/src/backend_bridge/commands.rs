//! Backend commands queued from UI to backend worker.

use client_core::{ActionKind, ActionRequest};

pub enum BackendCommand {
    /// Run one action to completion and report its outcome.
    Execute(ActionRequest),
}

impl BackendCommand {
    pub fn name(&self) -> ActionKind {
        match self {
            BackendCommand::Execute(request) => request.kind(),
        }
    }
}
