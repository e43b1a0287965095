//! The console's single owned state: registry, gate, notices and view settings.
//!
//! Front-ends hold one `ConsoleStore`, feed it requests through [`ConsoleStore::submit`]
//! and [`ConsoleStore::confirm`], run whatever comes back through an
//! [`ActionCoordinator`](crate::ActionCoordinator), then hand the outcome to
//! [`ConsoleStore::apply`]. Nothing else mutates the registry.

use std::{collections::HashMap, time::Instant};

use serde::{Deserialize, Serialize};
use shared::domain::{Environment, Package};
use thiserror::Error;
use tracing::debug;

use crate::{
    actions::{ActionKey, ActionKind, ActionRequest, ValidationError},
    confirmation::{ConfirmationGate, ConfirmationPrompt},
    coordinator::{ActionOutcome, Effect},
    notifications::{NotificationCenter, NotificationId},
    registry::{filtered_view, EnvironmentRegistry, PackageView, SortKey, SortState},
};

pub const MANIFEST_MIME: &str = "text/yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    List,
    Table,
}

/// Exported environment descriptor ready to be written client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedManifest {
    pub file_name: String,
    pub mime: &'static str,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Run this now; it is already marked in flight.
    Dispatch(ActionRequest),
    /// Parked in the confirmation gate until `confirm` or `cancel`.
    AwaitingConfirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{} is already running for '{}'", .0.kind, .0.target)]
    InFlight(ActionKey),
}

#[derive(Debug, Default)]
pub struct ConsoleStore {
    registry: EnvironmentRegistry,
    gate: ConfirmationGate,
    notifications: NotificationCenter,
    in_flight: HashMap<ActionKey, Option<NotificationId>>,
    pub sort: SortState,
    pub display_mode: DisplayMode,
    pub package_query: String,
}

impl ConsoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(sort: SortState, display_mode: DisplayMode) -> Self {
        Self {
            sort,
            display_mode,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    pub fn sorted_environments(&self) -> Vec<&Environment> {
        self.registry.sorted(self.sort)
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort.toggle(key);
    }

    pub fn package_view(&self) -> Option<&PackageView> {
        self.registry.package_view()
    }

    /// Packages of the open view matching the current filter query.
    pub fn visible_packages(&self) -> Vec<&Package> {
        match self.registry.package_view() {
            Some(view) => filtered_view(&view.packages, &self.package_query),
            None => Vec::new(),
        }
    }

    pub fn is_in_flight(&self, kind: ActionKind, target: &str) -> bool {
        self.in_flight
            .keys()
            .any(|key| key.kind == kind && key.target == target)
    }

    pub fn has_work_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn prompt(&self) -> Option<ConfirmationPrompt> {
        self.gate.prompt()
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        !self.gate.is_idle()
    }

    /// Entry point for every user-triggered action.
    pub fn submit(
        &mut self,
        request: ActionRequest,
        now: Instant,
    ) -> Result<Submission, SubmitError> {
        request.validate()?;
        let key = request.key();
        if self.in_flight.contains_key(&key) {
            return Err(SubmitError::InFlight(key));
        }

        if request.requires_confirmation() {
            if let Some(replaced) = self.gate.hold(request) {
                debug!(action = %replaced.kind(), target = %replaced.target(), "superseded pending request");
            }
            return Ok(Submission::AwaitingConfirmation);
        }

        self.begin(&request, now);
        Ok(Submission::Dispatch(request))
    }

    /// Releases the pending request for dispatch. `None` when nothing was pending
    /// or the same action started in the meantime.
    pub fn confirm(&mut self, now: Instant) -> Option<ActionRequest> {
        let request = self.gate.confirm()?;
        let key = request.key();
        if self.in_flight.contains_key(&key) {
            self.notifications
                .error(SubmitError::InFlight(key).to_string(), now);
            return None;
        }
        self.begin(&request, now);
        Some(request)
    }

    pub fn cancel(&mut self) {
        self.gate.cancel();
    }

    /// Opens the package view for `env` and returns the listing request to run.
    pub fn open_packages(
        &mut self,
        env: &str,
        now: Instant,
    ) -> Result<Submission, SubmitError> {
        self.submit(
            ActionRequest::OpenPackages {
                env: env.to_string(),
            },
            now,
        )
    }

    /// Later package refreshes for the closed environment are dropped on arrival.
    pub fn close_packages(&mut self) {
        self.registry.close_packages();
        self.package_query.clear();
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifications.expire(now);
    }

    fn begin(&mut self, request: &ActionRequest, now: Instant) {
        if let ActionRequest::OpenPackages { env } = request {
            self.registry.open_packages(env);
        }
        let loading = request
            .kind()
            .shows_progress()
            .then(|| self.notifications.loading(request.progress_message(), now));
        self.in_flight.insert(request.key(), loading);
    }

    /// Folds a finished action into the state. Returns the manifest to save for exports.
    pub fn apply(&mut self, outcome: ActionOutcome, now: Instant) -> Option<ExportedManifest> {
        if let Some(Some(loading)) = self.in_flight.remove(outcome.key()) {
            self.notifications.dismiss(loading);
        }

        match outcome {
            ActionOutcome::Failed { key, message } => {
                if key.kind == ActionKind::OpenPackages {
                    self.registry.settle_packages(&key.target);
                }
                self.notifications.error(message, now);
                None
            }
            ActionOutcome::Succeeded { notice, effect, .. } => {
                if let Some(notice) = notice {
                    self.notifications.success(notice, now);
                }
                self.apply_effect(effect, now)
            }
        }
    }

    fn apply_effect(&mut self, effect: Effect, now: Instant) -> Option<ExportedManifest> {
        match effect {
            Effect::None => None,
            Effect::Environments(Ok(environments)) => {
                self.registry.replace_environments(environments);
                None
            }
            Effect::Packages {
                env,
                packages: Ok(packages),
            } => {
                if !self.registry.replace_packages(&env, packages) {
                    debug!(env = %env, "package view closed; listing dropped");
                }
                None
            }
            Effect::Environments(Err(err)) => {
                self.notifications.error(err.to_string(), now);
                None
            }
            Effect::Packages {
                env,
                packages: Err(err),
            } => {
                self.registry.settle_packages(&env);
                self.notifications.error(err.to_string(), now);
                None
            }
            Effect::SaveManifest { env, manifest } => Some(ExportedManifest {
                file_name: format!("{env}.yml"),
                mime: MANIFEST_MIME,
                contents: manifest,
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
