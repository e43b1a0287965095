//! Backend worker: a tokio runtime on its own thread executing queued actions.

use std::{sync::Arc, thread};

use client_core::{ActionCoordinator, ActionOutcome, ManagerClient, Settings};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

fn report_startup_failure(ui_tx: &Sender<UiEvent>, message: String) {
    tracing::error!("{message}");
    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
        UiErrorContext::BackendStartup,
        message,
    )));
}

/// Hands an outcome to the UI, waiting for queue space. The UI must see every
/// outcome or the action stays in flight.
pub async fn deliver_outcome(ui_tx: Sender<UiEvent>, outcome: ActionOutcome) {
    let kind = outcome.key().kind;
    let sent = tokio::task::spawn_blocking(move || ui_tx.send(UiEvent::Outcome(outcome))).await;
    match sent {
        Ok(Ok(())) => {}
        Ok(Err(_)) => tracing::debug!(action = %kind, "ui closed; outcome dropped"),
        Err(err) => tracing::error!(action = %kind, "outcome delivery task failed: {err}"),
    }
}

/// Each command runs as its own task, so a slow install never holds up a listing.
pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                report_startup_failure(
                    &ui_tx,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                );
                return;
            }
        };

        let client = match ManagerClient::from_settings(&settings) {
            Ok(client) => client,
            Err(err) => {
                report_startup_failure(&ui_tx, format!("backend worker startup failure: {err}"));
                return;
            }
        };
        let coordinator = ActionCoordinator::new(Arc::new(client));
        let _ = ui_tx.try_send(UiEvent::Info(format!(
            "Using management API at {}",
            settings.api_base_url
        )));

        runtime.block_on(async move {
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Execute(request) => {
                        let coordinator = coordinator.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let outcome = coordinator.execute(request).await;
                            deliver_outcome(ui_tx, outcome).await;
                        });
                    }
                }
            }
            tracing::debug!("ui command queue closed; backend worker exiting");
        });
    });
}
