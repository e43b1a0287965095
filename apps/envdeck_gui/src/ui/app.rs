use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use client_core::{
    ActionKind, ActionOutcome, ActionRequest, CloneForm, ConsoleStore, CreateForm, DisplayMode,
    ExportedManifest, Settings, SortState, Submission,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::ManifestFile;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{err_label, UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::ui::{
    dialogs::{self, CloneDialogAction, CreateDialogAction},
    panels::{self, PackageAction, RowAction},
    toasts,
};

pub const SETTINGS_STORAGE_KEY: &str = "envdeck_gui.settings";

/// View preferences kept across launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConsoleSettings {
    pub sort: SortState,
    pub display_mode: DisplayMode,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

pub struct ConsoleApp {
    store: ConsoleStore,
    settings: Settings,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    status: String,
    status_banner: Option<StatusBanner>,
    create_form: Option<CreateForm>,
    clone_form: Option<CloneForm>,
    install_spec: String,
}

/// Reads a manifest picked from disk, keyed by its file name.
pub(crate) fn read_manifest(path: &Path) -> Result<ManifestFile, String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("'{}' is not a file", path.display()))?;
    let contents =
        fs::read(path).map_err(|err| format!("failed to read '{}': {err}", path.display()))?;
    Ok(ManifestFile::new(file_name, contents))
}

const BUSY_POLL: Duration = Duration::from_millis(50);
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Next repaint: fast while requests are out, otherwise at the next notice expiry or idle poll.
pub(crate) fn repaint_delay(store: &ConsoleStore, now: Instant) -> Duration {
    if store.has_work_in_flight() {
        return BUSY_POLL;
    }
    store
        .notifications()
        .next_expiry(now)
        .map_or(IDLE_POLL, |expiry| expiry.min(IDLE_POLL))
}

pub(crate) fn pick_manifest() -> Option<Result<ManifestFile, String>> {
    rfd::FileDialog::new()
        .add_filter("Environment files", &["yml", "yaml", "txt"])
        .pick_file()
        .map(|path| read_manifest(&path))
}

impl ConsoleApp {
    pub fn new(
        settings: Settings,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        persisted: Option<PersistedConsoleSettings>,
    ) -> Self {
        let persisted = persisted.unwrap_or_default();
        let mut app = Self {
            store: ConsoleStore::with_view(persisted.sort, persisted.display_mode),
            settings,
            cmd_tx,
            ui_rx,
            status: "Starting...".to_string(),
            status_banner: None,
            create_form: None,
            clone_form: None,
            install_spec: String::new(),
        };
        app.submit(ActionRequest::Refresh);
        app
    }

    fn submit(&mut self, request: ActionRequest) {
        let now = Instant::now();
        match self.store.submit(request, now) {
            Ok(Submission::Dispatch(request)) => self.dispatch(request),
            Ok(Submission::AwaitingConfirmation) => {}
            Err(err) => {
                self.store.notifications_mut().error(err.to_string(), now);
            }
        }
    }

    fn dispatch(&mut self, request: ActionRequest) {
        let key = request.key();
        if !dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Execute(request),
            &mut self.status,
        ) {
            let message = self.status.clone();
            self.store.apply(
                ActionOutcome::Failed {
                    key,
                    message: message.clone(),
                },
                Instant::now(),
            );
            self.raise(UiError::from_message(UiErrorContext::Dispatch, message));
        }
    }

    fn raise(&mut self, err: UiError) {
        self.status = format!("{} error: {}", err_label(err.category()), err.message());
        if err.is_sticky() {
            self.status_banner = Some(StatusBanner {
                message: err.message().to_string(),
            });
        } else {
            self.store
                .notifications_mut()
                .error(err.message().to_string(), Instant::now());
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Outcome(outcome) => {
                    if let Some(exported) = self.store.apply(outcome, Instant::now()) {
                        self.save_manifest(exported);
                    }
                }
                UiEvent::Error(err) => self.raise(err),
            }
        }
    }

    fn save_manifest(&mut self, exported: ExportedManifest) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&exported.file_name)
            .add_filter("YAML", &["yml", "yaml"])
            .save_file()
        else {
            self.status = format!("Export of {} discarded", exported.file_name);
            return;
        };

        match fs::write(&path, exported.contents.as_bytes()) {
            Ok(()) => {
                self.status = format!("Saved {} ({})", path.display(), exported.mime);
            }
            Err(err) => self.raise(UiError::from_message(
                UiErrorContext::SaveManifest,
                format!("failed to save '{}': {err}", path.display()),
            )),
        }
    }

    fn handle_row_action(&mut self, action: RowAction) {
        match action {
            RowAction::Packages(env) => {
                self.install_spec.clear();
                if self.store.package_view().map(|view| view.env.as_str()) != Some(env.as_str()) {
                    self.store.close_packages();
                }
                self.submit(ActionRequest::OpenPackages { env });
            }
            RowAction::Export(env) => self.submit(ActionRequest::Export { env }),
            RowAction::Clone(env) => self.clone_form = Some(CloneForm::open(env)),
            RowAction::Size(env) => self.submit(ActionRequest::CheckSize { env }),
            RowAction::Delete(env) => self.submit(ActionRequest::Delete { env }),
            RowAction::SortBy(key) => self.store.toggle_sort(key),
        }
    }

    fn handle_package_action(&mut self, action: PackageAction) {
        match action {
            PackageAction::Install { env, spec } => {
                self.submit(ActionRequest::Install { env, spec });
            }
            PackageAction::InstallFile { env } => match pick_manifest() {
                Some(Ok(manifest)) => self.submit(ActionRequest::BulkInstall { env, manifest }),
                Some(Err(message)) => {
                    self.raise(UiError::from_message(UiErrorContext::LoadManifest, message))
                }
                None => {}
            },
            PackageAction::Uninstall { env, package } => {
                self.submit(ActionRequest::Uninstall { env, package });
            }
            PackageAction::Close => self.store.close_packages(),
        }
    }

    fn confirm_pending(&mut self) {
        let Some(request) = self.store.confirm(Instant::now()) else {
            return;
        };
        // the typed spec survives a cancelled prompt
        if matches!(request, ActionRequest::Install { .. }) {
            self.install_spec.clear();
        }
        self.dispatch(request);
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Environments");
                ui.separator();
                if ui.button("New Environment").clicked() {
                    self.create_form =
                        Some(CreateForm::new(self.settings.default_runtime_version.clone()));
                }
                let refreshing = self.store.is_in_flight(ActionKind::Refresh, "");
                if ui
                    .add_enabled(!refreshing, egui::Button::new("Refresh"))
                    .clicked()
                {
                    self.submit(ActionRequest::Refresh);
                }
                ui.separator();
                ui.selectable_value(&mut self.store.display_mode, DisplayMode::List, "Cards");
                ui.selectable_value(&mut self.store.display_mode, DisplayMode::Table, "Table");
                if self.store.display_mode == DisplayMode::List {
                    panels::sort_controls(ui, &mut self.store.sort);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(&self.status);
                });
            });
            ui.add_space(4.0);
        });

        let mut dismiss = false;
        if let Some(banner) = &self.status_banner {
            egui::TopBottomPanel::top("status_banner").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, &banner.message);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        dismiss = ui.small_button("Dismiss").clicked();
                    });
                });
            });
        }
        if dismiss {
            self.status_banner = None;
        }
    }

    fn show_environments(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            let store = &self.store;
            if !store.registry().is_loaded() {
                ui.horizontal(|ui| {
                    if store.is_in_flight(ActionKind::Refresh, "") {
                        ui.spinner();
                        ui.label("Loading environments...");
                    } else {
                        ui.label("Environments could not be loaded. Use Refresh to try again.");
                    }
                });
                return;
            }
            if store.registry().environments().is_empty() {
                ui.label("No environments found.");
                return;
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| match store.display_mode {
                    DisplayMode::List => panels::environment_cards(ui, store, &mut actions),
                    DisplayMode::Table => panels::environment_table(ui, store, &mut actions),
                });
        });

        for action in actions {
            self.handle_row_action(action);
        }
    }

    fn show_packages_window(&mut self, ctx: &egui::Context) {
        if let Some(action) = panels::packages_window(ctx, &mut self.store, &mut self.install_spec)
        {
            self.handle_package_action(action);
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        match dialogs::confirmation_window(ctx, &self.store) {
            Some(true) => self.confirm_pending(),
            Some(false) => self.store.cancel(),
            None => {}
        }

        if let Some(form) = &mut self.create_form {
            match dialogs::create_window(ctx, form, &self.settings.runtime_versions) {
                Some(CreateDialogAction::Submit(request)) => {
                    self.create_form = None;
                    self.submit(request);
                }
                Some(CreateDialogAction::PickFile) => match pick_manifest() {
                    Some(Ok(manifest)) => form.manifest = Some(manifest),
                    Some(Err(message)) => {
                        self.raise(UiError::from_message(UiErrorContext::LoadManifest, message))
                    }
                    None => {}
                },
                Some(CreateDialogAction::Close) => self.create_form = None,
                None => {}
            }
        }

        if let Some(form) = &mut self.clone_form {
            match dialogs::clone_window(ctx, form) {
                Some(CloneDialogAction::Submit(request)) => {
                    self.clone_form = None;
                    self.submit(request);
                }
                Some(CloneDialogAction::Close) => self.clone_form = None,
                None => {}
            }
        }
    }

    fn show_toasts(&mut self, ctx: &egui::Context) {
        for id in toasts::show(ctx, self.store.notifications()) {
            self.store.dismiss(id);
        }
    }
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.store.tick(Instant::now());

        self.show_header(ctx);
        self.show_environments(ctx);
        self.show_packages_window(ctx);
        self.show_dialogs(ctx);
        self.show_toasts(ctx);

        ctx.request_repaint_after(repaint_delay(&self.store, Instant::now()));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedConsoleSettings {
            sort: self.store.sort,
            display_mode: self.store.display_mode,
        };
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
