//! Modal windows: confirmation, create/import, clone.

use client_core::{ActionRequest, CloneForm, ConsoleStore, CreateForm, CreateTab};
use eframe::egui;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateDialogAction {
    Submit(ActionRequest),
    PickFile,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneDialogAction {
    Submit(ActionRequest),
    Close,
}

fn modal(title: impl Into<egui::WidgetText>) -> egui::Window<'static> {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
}

/// `Some(true)` on confirm, `Some(false)` on cancel.
pub fn confirmation_window(ctx: &egui::Context, store: &ConsoleStore) -> Option<bool> {
    let prompt = store.prompt()?;
    let mut answer = None;
    modal(prompt.title.as_str())
        .id(egui::Id::new("confirmation_window"))
        .show(ctx, |ui| {
            ui.label(&prompt.message);
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button(prompt.confirm_label).clicked() {
                    answer = Some(true);
                }
                if ui.button("Cancel").clicked() {
                    answer = Some(false);
                }
            });
        });
    if answer.is_none() && ctx.input(|input| input.key_pressed(egui::Key::Escape)) {
        answer = Some(false);
    }
    answer
}

pub fn create_window(
    ctx: &egui::Context,
    form: &mut CreateForm,
    runtime_versions: &[String],
) -> Option<CreateDialogAction> {
    let mut action = None;
    modal("New environment")
        .id(egui::Id::new("create_window"))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut form.tab, CreateTab::Create, "Create");
                ui.selectable_value(&mut form.tab, CreateTab::Import, "Import from file");
            });
            ui.separator();

            egui::Grid::new("create_form").num_columns(2).show(ui, |ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut form.name);
                ui.end_row();

                if form.tab == CreateTab::Import {
                    ui.label("Manifest");
                    ui.horizontal(|ui| {
                        match &form.manifest {
                            Some(manifest) => ui.monospace(&manifest.file_name),
                            None => ui.weak("no file selected"),
                        };
                        if ui.button("Choose...").clicked() {
                            action = Some(CreateDialogAction::PickFile);
                        }
                    });
                    ui.end_row();
                }

                if form.offers_runtime_version() {
                    ui.label("Python version");
                    egui::ComboBox::from_id_salt("runtime_version")
                        .selected_text(form.runtime_version.as_str())
                        .show_ui(ui, |ui| {
                            for version in runtime_versions {
                                ui.selectable_value(
                                    &mut form.runtime_version,
                                    version.clone(),
                                    version.as_str(),
                                );
                            }
                        });
                    ui.end_row();
                }
            });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let request = form.to_request();
                if ui
                    .add_enabled(request.is_some(), egui::Button::new("Submit"))
                    .clicked()
                {
                    if let Some(request) = request {
                        action = Some(CreateDialogAction::Submit(request));
                    }
                }
                if ui.button("Cancel").clicked() {
                    action = Some(CreateDialogAction::Close);
                }
            });
        });
    action
}

pub fn clone_window(ctx: &egui::Context, form: &mut CloneForm) -> Option<CloneDialogAction> {
    let mut action = None;
    modal(format!("Clone '{}'", form.source))
        .id(egui::Id::new("clone_window"))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("New name");
                ui.text_edit_singleline(&mut form.new_name);
            });
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let request = form.to_request();
                if ui
                    .add_enabled(request.is_some(), egui::Button::new("Clone"))
                    .clicked()
                {
                    if let Some(request) = request {
                        action = Some(CloneDialogAction::Submit(request));
                    }
                }
                if ui.button("Cancel").clicked() {
                    action = Some(CloneDialogAction::Close);
                }
            });
        });
    action
}
