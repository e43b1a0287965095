//! Environment list/table and the package window.

use client_core::{ActionKind, ConsoleStore, SortKey, SortOrder, SortState};
use eframe::egui;
use shared::domain::Environment;

/// Per-environment control clicked this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Packages(String),
    Export(String),
    Clone(String),
    Size(String),
    Delete(String),
    SortBy(SortKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageAction {
    Install { env: String, spec: String },
    InstallFile { env: String },
    Uninstall { env: String, package: String },
    Close,
}

fn order_arrow(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Ascending => "⏶",
        SortOrder::Descending => "⏷",
    }
}

pub fn sort_controls(ui: &mut egui::Ui, sort: &mut SortState) {
    ui.label("Sort by");
    egui::ComboBox::from_id_salt("sort_key")
        .selected_text(sort.key.label())
        .show_ui(ui, |ui| {
            for key in SortKey::ALL {
                ui.selectable_value(&mut sort.key, key, key.label());
            }
        });
    if ui
        .button(order_arrow(sort.order))
        .on_hover_text("Toggle ascending/descending")
        .clicked()
    {
        sort.order = sort.order.flipped();
    }
}

fn action_buttons(
    ui: &mut egui::Ui,
    store: &ConsoleStore,
    env: &Environment,
    actions: &mut Vec<RowAction>,
) {
    let name = env.name.as_str();
    let busy = |kind| store.is_in_flight(kind, name);

    if ui
        .add_enabled(!busy(ActionKind::OpenPackages), egui::Button::new("Packages"))
        .clicked()
    {
        actions.push(RowAction::Packages(env.name.clone()));
    }
    if ui
        .add_enabled(!busy(ActionKind::Export), egui::Button::new("Export"))
        .clicked()
    {
        actions.push(RowAction::Export(env.name.clone()));
    }
    if ui.button("Clone").clicked() {
        actions.push(RowAction::Clone(env.name.clone()));
    }
    if ui
        .add_enabled(!busy(ActionKind::CheckSize), egui::Button::new("Size"))
        .clicked()
    {
        actions.push(RowAction::Size(env.name.clone()));
    }
    if env.is_deletable()
        && ui
            .add_enabled(!busy(ActionKind::Delete), egui::Button::new("Delete"))
            .clicked()
    {
        actions.push(RowAction::Delete(env.name.clone()));
    }
}

pub fn environment_cards(ui: &mut egui::Ui, store: &ConsoleStore, actions: &mut Vec<RowAction>) {
    for env in store.sorted_environments() {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.strong(&env.name);
                if env.is_base() {
                    ui.weak("(base)");
                }
            });
            egui::Grid::new(("env_card", env.path.as_str()))
                .num_columns(2)
                .show(ui, |ui| {
                    ui.weak("Path");
                    ui.monospace(&env.path);
                    ui.end_row();
                    ui.weak("Python");
                    ui.label(&env.runtime_version);
                    ui.end_row();
                    ui.weak("Size");
                    ui.label(&env.size_on_disk);
                    ui.end_row();
                    ui.weak("Last modified");
                    ui.label(&env.last_modified);
                    ui.end_row();
                });
            ui.horizontal(|ui| action_buttons(ui, store, env, actions));
        });
        ui.add_space(6.0);
    }
}

pub fn environment_table(ui: &mut egui::Ui, store: &ConsoleStore, actions: &mut Vec<RowAction>) {
    egui::Grid::new("env_table")
        .striped(true)
        .num_columns(SortKey::ALL.len() + 1)
        .spacing([16.0, 6.0])
        .show(ui, |ui| {
            for key in SortKey::ALL {
                let text = if store.sort.key == key {
                    format!("{} {}", key.label(), order_arrow(store.sort.order))
                } else {
                    key.label().to_string()
                };
                if ui
                    .add(egui::Button::new(egui::RichText::new(text).strong()).frame(false))
                    .clicked()
                {
                    actions.push(RowAction::SortBy(key));
                }
            }
            ui.strong("Actions");
            ui.end_row();

            for env in store.sorted_environments() {
                ui.label(&env.name);
                ui.monospace(&env.path);
                ui.label(&env.runtime_version);
                ui.label(&env.size_on_disk);
                ui.label(&env.last_modified);
                ui.horizontal(|ui| action_buttons(ui, store, env, actions));
                ui.end_row();
            }
        });
}

/// Shows the package view for the open environment, if any.
pub fn packages_window(
    ctx: &egui::Context,
    store: &mut ConsoleStore,
    install_spec: &mut String,
) -> Option<PackageAction> {
    let env = store.package_view()?.env.clone();
    let mut open = true;
    let mut action = None;

    egui::Window::new(format!("Packages: {env}"))
        .id(egui::Id::new("packages_window"))
        .open(&mut open)
        .default_size([520.0, 480.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(install_spec)
                        .hint_text("package or package==version")
                        .desired_width(240.0),
                );
                let submitted =
                    response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
                let installing = store.is_in_flight(ActionKind::Install, &env);
                let can_install = !install_spec.trim().is_empty() && !installing;
                let clicked = ui
                    .add_enabled(can_install, egui::Button::new("Install"))
                    .clicked();
                if clicked || (submitted && can_install) {
                    action = Some(PackageAction::Install {
                        env: env.clone(),
                        spec: install_spec.trim().to_string(),
                    });
                }
                if ui
                    .add_enabled(
                        !store.is_in_flight(ActionKind::BulkInstall, &env),
                        egui::Button::new("Install from file..."),
                    )
                    .clicked()
                {
                    action = Some(PackageAction::InstallFile { env: env.clone() });
                }
            });
            ui.horizontal(|ui| {
                ui.label("Filter");
                ui.text_edit_singleline(&mut store.package_query);
            });
            ui.separator();

            let loading = store.package_view().is_some_and(|view| view.loading);
            if loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading packages...");
                });
            }

            let packages = store.visible_packages();
            if packages.is_empty() && !loading {
                ui.weak("No packages to show.");
            }
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    egui::Grid::new("package_table")
                        .striped(true)
                        .num_columns(4)
                        .show(ui, |ui| {
                            ui.strong("Name");
                            ui.strong("Version");
                            ui.strong("Build");
                            ui.label("");
                            ui.end_row();
                            for package in packages {
                                let target = format!("{env}/{}", package.name);
                                ui.label(&package.name);
                                ui.label(&package.version);
                                ui.weak(&package.build_string);
                                if ui
                                    .add_enabled(
                                        !store.is_in_flight(ActionKind::Uninstall, &target),
                                        egui::Button::new("Uninstall"),
                                    )
                                    .clicked()
                                {
                                    action = Some(PackageAction::Uninstall {
                                        env: env.clone(),
                                        package: package.name.clone(),
                                    });
                                }
                                ui.end_row();
                            }
                        });
                });
        });

    if !open {
        return Some(PackageAction::Close);
    }
    action
}
