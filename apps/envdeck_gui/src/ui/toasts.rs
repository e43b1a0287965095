use client_core::{NotificationCenter, NotificationId, NotificationKind};
use eframe::egui;

fn accent(kind: NotificationKind, visuals: &egui::Visuals) -> egui::Color32 {
    match kind {
        NotificationKind::Success => egui::Color32::from_rgb(0x2e, 0x9e, 0x5b),
        NotificationKind::Error => visuals.error_fg_color,
        NotificationKind::Loading => visuals.hyperlink_color,
    }
}

/// Draws the notification stack; returns the ones the user closed.
pub fn show(ctx: &egui::Context, notifications: &NotificationCenter) -> Vec<NotificationId> {
    let mut dismissed = Vec::new();
    if notifications.is_empty() {
        return dismissed;
    }

    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            ui.set_max_width(360.0);
            for notification in notifications.iter() {
                let color = accent(notification.kind, ui.visuals());
                egui::Frame::popup(ui.style())
                    .stroke(egui::Stroke::new(1.0, color))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            if notification.kind == NotificationKind::Loading {
                                ui.spinner();
                            }
                            ui.colored_label(color, &notification.message);
                            if notification.kind != NotificationKind::Loading
                                && ui.small_button("x").clicked()
                            {
                                dismissed.push(notification.id);
                            }
                        });
                    });
                ui.add_space(4.0);
            }
        });
    dismissed
}
