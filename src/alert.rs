//! Modal capture failure alert
//!
//! While an alert is pending the rest of the window is disabled, so the user
//! has to acknowledge the failure before touching any control.

use eframe::egui;

use crate::audio::CaptureError;

#[derive(Default)]
pub struct Alerts {
    pending: Option<CaptureError>,
}

impl Alerts {
    /// Record a capture failure and return the status line text for it.
    /// Stream faults only reach the status line.
    pub fn report(&mut self, err: CaptureError) -> String {
        if err.is_alert() {
            self.pending = Some(err);
            "Stopped".to_string()
        } else {
            err.to_string()
        }
    }

    /// Whether controls behind the alert must ignore input
    pub fn blocks_input(&self) -> bool {
        self.pending.is_some()
    }

    pub fn dismiss(&mut self) {
        self.pending = None;
    }

    /// Draw the pending alert above a dimmed window
    pub fn show(&mut self, ctx: &egui::Context, title: &str) {
        let Some(err) = &self.pending else {
            return;
        };
        let message = err.to_string();

        let screen = ctx.screen_rect();
        egui::Area::new(egui::Id::new("alert_backdrop"))
            .order(egui::Order::Middle)
            .fixed_pos(screen.min)
            .interactable(true)
            .show(ctx, |ui| {
                // Swallows clicks meant for the panels underneath
                ui.allocate_response(screen.size(), egui::Sense::click_and_drag());
                ui.painter()
                    .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(120));
            });

        let mut dismissed = false;
        egui::Window::new(title)
            .order(egui::Order::Foreground)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed || ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.dismiss();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_failure_blocks_input() {
        let mut alerts = Alerts::default();
        let status = alerts.report(CaptureError::HandleInitializationFailed("busy".into()));

        assert_eq!(status, "Stopped");
        assert!(alerts.blocks_input());

        alerts.dismiss();
        assert!(!alerts.blocks_input());
    }

    #[test]
    fn test_buffer_failure_blocks_input() {
        let mut alerts = Alerts::default();
        alerts.report(CaptureError::BufferSizingUnsupported { sample_rate: 8000 });
        assert!(alerts.blocks_input());
    }

    #[test]
    fn test_stream_fault_goes_to_status() {
        let mut alerts = Alerts::default();
        let status = alerts.report(CaptureError::StreamFault("unplugged".into()));

        assert_eq!(status, "Stream fault: unplugged");
        assert!(!alerts.blocks_input());
    }

    #[test]
    fn test_show_without_alert_draws_nothing() {
        let ctx = egui::Context::default();
        let mut alerts = Alerts::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| alerts.show(ctx, "TDR"));
        assert!(output.shapes.is_empty());
    }

    #[test]
    fn test_enter_dismisses_alert() {
        let ctx = egui::Context::default();
        let mut alerts = Alerts::default();
        alerts.report(CaptureError::ThreadSpawn("no threads".into()));

        let _ = ctx.run(egui::RawInput::default(), |ctx| alerts.show(ctx, "TDR"));
        assert!(alerts.blocks_input());

        let mut input = egui::RawInput::default();
        input.events.push(egui::Event::Key {
            key: egui::Key::Enter,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        });
        let _ = ctx.run(input, |ctx| alerts.show(ctx, "TDR"));
        assert!(!alerts.blocks_input());
    }
}
