//! tdr-scope - Time Domain Reflectometer scope
//!
//! Captures returned audio from the sound card input and shows it on a
//! scrolling scope with a distance scale in metres. Capture runs while the
//! window is in the foreground and stops when it is minimised.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use eframe::egui;

mod alert;
mod audio;
mod awake;
mod calibration;
mod lifecycle;
mod render;
mod settings;

use alert::Alerts;
use audio::{CaptureError, CaptureLoop, CpalBackend, SampleRing, RING_CAPACITY};
use awake::KeepScreen;
use calibration::{RangeSetting, ViewConfig};
use lifecycle::{Lifecycle, Transition};
use render::{max_scroll, sample_offset, Scope, XScale, YScale};
use settings::AppSettings;

const APP_NAME: &str = "TDR";

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting tdr-scope");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 560.0])
            .with_title(APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        "tdr-scope",
        options,
        Box::new(|cc| Ok(Box::new(TdrApp::new(cc)))),
    )
}

struct TdrApp {
    ring: SampleRing,
    capture: CaptureLoop,
    failures: Receiver<CaptureError>,
    lifecycle: Lifecycle,
    settings: AppSettings,
    view: ViewConfig,
    scope: Scope,
    devices: Vec<String>,
    alerts: Alerts,
    keep_screen: KeepScreen,
    status: String,
    show_settings: bool,
}

impl TdrApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let ring = SampleRing::new(RING_CAPACITY);
        let (failures_tx, failures) = mpsc::channel();
        let capture = CaptureLoop::new(
            Arc::new(CpalBackend::new()),
            ring.clone(),
            Arc::new(cc.egui_ctx.clone()),
            failures_tx,
        );
        let devices = capture.backend().input_devices();
        let status = if devices.is_empty() {
            "No input devices found".to_string()
        } else {
            format!("Found {} input device(s)", devices.len())
        };

        // Real settings are loaded when the window first comes to the foreground
        Self {
            ring,
            capture,
            failures,
            lifecycle: Lifecycle::new(),
            settings: AppSettings::default(),
            view: ViewConfig::default(),
            scope: Scope::new(),
            devices,
            alerts: Alerts::default(),
            keep_screen: KeepScreen::new(),
            status,
            show_settings: false,
        }
    }

    fn resume(&mut self, ctx: &egui::Context) {
        self.settings = AppSettings::load();
        self.view = self.settings.view_config();
        self.apply_window_settings(ctx);

        self.capture.source = self.settings.input_source();
        self.capture.start();
        self.status = format!("Capturing: {}", self.capture.source.name());
    }

    fn pause(&mut self) {
        self.settings.save();
        self.keep_screen.apply(false);
        self.capture.stop();
        self.status = "Paused".to_string();
    }

    fn apply_window_settings(&mut self, ctx: &egui::Context) {
        ctx.set_visuals(if self.settings.dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });
        self.keep_screen.apply(self.settings.keep_screen);
        self.scope.settings = self.settings.scope_settings();
        self.view = self.view.with_dark(self.settings.dark);
    }

    fn set_range(&mut self, range: RangeSetting) {
        log::info!("Range {} ({})", range.label(), range.index());
        self.settings.range = range;
        self.view = self.view.with_range(range);
    }

    fn set_device(&mut self, device: Option<String>) {
        if device == self.settings.input_device {
            return;
        }
        self.settings.input_device = device;
        self.capture.source = self.settings.input_source();

        if self.capture.is_running() {
            self.capture.stop();
            self.ring.clear();
            self.capture.start();
        }
    }

    fn poll_failures(&mut self) {
        while let Ok(err) = self.failures.try_recv() {
            self.status = self.alerts.report(err);
        }
    }
}

impl eframe::App for TdrApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let foreground = !ctx.input(|i| i.viewport().minimized.unwrap_or(false));
        match self.lifecycle.observe(foreground) {
            Some(Transition::Resumed) => self.resume(ctx),
            Some(Transition::Paused) => self.pause(),
            None => {}
        }

        self.poll_failures();
        let enabled = !self.alerts.blocks_input();

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| ui.horizontal(|ui| {
                ui.heading(APP_NAME);
                ui.separator();

                // Range selector
                let mut range = self.settings.range;
                egui::ComboBox::from_id_salt("range")
                    .selected_text(range.label())
                    .show_ui(ui, |ui| {
                        for option in RangeSetting::all() {
                            ui.selectable_value(&mut range, option, option.label());
                        }
                    });
                if range != self.settings.range {
                    self.set_range(range);
                }

                ui.separator();

                // Device selector
                let mut device = self.settings.input_device.clone();
                egui::ComboBox::from_id_salt("device")
                    .selected_text(device.as_deref().unwrap_or("Default"))
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut device, None, "Default");
                        for name in &self.devices {
                            ui.selectable_value(&mut device, Some(name.clone()), name);
                        }
                    });
                self.set_device(device);

                ui.separator();

                // Capture button
                let button_text = if self.capture.is_running() {
                    "⏹ Stop"
                } else {
                    "▶ Capture"
                };
                if ui.button(button_text).clicked() {
                    self.capture.toggle();
                }

                ui.separator();
                ui.label(&self.status);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.toggle_value(&mut self.show_settings, "⚙ Settings");
                });
            }));
        });

        // Settings panel
        if self.show_settings {
            egui::SidePanel::right("settings_panel")
                .min_width(180.0)
                .show(ctx, |ui| {
                    ui.heading("Settings");
                    ui.separator();

                    ui.add_enabled_ui(enabled, |ui| {
                        let mut changed =
                            ui.checkbox(&mut self.settings.dark, "Dark theme").changed();
                        changed |= ui
                            .checkbox(&mut self.settings.show_grid, "Show grid")
                            .changed();
                        changed |= ui
                            .checkbox(&mut self.settings.keep_screen, "Keep screen on")
                            .changed();
                        if changed {
                            self.apply_window_settings(ctx);
                        }
                    });
                });
        }

        // Status bar
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.small(format!("Capture: {}", self.capture.state().name()));
                ui.separator();
                ui.small(format!("{} Hz", self.capture.sample_rate()));
                ui.separator();
                ui.small(format!("Frames: {}", self.capture.frames_captured()));
                ui.separator();
                ui.small(format!(
                    "Total: {} | Index: {}",
                    self.ring.samples_written(),
                    self.ring.write_index()
                ));
                ui.separator();
                let mode = if self.view.points { "Points" } else { "Trace" };
                ui.small(format!(
                    "Range: {} | Step: {:.0} | Display: {}",
                    self.view.range.label(),
                    self.view.step,
                    mode
                ));
            });
        });

        // Scope with its scales
        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let spacing = ui.spacing().item_spacing;

            let yscale_width = YScale::desired_width(available.y);
            let scope_width = (available.x - yscale_width - spacing.x).max(1.0);
            let xscale_height = XScale::desired_height(scope_width);
            let scope_height = (available.y - xscale_height - spacing.y).max(1.0);

            ui.add_enabled_ui(enabled, |ui| ui.horizontal_top(|ui| {
                YScale::show(ui, scope_height);

                ui.vertical(|ui| {
                    let count = self.view.count;
                    let offset = sample_offset(self.view.scope_start, count, scope_width);
                    let samples = self.ring.latest(count, offset);

                    let response = self.scope.show(
                        ui,
                        &samples,
                        &self.view,
                        egui::vec2(scope_width, scope_height),
                    );
                    if response.dragged() {
                        let limit = max_scroll(self.ring.max_offset(count), count, scope_width);
                        self.view = self.view.scrolled(response.drag_delta().x, limit);
                    }
                    if response.double_clicked() {
                        self.view = self.view.scrolled(-self.view.scope_start, 0.0);
                    }

                    XScale::show(ui, &self.view, scope_width);
                });
            }));
        });

        self.alerts.show(ctx, APP_NAME);
    }
}

impl Drop for TdrApp {
    fn drop(&mut self) {
        // Settings were already saved if the window was paused
        if self.lifecycle.is_foreground() {
            self.settings.save();
        }
        self.capture.stop();
    }
}
