//! Scrolling scope display of the captured signal

use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke, Vec2};

use crate::calibration::{ViewConfig, SIZE};

/// Display settings for the scope
#[derive(Clone)]
pub struct ScopeSettings {
    pub color: Color32,
    pub background: Color32,
    pub graticule: Color32,
    pub line_width: f32,
    pub show_graticule: bool,
}

impl ScopeSettings {
    pub fn for_theme(dark: bool) -> Self {
        if dark {
            Self::default()
        } else {
            Self {
                color: Color32::from_rgb(0, 110, 0),
                background: Color32::from_rgb(235, 245, 235),
                graticule: Color32::from_rgba_unmultiplied(80, 120, 80, 110),
                ..Self::default()
            }
        }
    }
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(100, 255, 100),
            background: Color32::from_rgb(10, 20, 10),
            graticule: Color32::from_rgba_unmultiplied(60, 80, 60, 140),
            line_width: 1.5,
            show_graticule: true,
        }
    }
}

/// Samples to skip back from the newest for a scroll of `start` pixels
pub fn sample_offset(start: f32, count: usize, width: f32) -> usize {
    if width <= 0.0 {
        return 0;
    }
    (start.max(0.0) * count as f32 / width) as usize
}

/// Scroll range in pixels that `max_samples` of history allows
pub fn max_scroll(max_samples: usize, count: usize, width: f32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    max_samples as f32 * width / count as f32
}

/// Map samples across the full width, full scale at the top and bottom edges
pub fn trace_points(samples: &[i16], rect: Rect) -> Vec<Pos2> {
    let span = samples.len().saturating_sub(1).max(1) as f32;
    let half = rect.height() / 2.0;
    let centre = rect.center().y;

    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            Pos2::new(
                rect.left() + i as f32 / span * rect.width(),
                centre - s as f32 / 32768.0 * half,
            )
        })
        .collect()
}

/// Scope widget
pub struct Scope {
    pub settings: ScopeSettings,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            settings: ScopeSettings::default(),
        }
    }

    /// Draw `samples` (oldest first). Dragging the response scrolls,
    /// double clicking returns to the newest samples.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        samples: &[i16],
        config: &ViewConfig,
        size: Vec2,
    ) -> egui::Response {
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = response.rect;

        painter.rect_filled(rect, 0.0, self.settings.background);

        if self.settings.show_graticule {
            self.draw_graticule(&painter, rect);
        }

        self.draw_samples(&painter, rect, samples, config.points);

        response
    }

    fn draw_graticule(&self, painter: &egui::Painter, rect: Rect) {
        let minor = Stroke::new(0.5, self.settings.graticule);
        let major = Stroke::new(1.0, self.settings.graticule);

        let mut x = 0.0;
        let mut i = 0;
        while x < rect.width() {
            let stroke = if i % 5 == 0 { major } else { minor };
            let px = rect.left() + x;
            painter.line_segment([Pos2::new(px, rect.top()), Pos2::new(px, rect.bottom())], stroke);
            x += SIZE;
            i += 1;
        }

        let centre = rect.center().y;
        let mut y = 0.0;
        let mut i = 0;
        while y < rect.height() / 2.0 {
            let stroke = if i % 5 == 0 { major } else { minor };
            for py in [centre - y, centre + y] {
                painter.line_segment([Pos2::new(rect.left(), py), Pos2::new(rect.right(), py)], stroke);
            }
            y += SIZE;
            i += 1;
        }
    }

    fn draw_samples(&self, painter: &egui::Painter, rect: Rect, samples: &[i16], points: bool) {
        if samples.is_empty() {
            return;
        }

        let points_on_screen = trace_points(samples, rect);

        if points {
            for pos in points_on_screen {
                painter.circle_filled(pos, self.settings.line_width, self.settings.color);
            }
        } else if points_on_screen.len() >= 2 {
            painter.add(Shape::line(
                points_on_screen,
                Stroke::new(self.settings.line_width, self.settings.color),
            ));
        }
    }
}
