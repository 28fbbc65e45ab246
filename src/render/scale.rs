//! Distance (x) and amplitude (y) scales drawn beside the scope

use eframe::egui::{self, Align2, FontId, Pos2, Rect, Stroke, Vec2};

use crate::calibration::{ViewConfig, SCALE, SIZE};

/// XScale height is width / this
const HEIGHT_FRACTION: f32 = 32.0;

/// YScale width is height / this
const WIDTH_FRACTION: f32 = 24.0;

/// A tick mark: position along the scale and where it starts across it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub pos: f32,
    pub from: f32,
    pub to: f32,
}

fn steps(limit: f32, step: f32) -> impl Iterator<Item = f32> {
    (0..)
        .map(move |i| i as f32 * step)
        .take_while(move |&p| p < limit)
}

/// Tick marks hanging down from the top edge of the distance scale
pub fn x_ticks(width: f32, height: f32) -> Vec<Tick> {
    let minor = steps(width, SIZE).map(|pos| Tick {
        pos,
        from: 0.0,
        to: height / 4.0,
    });
    let major = steps(width, SIZE * 5.0).map(|pos| Tick {
        pos,
        from: 0.0,
        to: height / 3.0,
    });
    minor.chain(major).collect()
}

/// Distance labels in metres, one every ten ticks
pub fn x_labels(width: f32, start: f32, scale: f32) -> Vec<(f32, String)> {
    steps(width, SIZE * 10.0)
        .skip(1)
        .map(|x| (x, format!("{:.1}", (start + x * scale) / SCALE)))
        .collect()
}

/// Tick marks either side of the amplitude scale's centre line, with `pos`
/// measured from the centre
pub fn y_ticks(width: f32, height: f32) -> Vec<Tick> {
    let half = height / 2.0;
    let minor = steps(half, SIZE).map(|pos| (pos, width * 2.0 / 3.0));
    let major = steps(half, SIZE * 5.0).map(|pos| (pos, width / 3.0));

    minor
        .chain(major)
        .flat_map(|(pos, from)| {
            [
                Tick { pos, from, to: width },
                Tick { pos: -pos, from, to: width },
            ]
        })
        .collect()
}

/// Horizontal distance scale under the scope
pub struct XScale;

impl XScale {
    pub fn desired_height(width: f32) -> f32 {
        (width / HEIGHT_FRACTION).max(12.0)
    }

    pub fn show(ui: &mut egui::Ui, config: &ViewConfig, width: f32) -> egui::Response {
        let size = Vec2::new(width, Self::desired_height(width));
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect;
        let color = ui.visuals().text_color();
        let stroke = Stroke::new(2.0, color);

        for tick in x_ticks(rect.width(), rect.height()) {
            let x = rect.left() + tick.pos;
            painter.line_segment(
                [Pos2::new(x, rect.top() + tick.from), Pos2::new(x, rect.top() + tick.to)],
                stroke,
            );
        }

        let font = FontId::proportional(rect.height() * 2.0 / 3.0);
        painter.text(
            Pos2::new(rect.left(), rect.bottom() - rect.height() / 6.0),
            Align2::LEFT_BOTTOM,
            "m",
            font.clone(),
            color,
        );
        for (x, text) in x_labels(rect.width(), config.xscale_start, config.scale) {
            painter.text(
                Pos2::new(rect.left() + x, rect.bottom() - rect.height() / 8.0),
                Align2::CENTER_BOTTOM,
                text,
                font.clone(),
                color,
            );
        }

        response
    }
}

/// Vertical amplitude scale left of the scope
pub struct YScale;

impl YScale {
    pub fn desired_width(height: f32) -> f32 {
        (height / WIDTH_FRACTION).max(8.0)
    }

    pub fn show(ui: &mut egui::Ui, height: f32) -> egui::Response {
        let size = Vec2::new(Self::desired_width(height), height);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect: Rect = response.rect;
        let stroke = Stroke::new(2.0, ui.visuals().text_color());
        let centre = rect.center().y;

        for tick in y_ticks(rect.width(), rect.height()) {
            let y = centre + tick.pos;
            painter.line_segment(
                [Pos2::new(rect.left() + tick.from, y), Pos2::new(rect.left() + tick.to, y)],
                stroke,
            );
        }

        response
    }
}
