use std::fmt::Write as _;

use shared::protocol::ChartPoint;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |range, v| {
            Some(match range {
                None => Range { min: v, max: v },
                Some(Range { min, max }) => Range {
                    min: min.min(v),
                    max: max.max(v),
                },
            })
        })
    }

    fn size(&self) -> f64 {
        self.max - self.min
    }

    /// Maps `v` onto `[to_min, to_max]`; a zero-width range maps to the middle.
    fn project(&self, v: f64, to_min: f64, to_max: f64) -> f64 {
        if self.size() == 0.0 {
            return (to_min + to_max) / 2.0;
        }
        to_min + (v - self.min) / self.size() * (to_max - to_min)
    }
}

/// Draws the points as a single polyline. A numeric x column is laid out on a
/// linear axis, anything else by row position; rows without a numeric y
/// break the line.
pub(crate) fn line_chart(points: &[ChartPoint], x_label: &str, y_label: &str) -> String {
    let numeric_x = points
        .iter()
        .filter(|p| !p.x.is_empty())
        .all(|p| p.x.as_f64().is_some());
    let xs: Vec<Option<f64>> = points
        .iter()
        .enumerate()
        .map(|(row, p)| if numeric_x { p.x.as_f64() } else { Some(row as f64) })
        .collect();
    let ys: Vec<Option<f64>> = points.iter().map(|p| p.y.as_f64()).collect();

    let x_range = Range::of(xs.iter().flatten().copied());
    let y_range = Range::of(ys.iter().flatten().copied());

    let mut path = String::new();
    if let (Some(x_range), Some(y_range)) = (x_range, y_range) {
        let mut pen_down = false;
        for (x, y) in xs.iter().zip(&ys) {
            let (Some(x), Some(y)) = (x, y) else {
                pen_down = false;
                continue;
            };
            let px = x_range.project(*x, MARGIN, WIDTH - MARGIN);
            let py = y_range.project(*y, HEIGHT - MARGIN, MARGIN);
            let command = if pen_down { 'L' } else { 'M' };
            let _ = write!(path, "{command}{px:.2},{py:.2} ");
            pen_down = true;
        }
    }

    let mut svg = String::new();
    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" class="line-chart">"##
    );
    let _ = write!(
        svg,
        r##"<line x1="{MARGIN}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="#888"/><line x1="{MARGIN}" y1="{MARGIN}" x2="{MARGIN}" y2="{bottom}" stroke="#888"/>"##,
        bottom = HEIGHT - MARGIN,
        right = WIDTH - MARGIN,
    );
    if let Some(range) = y_range {
        let _ = write!(
            svg,
            r##"<text x="4" y="{top}" font-size="11">{max}</text><text x="4" y="{bottom}" font-size="11">{min}</text>"##,
            top = MARGIN,
            bottom = HEIGHT - MARGIN,
            max = range.max,
            min = range.min,
        );
    }
    if numeric_x {
        if let Some(range) = x_range {
            let _ = write!(
                svg,
                r##"<text x="{MARGIN}" y="{y}" font-size="11">{min}</text><text x="{right}" y="{y}" font-size="11" text-anchor="end">{max}</text>"##,
                y = HEIGHT - MARGIN + 14.0,
                right = WIDTH - MARGIN,
                min = range.min,
                max = range.max,
            );
        }
    }
    let _ = write!(
        svg,
        r##"<path d="{path}" fill="none" stroke="#636efa" stroke-width="2"/>"##,
        path = path.trim_end()
    );
    let _ = write!(
        svg,
        r##"<text x="{cx}" y="{y}" text-anchor="middle">{x}</text><text x="12" y="{cy}" text-anchor="middle" transform="rotate(-90 12 {cy})">{yl}</text></svg>"##,
        cx = WIDTH / 2.0,
        y = HEIGHT - 8.0,
        cy = HEIGHT / 2.0,
        x = escape(x_label),
        yl = escape(y_label),
    );
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
