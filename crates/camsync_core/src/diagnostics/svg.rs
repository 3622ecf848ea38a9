//! Minimal SVG line-plot writer.

use std::fmt::Write;

pub(crate) const WIDTH: f64 = 1000.0;
const MARGIN: f64 = 40.0;

/// One panel of a plot: a polyline scaled into a box.
pub(crate) struct Panel<'a> {
    pub title: String,
    pub values: &'a [f64],
    pub y_range: (f64, f64),
    pub color: &'a str,
    /// Horizontal reference line in data units.
    pub hline: Option<(f64, &'a str)>,
    /// Vertical marker at a sample index.
    pub vline: Option<(usize, &'a str)>,
}

/// Render panels stacked vertically, each `panel_height` tall.
pub(crate) fn render(title: &str, panels: &[Panel<'_>], panel_height: f64) -> String {
    let height = MARGIN + panels.len() as f64 * (panel_height + MARGIN);
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{height}" viewBox="0 0 {WIDTH} {height}">"#
    );
    let _ = writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        out,
        r#"<text x="{}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );

    for (i, panel) in panels.iter().enumerate() {
        let top = MARGIN + i as f64 * (panel_height + MARGIN);
        draw_panel(&mut out, panel, top, panel_height);
    }

    out.push_str("</svg>\n");
    out
}

fn draw_panel(out: &mut String, panel: &Panel<'_>, top: f64, height: f64) {
    let left = MARGIN;
    let width = WIDTH - 2.0 * MARGIN;
    let (y_min, y_max) = panel.y_range;
    let span = if y_max > y_min { y_max - y_min } else { 1.0 };
    let n = panel.values.len().max(2) - 1;

    let x_of = |i: usize| left + width * i as f64 / n as f64;
    let y_of = |v: f64| top + height - height * ((v - y_min) / span).clamp(0.0, 1.0);

    let _ = writeln!(
        out,
        r##"<rect x="{left}" y="{top}" width="{width}" height="{height}" fill="none" stroke="#999"/>"##
    );
    let _ = writeln!(
        out,
        r#"<text x="{}" y="{}" font-family="sans-serif" font-size="12">{}</text>"#,
        left + 4.0,
        top + 14.0,
        escape(&panel.title)
    );

    if let Some((value, color)) = panel.hline {
        let y = y_of(value);
        let _ = writeln!(
            out,
            r#"<line x1="{left}" y1="{y:.2}" x2="{}" y2="{y:.2}" stroke="{color}" stroke-dasharray="6,4"/>"#,
            left + width
        );
    }
    if let Some((index, color)) = panel.vline {
        let x = x_of(index);
        let _ = writeln!(
            out,
            r#"<line x1="{x:.2}" y1="{top}" x2="{x:.2}" y2="{}" stroke="{color}"/>"#,
            top + height
        );
    }

    if panel.values.is_empty() {
        return;
    }
    let _ = write!(
        out,
        r#"<polyline fill="none" stroke="{}" stroke-width="1" points=""#,
        panel.color
    );
    for (i, &v) in panel.values.iter().enumerate() {
        let _ = write!(out, "{:.2},{:.2} ", x_of(i), y_of(v));
    }
    out.push_str("\"/>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Reduce `values` to at most `buckets` points, keeping each bucket's extreme.
pub(crate) fn decimate(values: &[f64], buckets: usize) -> Vec<f64> {
    if values.len() <= buckets || buckets == 0 {
        return values.to_vec();
    }
    let size = values.len().div_ceil(buckets);
    values
        .chunks(size)
        .map(|chunk| {
            chunk
                .iter()
                .copied()
                .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_one_polyline_per_panel() {
        let values = [0.0, 1.0, 0.5];
        let panels = vec![
            Panel {
                title: "a & b".into(),
                values: &values,
                y_range: (0.0, 1.0),
                color: "black",
                hline: Some((0.5, "red")),
                vline: Some((1, "blue")),
            },
            Panel {
                title: "c".into(),
                values: &values,
                y_range: (0.0, 1.0),
                color: "black",
                hline: None,
                vline: None,
            },
        ];
        let svg = render("plot", &panels, 100.0);
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("a &amp; b"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn decimate_keeps_peaks() {
        let mut values = vec![0.0; 1000];
        values[503] = -0.9;
        let reduced = decimate(&values, 100);
        assert_eq!(reduced.len(), 100);
        assert!(reduced.contains(&-0.9));
    }
}
