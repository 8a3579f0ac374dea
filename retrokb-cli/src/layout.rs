//! Render a keyboard profile's matrix.
//!
//! The table form prints one row per drive line and one column per sense
//! line; the HTML form draws the same grid as an SVG so the wiring can be
//! checked against the keyboard's schematic.

use retrokb_engine::{DeviceProfile, KeyId, ModifierKind, Special};

/// What sits at one matrix crossing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Cell {
    Key(&'static str),
    Special(Special),
    Unwired,
}

impl Cell {
    fn at(profile: &DeviceProfile, key: KeyId) -> Self {
        if let Some(special) = profile.special(key) {
            return Cell::Special(special);
        }
        match profile.entry(key).label {
            "" => Cell::Unwired,
            label => Cell::Key(label),
        }
    }

    fn text(&self) -> &'static str {
        match *self {
            Cell::Key(label) => label,
            Cell::Special(special) => special.tag(),
            Cell::Unwired => "-",
        }
    }

    fn class(&self) -> &'static str {
        match self {
            Cell::Key(_) => "key",
            Cell::Special(Special::Shift(_)) | Cell::Special(Special::Modifier(_)) => {
                "key modifier"
            }
            Cell::Special(_) => "key special",
            Cell::Unwired => "key unused",
        }
    }
}

fn cells(profile: &DeviceProfile) -> Vec<Vec<Cell>> {
    (0..profile.drive_count)
        .map(|drive| {
            (0..profile.sense_count)
                .map(|sense| Cell::at(profile, (drive * profile.sense_count + sense) as KeyId))
                .collect()
        })
        .collect()
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Plain-text grid, drive lines down and sense lines across.
pub fn render_table(profile: &DeviceProfile) -> String {
    let grid = cells(profile);
    let width = grid
        .iter()
        .flatten()
        .map(|c| c.text().chars().count())
        .max()
        .unwrap_or(1)
        .max(2);

    let mut out = format!(
        "{} ({}x{}): {}\n",
        profile.name, profile.drive_count, profile.sense_count, profile.description
    );

    let mut header = String::from("   ");
    for sense in 0..profile.sense_count {
        header.push_str(&format!(" {:<width$}", format!("s{}", sense)));
    }
    push_line(&mut out, &header);

    for (drive, row) in grid.iter().enumerate() {
        let mut line = format!("d{:<2}", drive);
        for cell in row {
            line.push_str(&format!(" {:<width$}", cell.text()));
        }
        push_line(&mut out, &line);
    }

    let mut notes = Vec::new();
    if profile.discrete_shift {
        notes.push("left/right shift reported separately");
    }
    if profile.alt_lock {
        notes.push("shift combos drive the alt lock");
    }
    if profile
        .specials
        .iter()
        .any(|(_, s)| *s == Special::Modifier(ModifierKind::Alt))
    {
        notes.push("RUN/STOP is Alt");
    }
    if !notes.is_empty() {
        out.push_str(&format!("\n{}\n", notes.join("; ")));
    }
    out
}

/// Key unit size in SVG pixels.
const U: f64 = 54.0;
/// Gap between keys.
const GAP: f64 = 4.0;
/// Step: key + gap.
const S: f64 = U + GAP;
/// Key corner radius.
const R: f64 = 4.0;
/// Margin around the SVG content, room for the line numbers.
const MARGIN: f64 = 40.0;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_grid(profile: &DeviceProfile) -> String {
    let mut svg = format!(r#"<g transform="translate({MARGIN}, {MARGIN})">"#);

    for sense in 0..profile.sense_count {
        svg.push_str(&format!(
            r#"<text x="{}" y="-12" class="axis">s{sense}</text>"#,
            sense as f64 * S + U / 2.0,
        ));
    }

    for (drive, row) in cells(profile).iter().enumerate() {
        let y = drive as f64 * S;
        svg.push_str(&format!(
            r#"<text x="-20" y="{}" class="axis">d{drive}</text>"#,
            y + U / 2.0 + 1.0,
        ));

        for (sense, cell) in row.iter().enumerate() {
            let x = sense as f64 * S;
            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{U}" height="{U}" rx="{R}" class="{}"/>"#,
                cell.class(),
            ));

            let label = match cell {
                Cell::Unwired => continue,
                other => other.text(),
            };
            let font_class = if label.chars().count() > 3 { " small" } else { "" };
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" class="label{font_class}">{}</text>"#,
                x + U / 2.0,
                y + U / 2.0 + 1.0,
                html_escape(label),
            ));
        }
    }

    svg.push_str("</g>");
    svg
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html(profile: &DeviceProfile) -> String {
    let total_width = profile.sense_count as f64 * S + 2.0 * MARGIN;
    let total_height = profile.drive_count as f64 * S + 2.0 * MARGIN;
    let title = html_escape(profile.description);

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    flex-direction: column;
    align-items: center;
    padding: 2em;
  }}
  .key {{
    fill: #16213e;
    stroke: #0f3460;
    stroke-width: 1.5;
  }}
  .key.unused {{
    fill: #0d1117;
    stroke: #21262d;
    stroke-dasharray: 3 3;
  }}
  .key.special {{
    fill: #2d1b4e;
    stroke: #e94560;
    stroke-width: 2;
  }}
  .key.modifier {{
    fill: #1b2e4e;
    stroke: #53a8b6;
  }}
  .label {{
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 13px;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
  .label.small {{
    font-size: 10px;
  }}
  .axis {{
    fill: #e94560;
    font-size: 12px;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
</style>
</head>
<body>
<h2>{title}</h2>
<svg width="{total_width}" height="{total_height}" xmlns="http://www.w3.org/2000/svg">
"#
    );

    html.push_str(&render_grid(profile));
    html.push_str("\n</svg>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrokb_engine::profiles::{c64, vic20};

    #[test]
    fn table_has_a_row_per_drive_line() {
        let table = render_table(&c64::PROFILE);
        let rows: Vec<&str> = table.lines().filter(|l| l.starts_with('d')).collect();
        assert_eq!(rows.len(), 9);
        assert!(rows[0].contains("InstDel"));
        assert!(rows[7].contains("Alt"), "{}", rows[7]);
        // RESTORE line has one key, the rest unwired.
        assert_eq!(rows[8].matches('-').count(), 7);
        assert!(table.lines().all(|l| !l.ends_with(' ')));
    }

    #[test]
    fn table_notes_device_quirks() {
        let table = render_table(&vic20::PROFILE);
        assert!(table.contains("left/right shift reported separately"));
        assert!(table.contains("alt lock"));
        assert!(!table.contains("RUN/STOP is Alt"));
    }

    #[test]
    fn cells_classify_specials() {
        assert_eq!(Cell::at(&c64::PROFILE, c64::LEFT_SHIFT).class(), "key modifier");
        assert_eq!(Cell::at(&c64::PROFILE, c64::RESTORE).class(), "key special");
        assert_eq!(Cell::at(&c64::PROFILE, 65), Cell::Unwired);
    }

    #[test]
    fn html_escapes_labels() {
        assert_eq!(html_escape("<&>"), "&lt;&amp;&gt;");
        let html = generate_html(&c64::PROFILE);
        assert!(html.contains("<svg"));
        assert_eq!(html.matches("<rect").count(), 72);
    }
}
