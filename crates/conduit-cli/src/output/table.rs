#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub max_width: Option<usize>,
    pub color: bool,
}

const MIN_COLUMN: usize = 4;
const GAP: &str = "  ";

/// Render string rows as aligned columns under a header and a rule.
#[must_use]
pub fn render(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();
    if let Some(max_width) = options.max_width {
        shrink_to_fit(&mut widths, max_width);
    }

    let header = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(&clip(h, *w), *w, false))
        .collect::<Vec<_>>()
        .join(GAP);
    let rule = "-".repeat(header.trim_end().chars().count());

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(header.trim_end().to_string());
    lines.push(rule);
    for row in rows {
        let line = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let text = clip(row.get(i).map_or("-", String::as_str), *w);
                let padded = pad(&text, *w, is_numeric(&text));
                if options.color {
                    paint(&padded, text.trim())
                } else {
                    padded
                }
            })
            .collect::<Vec<_>>()
            .join(GAP);
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// Narrow the widest column one character at a time until the row fits or
/// every column is at its minimum.
fn shrink_to_fit(widths: &mut [usize], max_width: usize) {
    let gaps = widths.len().saturating_sub(1) * GAP.len();
    while widths.iter().sum::<usize>() + gaps > max_width {
        let Some(widest) = widths
            .iter_mut()
            .filter(|w| **w > MIN_COLUMN)
            .max_by_key(|w| **w)
        else {
            break;
        };
        *widest -= 1;
    }
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out = text.chars().take(width.saturating_sub(1)).collect::<String>();
    out.push('…');
    out
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.chars().count()));
    if right_align {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.parse::<f64>().is_ok()
}

/// Color run statuses and booleans.
fn paint(padded: &str, value: &str) -> String {
    let code = match value {
        "completed" | "true" => "32",
        "paused" | "running" => "33",
        "failed" | "false" => "31",
        _ => return padded.to_string(),
    };
    format!("\u{1b}[{code}m{padded}\u{1b}[0m")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PLAIN: TableOptions = TableOptions {
        max_width: None,
        color: false,
    };

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn aligns_columns_and_right_aligns_numbers() {
        let out = render(
            &["id", "score"],
            &rows(&[&["a", "7"], &["bbbb", "42.5"]]),
            PLAIN,
        );
        assert_eq!(
            out,
            "id    score\n-----------\na         7\nbbbb   42.5"
        );
    }

    #[test]
    fn missing_cells_render_as_dash() {
        let out = render(&["id", "city"], &rows(&[&["a"]]), PLAIN);
        assert_eq!(out.lines().nth(2), Some("a   -"));
    }

    #[test]
    fn shrinks_the_widest_column_to_fit() {
        let options = TableOptions {
            max_width: Some(14),
            color: false,
        };
        let out = render(&["id", "city"], &rows(&[&["a", "North Houston Heights"]]), options);
        for line in out.lines() {
            assert!(line.chars().count() <= 14, "{line:?} is too wide");
        }
        assert!(out.contains('…'));
    }

    #[test]
    fn colors_statuses_when_enabled() {
        let options = TableOptions {
            max_width: None,
            color: true,
        };
        let out = render(&["status"], &rows(&[&["failed"]]), options);
        assert!(out.contains("\u{1b}[31m"));
    }
}
