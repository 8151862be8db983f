use std::borrow::Cow;
use std::fmt::Write as _;

/// Elastic plain-text table: columns padded to their widest cell.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows);
    let mut output = String::new();

    let header_line = format_row(headers, &widths);
    let _ = writeln!(output, "{header_line}");

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let separator_line = format_row(&separator_cells, &separator_widths);
    let _ = writeln!(output, "{separator_line}");

    for row in rows {
        let row_line = format_row(row, &widths);
        let _ = writeln!(output, "{row_line}");
    }

    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let rendered = render_table(headers, rows);
    print!("{rendered}");
}

/// Pipe-table markdown. Numeric-looking columns are right-aligned.
pub fn render_markdown_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows)
        .into_iter()
        .map(|w| w.max(3))
        .collect::<Vec<_>>();
    let numeric = (0..headers.len())
        .map(|idx| {
            !rows.is_empty()
                && rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .all(|cell| cell.parse::<f64>().is_ok())
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", markdown_row(headers, &widths, &numeric));
    let separator = widths
        .iter()
        .zip(&numeric)
        .map(|(width, right)| {
            if *right {
                format!("{}:", "-".repeat(width - 1))
            } else {
                format!(":{}", "-".repeat(width - 1))
            }
        })
        .collect::<Vec<_>>();
    let _ = writeln!(output, "| {} |", separator.join(" | "));
    for row in rows {
        let _ = writeln!(output, "{}", markdown_row(row, &widths, &numeric));
    }
    output
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }
    widths
}

fn markdown_row(values: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let cells = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let raw = values.get(idx).map(String::as_str).unwrap_or_default();
            let cell = sanitize_cell(raw).replace('|', "\\|");
            if right_align.get(idx).copied().unwrap_or(false) {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>();
    format!("| {} |", cells.join(" | "))
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        if idx >= widths.len() {
            break;
        }
        let sanitized = sanitize_cell(value);
        let display = display_width(sanitized.as_ref());
        let mut cell = sanitized.into_owned();
        let padding = widths
            .get(idx)
            .copied()
            .unwrap_or_default()
            .saturating_sub(display);
        if padding > 0 {
            cell.push_str(&" ".repeat(padding));
        }
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn render_table_pads_columns() {
        let rendered = render_table(
            &strings(&["column", "n"]),
            &[strings(&["amount", "12"]), strings(&["id", "0"])],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "column  n");
        assert_eq!(lines[1], "------  ---");
        assert_eq!(lines[2], "amount  12");
        assert_eq!(lines[3], "id      0");
    }

    #[test]
    fn markdown_table_right_aligns_numbers() {
        let rendered = render_markdown_table(
            &strings(&["column", "n_missing"]),
            &[strings(&["amount", "2"]), strings(&["a|b", "10"])],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "| column | n_missing |");
        assert_eq!(lines[1], "| :----- | --------: |");
        assert_eq!(lines[2], "| amount |         2 |");
        assert_eq!(lines[3], "| a\\|b   |        10 |");
    }
}
