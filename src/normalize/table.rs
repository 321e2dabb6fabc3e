//! ASCII table rendering for normalized rows

use serde_json::Value;

use super::ResultDocument;

const MAX_CELL_WIDTH: usize = 40;

/// Renders rows as a table. Columns are the union of all fields in
/// first-seen order; a row without a field shows an empty cell.
pub fn render_table(rows: &[ResultDocument]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for (name, _) in row.fields() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    out.push_str(&line(columns.iter().map(|c| c.to_string()), &widths));
    out.push_str(&border);
    out.push('\n');
    for row in cells {
        out.push_str(&line(row.into_iter(), &widths));
    }
    out.push_str(&border);
    out.push('\n');
    out
}

fn line(values: impl Iterator<Item = String>, widths: &[usize]) -> String {
    let mut out = String::from("|");
    for (value, width) in values.zip(widths) {
        let pad = width - value.chars().count();
        out.push(' ');
        out.push_str(&value);
        out.push_str(&" ".repeat(pad + 1));
        out.push('|');
    }
    out.push('\n');
    out
}

fn cell(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let text = text.replace(['\n', '\r'], " ");
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}
