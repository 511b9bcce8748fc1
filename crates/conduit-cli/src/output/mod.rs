use serde::Serialize;
use serde_json::Value;
use serde_jsonlines::WriteExt;

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Table => render_table(value),
        OutputFormat::Jsonl => render_jsonl(value),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// Arrays become one line per element; anything else is a single line.
fn render_jsonl<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    match serde_json::to_value(value)? {
        Value::Array(items) => buf.write_json_lines(items)?,
        other => buf.write_json_lines([other])?,
    }
    let mut text = String::from_utf8(buf)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let prefs = ui::prefs();
    let options = table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    };

    Ok(match serde_json::to_value(value)? {
        Value::Array(items) => render_rows(&items, options),
        Value::Object(map) => {
            let rows = map
                .into_iter()
                .map(|(key, value)| vec![key, cell(&value)])
                .collect::<Vec<_>>();
            table::render(&["field", "value"], &rows, options)
        }
        scalar => cell(&scalar),
    })
}

/// One row per element, one column per field seen in any element.
fn render_rows(items: &[Value], options: table::TableOptions) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }
    if !items.iter().all(Value::is_object) {
        let rows = items.iter().map(|item| vec![cell(item)]).collect::<Vec<_>>();
        return table::render(&["value"], &rows, options);
    }

    let mut columns = Vec::<&str>::new();
    for map in items.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key.as_str());
            }
        }
    }

    let rows = items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            columns
                .iter()
                .map(|column| map.get(*column).map_or_else(|| String::from("-"), cell))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    table::render(&columns, &rows, options)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Array(items) if items.is_empty() => String::from("[]"),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}
