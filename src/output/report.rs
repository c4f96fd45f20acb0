use serde_json::Value;
use std::fmt::Write as _;

use super::METADATA_KEY;
use crate::analysis::{Analysis, fields};

const RULE: &str = "======================================================";

const KNOWN_FIELDS: [&str; 5] = [
    fields::NAME,
    fields::SUMMARY,
    fields::RESULTS,
    fields::SUCCESS,
    fields::PERFORMANCE,
];

/// Render `analysis` as a plain-text report.
///
/// The conventional fields come first (title, summary, results, success, performance); any other
/// keys follow under "ADDITIONAL INFORMATION". The `__metadata__` envelope is removed at every
/// nesting level and never appears in the output.
pub fn format_json_for_human(analysis: &Analysis) -> String {
    let analysis = strip_metadata(analysis);

    let text_or = |key: &str, missing: &str| -> String {
        match analysis.get(key) {
            None | Some(Value::Null) => missing.to_string(),
            Some(value) => render_value(value, 0),
        }
    };
    let success = match analysis.get(fields::SUCCESS) {
        Some(Value::Bool(true)) => "Yes".to_string(),
        Some(Value::Bool(false)) => "No".to_string(),
        None | Some(Value::Null) => "Undetermined".to_string(),
        Some(other) => render_value(other, 0),
    };

    let mut report = String::new();
    let _ = writeln!(
        report,
        "PAPER ANALYSIS: {}",
        text_or(fields::NAME, "Untitled paper")
    );
    let _ = writeln!(report, "{RULE}\n");
    let _ = writeln!(
        report,
        "SUMMARY:\n{}\n",
        text_or(fields::SUMMARY, "No summary available")
    );
    let _ = writeln!(
        report,
        "KEY RESULTS:\n{}\n",
        text_or(fields::RESULTS, "No results available")
    );
    let _ = writeln!(report, "PAPER SUCCEEDED: {success}\n");
    let _ = writeln!(
        report,
        "PERFORMANCE METRICS:\n{}",
        text_or(fields::PERFORMANCE, "Not specified")
    );

    let extra: Vec<(&String, &Value)> = analysis
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .collect();
    if !extra.is_empty() {
        let _ = writeln!(report, "\nADDITIONAL INFORMATION:");
        for (key, value) in extra {
            write_entry(&mut report, key, value, 0);
        }
    }

    report
}

fn strip_metadata(analysis: &Analysis) -> Analysis {
    analysis
        .iter()
        .filter(|(key, _)| key.as_str() != METADATA_KEY)
        .map(|(key, value)| (key.clone(), strip_value(value)))
        .collect()
}

fn strip_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip_metadata(map)),
        Value::Array(items) => Value::Array(items.iter().map(strip_value).collect()),
        other => other.clone(),
    }
}

fn write_entry(report: &mut String, key: &str, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) if !map.is_empty() => {
            let _ = writeln!(report, "{indent}{key}:");
            for (child_key, child) in map {
                write_entry(report, child_key, child, depth + 1);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            let _ = writeln!(report, "{indent}{key}:");
            let _ = writeln!(report, "{}", render_value(value, depth + 1));
        }
        scalar => {
            let _ = writeln!(report, "{indent}{key}: {}", render_value(scalar, depth));
        }
    }
}

fn render_value(value: &Value, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".into(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("{indent}- {}", render_value(item, depth + 1).trim_start()))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => {
            let mut rendered = String::new();
            for (key, child) in map {
                write_entry(&mut rendered, key, child, depth);
            }
            rendered.trim_end().to_string()
        }
    }
}
