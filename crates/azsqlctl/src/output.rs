//! Result rendering: human lines, JSON, YAML and tables

use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    /// Structured format for a CLI selection; `None` means human-readable lines
    pub fn structured(format: cli::OutputFormat) -> Option<Self> {
        match format {
            cli::OutputFormat::Auto => None,
            cli::OutputFormat::Json => Some(Self::Json),
            cli::OutputFormat::Yaml => Some(Self::Yaml),
            cli::OutputFormat::Table => Some(Self::Table),
        }
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    let json_value = serde_json::to_value(data)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Table => {
            println!("{}", render_table(&json_value));
        }
    }

    Ok(())
}

fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();

            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }

            table.to_string()
        }
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

/// Single sink for user-visible results
///
/// Every line is logged under the `azsqlctl::report` target. In `auto` mode
/// lines also go to stdout; otherwise only the structured result is printed.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    format: Option<OutputFormat>,
}

impl Reporter {
    pub fn new(format: cli::OutputFormat) -> Self {
        Self {
            format: OutputFormat::structured(format),
        }
    }

    pub fn line(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        info!(target: "azsqlctl::report", "{}", text);
        if self.format.is_none() {
            println!("{}", text);
        }
    }

    /// Print `data` when a structured format was requested
    pub fn data<T: Serialize>(&self, data: &T) -> Result<()> {
        match self.format {
            Some(format) => print_output(data, format),
            None => Ok(()),
        }
    }

    pub fn is_human(&self) -> bool {
        self.format.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_mapping() {
        assert_eq!(OutputFormat::structured(cli::OutputFormat::Auto), None);
        assert_eq!(
            OutputFormat::structured(cli::OutputFormat::Yaml),
            Some(OutputFormat::Yaml)
        );
        assert!(Reporter::new(cli::OutputFormat::Auto).is_human());
        assert!(!Reporter::new(cli::OutputFormat::Table).is_human());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Null), "-");
        assert_eq!(format_value(&json!(12.5)), "12.5");
        assert_eq!(format_value(&json!("SO71797")), "SO71797");
        assert_eq!(format_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(format_value(&json!({"a": 1})), "{1 fields}");
    }

    #[test]
    fn test_table_uses_keys_of_first_row() {
        let rendered = render_table(&json!([
            {"product_id": 836, "order_qty": 1},
            {"product_id": 822, "order_qty": null},
        ]));
        assert!(rendered.contains("product_id"));
        assert!(rendered.contains("order_qty"));
        assert!(rendered.contains("836"));
        assert!(rendered.contains("822"));
    }

    #[test]
    fn test_scalar_renders_without_table() {
        assert_eq!(render_table(&json!(42)), "42");
    }
}
