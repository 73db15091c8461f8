//! Shared helpers for command handlers: parse options from CLI input flags
//! and structured (JSON/YAML) output.

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;

use crate::{cli::InputArgs, cli::OutputFormat, parser::ParseOptions};

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn parse_options(input: &InputArgs) -> Result<ParseOptions> {
    Ok(ParseOptions {
        delimiter: input.delimiter,
        encoding: resolve_encoding(input.input_encoding.as_deref())?,
    })
}

/// Prints `value` as JSON or YAML. Returns `false` for the table format so the
/// caller renders its own table.
pub fn print_structured<T: Serialize>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Table => Ok(false),
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(value).context("Serializing output as JSON")?;
            println!("{text}");
            Ok(true)
        }
        OutputFormat::Yaml => {
            let text = serde_yaml::to_string(value).context("Serializing output as YAML")?;
            print!("{text}");
            Ok(true)
        }
    }
}
