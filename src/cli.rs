use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::source::DEFAULT_MAX_FILE_SIZE;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map seller product files onto marketplace attribute templates",
    long_about = None
)]
pub struct Cli {
    /// Directory holding the template and mapping catalog
    #[arg(long, global = true, default_value = ".catalog-mapper")]
    pub store: PathBuf,
    /// Largest upload accepted, in bytes
    #[arg(long = "max-file-size", global = true, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the columns and row count of a CSV or Excel file
    Inspect(InspectArgs),
    /// Create, list, show and delete marketplace templates
    Template(TemplateArgs),
    /// Map a product file onto a stored template and save the mapping
    Map(MapArgs),
    /// List or delete saved mappings
    Mapping(MappingArgs),
    /// Summarize stored templates and mappings
    Stats(StatsArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Product or template file (.csv, .xlsx or .xls)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'); guessed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Also preview this many data rows
    #[arg(long)]
    pub rows: Option<usize>,
    /// Clip preview cells wider than this many characters
    #[arg(long = "cell-width", default_value_t = 40)]
    pub cell_width: usize,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub command: TemplateCommand,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// Derive a template from a file and store it
    Create(TemplateCreateArgs),
    /// List stored templates, newest first
    List(ListArgs),
    /// Show the attributes of one template
    Show(ShowArgs),
    /// Delete a template
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct TemplateCreateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Template name (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,
    /// Treat each row as an attribute definition (name, type, required, maxLength, enumValues)
    #[arg(long)]
    pub definitions: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub id: Uuid,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub id: Uuid,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Identifier of the stored template to map onto
    #[arg(short = 't', long = "template")]
    pub template: Uuid,
    /// Assignment of the form `source column=attribute`; repeatable
    #[arg(short = 'a', long = "assign", action = clap::ArgAction::Append)]
    pub assign: Vec<String>,
    /// Pre-fill assignments whose names match after snake-casing
    #[arg(long)]
    pub auto: bool,
    /// Validate only; do not save the mapping
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub command: MappingCommand,
}

#[derive(Debug, Subcommand)]
pub enum MappingCommand {
    /// List saved mappings, newest first
    List(ListArgs),
    /// Delete a saved mapping
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_are_accepted() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn map_command_collects_repeated_assignments() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "catalog-mapper",
            "map",
            "-i",
            "seller.csv",
            "-t",
            id.as_str(),
            "-a",
            "Item Code=sku",
            "--assign",
            "Name=title",
            "--dry-run",
        ])
        .expect("parse args");
        let Commands::Map(args) = cli.command else {
            panic!("expected map command");
        };
        assert_eq!(args.assign, vec!["Item Code=sku", "Name=title"]);
        assert!(args.dry_run);
        assert_eq!(cli.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }
}
