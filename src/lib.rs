//! Tabular ingestion and attribute mapping for marketplace product feeds.
//!
//! A seller file (CSV or Excel) is parsed into columns and rows, a stored
//! [`template::Template`] describes the marketplace attributes, and a
//! [`mapping::MappingSession`] builds and validates the column-to-attribute
//! assignment before it is saved as a [`store::MappingRecord`].

pub mod cli;
pub mod context;
pub mod error;
pub mod inspect;
pub mod io_utils;
pub mod mapping;
pub mod mapping_cmd;
pub mod parser;
pub mod source;
pub mod store;
pub mod table;
pub mod template;
pub mod template_cmd;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands, StatsArgs},
    context::Catalog,
    store::{JsonStore, Store},
    table::TextTable,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("catalog_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let (store_dir, max_file_size) = (cli.store, cli.max_file_size);
    match cli.command {
        Commands::Inspect(args) => inspect::execute(&args, max_file_size),
        Commands::Template(args) => {
            template_cmd::execute(&args, &mut open_catalog(&store_dir, max_file_size)?)
        }
        Commands::Map(args) => {
            mapping_cmd::execute_map(&args, &mut open_catalog(&store_dir, max_file_size)?)
        }
        Commands::Mapping(args) => {
            mapping_cmd::execute(&args, &mut open_catalog(&store_dir, max_file_size)?)
        }
        Commands::Stats(args) => handle_stats(&args, &open_catalog(&store_dir, max_file_size)?),
    }
}

/// Only commands that read or write records touch the store.
fn open_catalog(dir: &Path, max_file_size: u64) -> Result<Catalog<JsonStore>> {
    let store = JsonStore::open(dir)
        .with_context(|| format!("Opening catalog store in {dir:?}"))?;
    debug!("Using store {:?}", store.path());
    Ok(Catalog::new(store, max_file_size))
}

fn handle_stats<S: Store>(args: &StatsArgs, catalog: &Catalog<S>) -> Result<()> {
    let stats = catalog.stats().context("Summarizing catalog")?;
    if io_utils::print_structured(args.format, &stats)? {
        return Ok(());
    }
    let mut table = TextTable::new(["metric", "value"]);
    table.push_row(["templates".to_string(), stats.templates.to_string()]);
    table.push_row(["uploaded files".to_string(), stats.uploaded_files.to_string()]);
    table.push_row(["active mappings".to_string(), stats.active_mappings.to_string()]);
    table.push_row(["products mapped".to_string(), stats.products_mapped.to_string()]);
    table.print();
    Ok(())
}
