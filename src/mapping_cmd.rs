//! `map` and `mapping` subcommands.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::{DeleteArgs, ListArgs, MapArgs, MappingArgs, MappingCommand},
    context::Catalog,
    error::MapperError,
    io_utils,
    mapping::{self, MappingAssignment, ValidationOutcome},
    store::Store,
    table::TextTable,
    template::Template,
};

pub fn execute_map<S: Store>(args: &MapArgs, catalog: &mut Catalog<S>) -> Result<()> {
    let options = io_utils::parse_options(&args.input)?;
    let path = &args.input.input;
    let file = catalog
        .open_upload(path)
        .with_context(|| format!("Opening upload {path:?}"))?;
    let mut session = catalog
        .start_session(&file, &args.template, &options)
        .with_context(|| format!("Starting mapping session for {path:?}"))?;
    let template = session
        .template()
        .cloned()
        .context("Session has no template selected")?;

    let explicit = MappingAssignment::parse_pairs(&args.assign)?;
    check_assignment(&explicit, session.columns(), &template)?;

    let mut assignment = if args.auto {
        mapping::suggest_assignment(session.columns(), &template)
    } else {
        MappingAssignment::new()
    };
    for (source, target) in explicit.iter() {
        assignment.set(source, target);
    }
    session.apply(&assignment);

    let mut table = TextTable::new(["source column", "attribute"]);
    for column in session.columns() {
        let target = session.assignment().target(column).unwrap_or_default();
        table.push_row([column.as_str(), target]);
    }
    table.print();

    if let ValidationOutcome::MissingRequired(names) = session.validate()? {
        warn!("{} required attribute(s) are not mapped", names.len());
        return Err(MapperError::MissingRequired(names).into());
    }
    if args.dry_run {
        info!("Mapping for '{}' is valid; dry run, nothing saved", file.name());
        return Ok(());
    }

    let record = catalog
        .commit(&mut session)
        .with_context(|| format!("Saving mapping for {path:?}"))?;
    println!("{}", record.id);
    Ok(())
}

/// Rejects assignments naming columns or attributes that do not exist.
fn check_assignment(
    assignment: &MappingAssignment,
    columns: &[String],
    template: &Template,
) -> Result<(), MapperError> {
    let known = columns.iter().map(|c| c.as_str()).collect::<HashSet<_>>();
    for (source, target) in assignment.iter() {
        if !known.contains(source) {
            return Err(MapperError::InvalidInput(format!(
                "'{source}' is not a column of the uploaded file"
            )));
        }
        if !target.is_empty() && template.attribute(target).is_none() {
            return Err(MapperError::InvalidInput(format!(
                "'{target}' is not an attribute of template '{}'",
                template.name
            )));
        }
    }
    Ok(())
}

pub fn execute<S: Store>(args: &MappingArgs, catalog: &mut Catalog<S>) -> Result<()> {
    match &args.command {
        MappingCommand::List(list_args) => list(list_args, catalog),
        MappingCommand::Delete(delete_args) => delete(delete_args, catalog),
    }
}

fn list<S: Store>(args: &ListArgs, catalog: &Catalog<S>) -> Result<()> {
    let mappings = catalog.mappings().context("Listing mappings")?;
    if io_utils::print_structured(args.format, &mappings)? {
        return Ok(());
    }
    if mappings.is_empty() {
        info!("No mappings saved yet");
        return Ok(());
    }
    let mut table = TextTable::new(["id", "file", "template", "mapped", "products", "created"]);
    for record in &mappings {
        table.push_row([
            record.id.to_string(),
            record.file_name.clone(),
            record.template_name.clone(),
            record.mapping_count.to_string(),
            record.product_count.to_string(),
            record.created_at.format("%Y-%m-%d").to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn delete<S: Store>(args: &DeleteArgs, catalog: &mut Catalog<S>) -> Result<()> {
    catalog
        .delete_mapping(&args.id)
        .with_context(|| format!("Deleting mapping {}", args.id))?;
    info!("Deleted mapping {}", args.id);
    Ok(())
}
