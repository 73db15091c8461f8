//! `template` subcommands: create, list, show and delete stored templates.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{DeleteArgs, ListArgs, ShowArgs, TemplateArgs, TemplateCommand, TemplateCreateArgs},
    context::Catalog,
    io_utils,
    store::Store,
    table::TextTable,
};

pub fn execute<S: Store>(args: &TemplateArgs, catalog: &mut Catalog<S>) -> Result<()> {
    match &args.command {
        TemplateCommand::Create(create_args) => create(create_args, catalog),
        TemplateCommand::List(list_args) => list(list_args, catalog),
        TemplateCommand::Show(show_args) => show(show_args, catalog),
        TemplateCommand::Delete(delete_args) => delete(delete_args, catalog),
    }
}

fn create<S: Store>(args: &TemplateCreateArgs, catalog: &mut Catalog<S>) -> Result<()> {
    let options = io_utils::parse_options(&args.input)?;
    let path = &args.input.input;
    let file = catalog
        .open_upload(path)
        .with_context(|| format!("Opening template file {path:?}"))?;
    let template = catalog
        .create_template(&file, args.name.as_deref(), args.definitions, &options)
        .with_context(|| format!("Creating template from {path:?}"))?;
    info!(
        "Template '{}' has {} attribute(s), {} required",
        template.name,
        template.attributes.len(),
        template.required_names().len()
    );
    println!("{}", template.id);
    Ok(())
}

fn list<S: Store>(args: &ListArgs, catalog: &Catalog<S>) -> Result<()> {
    let templates = catalog.templates().context("Listing templates")?;
    if io_utils::print_structured(args.format, &templates)? {
        return Ok(());
    }
    if templates.is_empty() {
        info!("No templates stored yet");
        return Ok(());
    }
    let mut table = TextTable::new(["id", "name", "attributes", "required", "created"]);
    for template in &templates {
        table.push_row([
            template.id.to_string(),
            template.name.clone(),
            template.attributes.len().to_string(),
            template.required_names().len().to_string(),
            template.created_at.format("%Y-%m-%d").to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn show<S: Store>(args: &ShowArgs, catalog: &Catalog<S>) -> Result<()> {
    let template = catalog
        .template(&args.id)
        .with_context(|| format!("Loading template {}", args.id))?;
    if io_utils::print_structured(args.format, &template)? {
        return Ok(());
    }
    println!(
        "{} (created {})",
        template.name,
        template.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    let mut table = TextTable::new(["#", "attribute", "type", "required", "constraints"]);
    for (idx, attribute) in template.attributes.iter().enumerate() {
        table.push_row([
            (idx + 1).to_string(),
            attribute.name.clone(),
            attribute.attribute_type.to_string(),
            if attribute.required { "yes" } else { "no" }.to_string(),
            attribute.constraints(),
        ]);
    }
    table.print();
    Ok(())
}

fn delete<S: Store>(args: &DeleteArgs, catalog: &mut Catalog<S>) -> Result<()> {
    catalog
        .delete_template(&args.id)
        .with_context(|| format!("Deleting template {}", args.id))?;
    info!("Deleted template {}", args.id);
    Ok(())
}
