//! Catalog context handed to every command for the duration of one run.
//!
//! Wraps the store so callers share one explicit owner of the template and
//! mapping lists instead of ambient global state.

use std::path::Path;

use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    mapping::MappingSession,
    parser::{self, ParseOptions},
    source::SourceFile,
    store::{MappingRecord, Store},
    template::{self, Template},
};

/// Dashboard figures derived from the stored records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub templates: usize,
    pub uploaded_files: usize,
    pub active_mappings: usize,
    pub products_mapped: usize,
}

pub struct Catalog<S: Store> {
    store: S,
    max_file_size: u64,
}

impl<S: Store> Catalog<S> {
    pub fn new(store: S, max_file_size: u64) -> Self {
        Self {
            store,
            max_file_size,
        }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Reads an upload and applies the size pre-check.
    pub fn open_upload(&self, path: &Path) -> Result<SourceFile> {
        let file = SourceFile::open(path)?;
        file.ensure_within(self.max_file_size)?;
        Ok(file)
    }

    /// Parses the whole file and stores a template derived from it. With
    /// `definitions` each row describes one attribute; otherwise every column
    /// becomes an optional text attribute.
    pub fn create_template(
        &mut self,
        file: &SourceFile,
        name: Option<&str>,
        definitions: bool,
        options: &ParseOptions,
    ) -> Result<Template> {
        file.ensure_within(self.max_file_size)?;
        let table = parser::read_table(file, options)?;
        let attributes = if definitions {
            template::attributes_from_definitions(&table)?
        } else {
            template::derive_from_table(&table)
        };
        let name = name.unwrap_or(file.name());
        let created = self.store.create_template(name, attributes)?;
        info!(
            "Created template '{}' with {} attribute(s)",
            created.name,
            created.attributes.len()
        );
        Ok(created)
    }

    pub fn templates(&self) -> Result<Vec<Template>> {
        self.store.list_templates()
    }

    pub fn template(&self, id: &Uuid) -> Result<Template> {
        self.store.get_template(id)
    }

    pub fn delete_template(&mut self, id: &Uuid) -> Result<()> {
        self.store.delete_template(id)
    }

    pub fn mappings(&self) -> Result<Vec<MappingRecord>> {
        self.store.list_mappings()
    }

    pub fn delete_mapping(&mut self, id: &Uuid) -> Result<()> {
        self.store.delete_mapping(id)
    }

    /// Starts a session with the file loaded and the template selected.
    pub fn start_session(
        &self,
        file: &SourceFile,
        template_id: &Uuid,
        options: &ParseOptions,
    ) -> Result<MappingSession> {
        file.ensure_within(self.max_file_size)?;
        let template = self.store.get_template(template_id)?;
        let mut session = MappingSession::new();
        session.load_file(file, options)?;
        session.select_template(template)?;
        Ok(session)
    }

    pub fn commit(&mut self, session: &mut MappingSession) -> Result<MappingRecord> {
        session.commit(&mut self.store).cloned()
    }

    pub fn stats(&self) -> Result<Stats> {
        let templates = self.store.list_templates()?.len();
        let mappings = self.store.list_mappings()?;
        Ok(Stats {
            templates,
            uploaded_files: mappings.len(),
            active_mappings: mappings.iter().map(|m| m.mapping_count).sum(),
            products_mapped: mappings.iter().map(|m| m.product_count).sum(),
        })
    }
}
