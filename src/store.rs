//! Persistence collaborator for templates and mapping records.
//!
//! Records are created whole, listed newest first and deleted whole; nothing
//! is updated in place. [`MemoryStore`] backs tests and one-shot sessions,
//! [`JsonStore`] keeps a single JSON document on disk.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{MapperError, RecordKind, Result},
    mapping::MappingAssignment,
    template::{Attribute, Template},
};

const CATALOG_FILE: &str = "catalog.json";
const LOCK_FILE: &str = "catalog.lock";

/// Everything a committed mapping carries besides its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMapping {
    pub file_name: String,
    pub template_name: String,
    pub mapping_count: usize,
    pub product_count: usize,
    pub mappings: MappingAssignment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub id: Uuid,
    pub file_name: String,
    pub template_name: String,
    pub mapping_count: usize,
    pub product_count: usize,
    pub mappings: MappingAssignment,
    pub created_at: DateTime<Utc>,
}

impl MappingRecord {
    fn from_request(request: NewMapping) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: request.file_name,
            template_name: request.template_name,
            mapping_count: request.mapping_count,
            product_count: request.product_count,
            mappings: request.mappings,
            created_at: Utc::now(),
        }
    }
}

pub trait Store {
    fn create_template(&mut self, name: &str, attributes: Vec<Attribute>) -> Result<Template>;
    fn list_templates(&self) -> Result<Vec<Template>>;
    fn get_template(&self, id: &Uuid) -> Result<Template>;
    fn delete_template(&mut self, id: &Uuid) -> Result<()>;
    fn create_mapping(&mut self, request: NewMapping) -> Result<MappingRecord>;
    fn list_mappings(&self) -> Result<Vec<MappingRecord>>;
    fn delete_mapping(&mut self, id: &Uuid) -> Result<()>;
}

/// Snapshot of every stored record, kept in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    templates: Vec<Template>,
    #[serde(default)]
    mappings: Vec<MappingRecord>,
}

impl Snapshot {
    fn templates_newest_first(&self) -> Vec<Template> {
        newest_first(&self.templates, |t| t.created_at)
    }

    fn mappings_newest_first(&self) -> Vec<MappingRecord> {
        newest_first(&self.mappings, |m| m.created_at)
    }

    fn find_template(&self, id: &Uuid) -> Result<Template> {
        self.templates
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| MapperError::not_found(RecordKind::Template, id))
    }

    fn remove_template(&mut self, id: &Uuid) -> Result<()> {
        let idx = self
            .templates
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| MapperError::not_found(RecordKind::Template, id))?;
        self.templates.remove(idx);
        Ok(())
    }

    fn remove_mapping(&mut self, id: &Uuid) -> Result<()> {
        let idx = self
            .mappings
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| MapperError::not_found(RecordKind::Mapping, id))?;
        self.mappings.remove(idx);
        Ok(())
    }
}

/// Sorts by creation time descending; ties keep reverse insertion order.
fn newest_first<T: Clone>(items: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut sorted = items.iter().rev().cloned().collect::<Vec<_>>();
    sorted.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    sorted
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: Snapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn create_template(&mut self, name: &str, attributes: Vec<Attribute>) -> Result<Template> {
        let template = Template::new(name, attributes)?;
        self.catalog.templates.push(template.clone());
        Ok(template)
    }

    fn list_templates(&self) -> Result<Vec<Template>> {
        Ok(self.catalog.templates_newest_first())
    }

    fn get_template(&self, id: &Uuid) -> Result<Template> {
        self.catalog.find_template(id)
    }

    fn delete_template(&mut self, id: &Uuid) -> Result<()> {
        self.catalog.remove_template(id)
    }

    fn create_mapping(&mut self, request: NewMapping) -> Result<MappingRecord> {
        let record = MappingRecord::from_request(request);
        self.catalog.mappings.push(record.clone());
        Ok(record)
    }

    fn list_mappings(&self) -> Result<Vec<MappingRecord>> {
        Ok(self.catalog.mappings_newest_first())
    }

    fn delete_mapping(&mut self, id: &Uuid) -> Result<()> {
        self.catalog.remove_mapping(id)
    }
}

/// Keeps the catalog in `<dir>/catalog.json`, shared by every process that
/// opens the same directory.
///
/// Reads load the document from disk under a shared lock on
/// `<dir>/catalog.lock`. Changes hold the exclusive lock while they re-read the
/// document, apply the edit, write a temporary sibling and rename it into
/// place, so concurrent sessions never overwrite each other's records.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonStore {
    /// Opens the store and checks that an existing document is readable.
    pub fn open(dir: &Path) -> Result<Self> {
        let store = Self {
            path: dir.join(CATALOG_FILE),
            lock_path: dir.join(LOCK_FILE),
        };
        let catalog = store.load()?;
        debug!(
            "Opened store {:?} with {} template(s) and {} mapping(s)",
            store.path,
            catalog.templates.len(),
            catalog.mappings.len()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current on-disk catalog; a missing document is an empty catalog.
    fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default());
        }
        let lock = self.lock_file()?;
        lock.lock_shared().map_err(|err| self.failure("Locking", &err))?;
        self.read()
    }

    fn read(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default());
        }
        let file = File::open(&self.path).map_err(|source| MapperError::Io {
            name: self.path.display().to_string(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|err| self.failure("Reading", &err))
    }

    /// Applies `change` to the latest catalog and persists it while holding
    /// the exclusive lock. Nothing is written when `change` fails.
    fn update<T>(&mut self, change: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.failure("Creating", &err))?;
        }
        let lock = self.lock_file()?;
        lock.lock().map_err(|err| self.failure("Locking", &err))?;
        let mut next = self.read()?;
        let value = change(&mut next)?;
        self.write(&next)?;
        Ok(value)
    }

    fn lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|err| self.failure("Opening lock for", &err))
    }

    fn write(&self, catalog: &Snapshot) -> Result<()> {
        let staging = self.path.with_extension("json.tmp");
        let file = File::create(&staging).map_err(|err| self.failure("Writing", &err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, catalog)
            .map_err(|err| self.failure("Writing", &err))?;
        writer.flush().map_err(|err| self.failure("Writing", &err))?;
        drop(writer);
        fs::rename(&staging, &self.path).map_err(|err| self.failure("Writing", &err))?;
        Ok(())
    }

    fn failure(&self, action: &str, err: &dyn std::fmt::Display) -> MapperError {
        MapperError::Persistence(format!("{action} {:?}: {err}", self.path))
    }
}

impl Store for JsonStore {
    fn create_template(&mut self, name: &str, attributes: Vec<Attribute>) -> Result<Template> {
        let template = Template::new(name, attributes)?;
        let stored = template.clone();
        self.update(|catalog| {
            catalog.templates.push(stored);
            Ok(())
        })?;
        info!("Stored template '{}' ({})", template.name, template.id);
        Ok(template)
    }

    fn list_templates(&self) -> Result<Vec<Template>> {
        Ok(self.load()?.templates_newest_first())
    }

    fn get_template(&self, id: &Uuid) -> Result<Template> {
        self.load()?.find_template(id)
    }

    fn delete_template(&mut self, id: &Uuid) -> Result<()> {
        self.update(|catalog| catalog.remove_template(id))
    }

    fn create_mapping(&mut self, request: NewMapping) -> Result<MappingRecord> {
        let record = MappingRecord::from_request(request);
        let stored = record.clone();
        self.update(|catalog| {
            catalog.mappings.push(stored);
            Ok(())
        })?;
        Ok(record)
    }

    fn list_mappings(&self) -> Result<Vec<MappingRecord>> {
        Ok(self.load()?.mappings_newest_first())
    }

    fn delete_mapping(&mut self, id: &Uuid) -> Result<()> {
        self.update(|catalog| catalog.remove_mapping(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Attribute;

    fn request(file_name: &str) -> NewMapping {
        let mut mappings = MappingAssignment::new();
        mappings.set("Item Code", "sku");
        NewMapping {
            file_name: file_name.to_string(),
            template_name: "Apparel".to_string(),
            mapping_count: 1,
            product_count: 4,
            mappings,
        }
    }

    #[test]
    fn listings_are_newest_first() {
        let mut store = MemoryStore::new();
        let first = store.create_mapping(request("a.csv")).expect("first");
        let second = store.create_mapping(request("b.csv")).expect("second");
        let listed = store.list_mappings().expect("list");
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn deleting_unknown_id_reports_not_found_and_keeps_records() {
        let mut store = MemoryStore::new();
        store.create_mapping(request("a.csv")).expect("create");
        let err = store.delete_mapping(&Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.list_mappings().expect("list").len(), 1);
    }

    #[test]
    fn deleting_removes_exactly_one_record() {
        let mut store = MemoryStore::new();
        let keep = store.create_mapping(request("a.csv")).expect("create");
        let gone = store.create_mapping(request("b.csv")).expect("create");
        store.delete_mapping(&gone.id).expect("delete");
        let listed = store.list_mappings().expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);
    }

    #[test]
    fn json_store_round_trips_templates_and_mappings() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut attribute = Attribute::text("color");
        attribute.enum_values = Some(vec!["red".into(), "blue".into()]);
        let (template, record) = {
            let mut store = JsonStore::open(dir.path()).expect("open");
            let template = store
                .create_template("Apparel", vec![Attribute::text("sku").required(), attribute])
                .expect("template");
            let record = store.create_mapping(request("a.csv")).expect("mapping");
            (template, record)
        };

        let reopened = JsonStore::open(dir.path()).expect("reopen");
        assert_eq!(reopened.get_template(&template.id).expect("get"), template);
        assert_eq!(reopened.list_mappings().expect("list"), vec![record]);
        assert!(!dir.path().join("catalog.json.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_catalog_unchanged() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").expect("write blocker");

        let mut store = JsonStore::open(&blocker).expect("open");
        let err = store.create_mapping(request("a.csv")).unwrap_err();
        assert!(matches!(err, MapperError::Persistence(_)));
        assert!(store.list_mappings().expect("list").is_empty());
    }

    #[test]
    fn handles_on_one_directory_see_each_others_records() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut first = JsonStore::open(dir.path()).expect("open first");
        let mut second = JsonStore::open(dir.path()).expect("open second");

        let a = first.create_mapping(request("a.csv")).expect("first commit");
        let b = second.create_mapping(request("b.csv")).expect("second commit");
        assert_eq!(first.list_mappings().expect("list").len(), 2);

        let reopened = JsonStore::open(dir.path()).expect("reopen");
        let mut names = reopened
            .list_mappings()
            .expect("list")
            .into_iter()
            .map(|m| m.file_name)
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["a.csv", "b.csv"]);

        // A handle opened before the record existed can still delete it.
        second.delete_mapping(&a.id).expect("delete from other handle");
        let left = first.list_mappings().expect("list");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, b.id);
    }

    #[test]
    fn template_created_elsewhere_is_visible() {
        let dir = tempfile::tempdir().expect("temp dir");
        let reader = JsonStore::open(dir.path()).expect("open reader");
        let mut writer = JsonStore::open(dir.path()).expect("open writer");
        let template = writer
            .create_template("Apparel", vec![Attribute::text("sku")])
            .expect("template");
        assert_eq!(reader.get_template(&template.id).expect("get"), template);
    }

    #[test]
    fn corrupt_document_is_a_persistence_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("catalog.json"), "{ not json").expect("write");
        let err = JsonStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, MapperError::Persistence(_)), "{err}");
    }

    #[test]
    fn get_template_unknown_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_template(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err,
            MapperError::NotFound {
                kind: RecordKind::Template,
                ..
            }
        ));
    }
}
