//! Mapping builder, validator and the single-user mapping session.
//!
//! An assignment maps source column names to target attribute names. Several
//! source columns may point at the same attribute; only omission of a
//! required attribute makes a mapping invalid.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use heck::ToSnakeCase;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{MapperError, Result},
    parser::{self, Discovery, ParseOptions},
    source::SourceFile,
    store::{MappingRecord, NewMapping, Store},
    template::Template,
};

/// Working source-column to target-attribute correspondence. An empty target
/// means the column is unassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingAssignment {
    entries: BTreeMap<String, String>,
}

impl MappingAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites whatever was assigned to `source` before.
    pub fn set(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.entries.insert(source.into(), target.into());
    }

    pub fn target(&self, source: &str) -> Option<&str> {
        self.entries
            .get(source)
            .map(|t| t.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    /// Attribute names used as a value anywhere, empty targets excluded.
    pub fn assigned_targets(&self) -> HashSet<&str> {
        self.entries
            .values()
            .map(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.entries.values().filter(|t| !t.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps the entries `keep` accepts and returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|source, target| keep(source.as_str(), target.as_str()));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Parses `Source=target` pairs; `Source=` clears the column.
    pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut assignment = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (source, target) = pair.split_once('=').ok_or_else(|| {
                MapperError::InvalidInput(format!(
                    "Assignment '{pair}' must use the form source=attribute"
                ))
            })?;
            let source = source.trim();
            if source.is_empty() {
                return Err(MapperError::InvalidInput(format!(
                    "Assignment '{pair}' is missing a source column"
                )));
            }
            assignment.set(source, target.trim());
        }
        Ok(assignment)
    }
}

impl FromIterator<(String, String)> for MappingAssignment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    /// Unmapped required attributes in the template's declared order.
    MissingRequired(Vec<String>),
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationOutcome::Ok => Ok(()),
            ValidationOutcome::MissingRequired(names) => Err(MapperError::MissingRequired(names)),
        }
    }
}

/// Valid iff every required attribute appears as some value of `assignment`.
pub fn validate(assignment: &MappingAssignment, template: &Template) -> ValidationOutcome {
    let assigned = assignment.assigned_targets();
    let missing = template
        .required_names()
        .into_iter()
        .filter(|name| !assigned.contains(name))
        .map(str::to_string)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        ValidationOutcome::Ok
    } else {
        ValidationOutcome::MissingRequired(missing)
    }
}

/// Pre-fills an assignment by matching snake-cased column and attribute names.
pub fn suggest_assignment(columns: &[String], template: &Template) -> MappingAssignment {
    let keys = template
        .attributes
        .iter()
        .map(|attr| (attr.name.to_snake_case(), attr.name.as_str()))
        .collect::<Vec<_>>();
    let mut assignment = MappingAssignment::new();
    for column in columns {
        let key = column.to_snake_case();
        if let Some((_, target)) = keys.iter().find(|(candidate, _)| *candidate == key) {
            assignment.set(column.clone(), *target);
        }
    }
    assignment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    FileLoaded,
    Ready,
    Mapping,
    Validated,
    Committed,
    Aborted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Empty => "empty",
            SessionState::FileLoaded => "file-loaded",
            SessionState::Ready => "ready",
            SessionState::Mapping => "mapping",
            SessionState::Validated => "validated",
            SessionState::Committed => "committed",
            SessionState::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
struct LoadedFile {
    name: String,
    discovery: Discovery,
}

/// One user editing one mapping. Owns the transient file summary and
/// assignment; nothing reaches storage before [`MappingSession::commit`].
#[derive(Debug, Clone)]
pub struct MappingSession {
    state: SessionState,
    file: Option<LoadedFile>,
    template: Option<Template>,
    assignment: MappingAssignment,
    record: Option<MappingRecord>,
}

impl Default for MappingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Empty,
            file: None,
            template: None,
            assignment: MappingAssignment::new(),
            record: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn columns(&self) -> &[String] {
        self.file
            .as_ref()
            .map(|f| f.discovery.columns.as_slice())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.file.as_ref().map_or(0, |f| f.discovery.row_count)
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn assignment(&self) -> &MappingAssignment {
        &self.assignment
    }

    pub fn record(&self) -> Option<&MappingRecord> {
        self.record.as_ref()
    }

    fn ensure(&self, action: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MapperError::OutOfOrder {
                action,
                state: self.state.to_string(),
            })
        }
    }

    /// Runs a discovery parse. On failure the session keeps its prior state.
    pub fn load_file(&mut self, file: &SourceFile, options: &ParseOptions) -> Result<&Discovery> {
        self.ensure("load a file", &[SessionState::Empty, SessionState::FileLoaded])?;
        let discovery = parser::discover(file, options)?;
        info!(
            "Loaded '{}': {} column(s), {} row(s)",
            file.name(),
            discovery.columns.len(),
            discovery.row_count
        );
        self.assignment = MappingAssignment::new();
        self.state = SessionState::FileLoaded;
        let loaded = self.file.insert(LoadedFile {
            name: file.name().to_string(),
            discovery,
        });
        Ok(&loaded.discovery)
    }

    /// Picks the template to map onto. Switching templates mid-edit keeps
    /// assignments whose target the new template also declares and drops the
    /// rest; the assignment then has to be validated again.
    pub fn select_template(&mut self, template: Template) -> Result<()> {
        self.ensure(
            "select a template",
            &[
                SessionState::FileLoaded,
                SessionState::Ready,
                SessionState::Mapping,
                SessionState::Validated,
            ],
        )?;
        debug!("Selected template '{}' ({})", template.name, template.id);
        let dropped = self
            .assignment
            .retain(|_, target| target.is_empty() || template.attribute(target).is_some());
        if dropped > 0 {
            info!("Dropped {dropped} assignment(s) the new template does not declare");
        }
        self.template = Some(template);
        self.state = if self.assignment.is_empty() {
            SessionState::Ready
        } else {
            SessionState::Mapping
        };
        Ok(())
    }

    /// Always succeeds. Columns outside the loaded file and targets outside the
    /// selected template are ignored so the assignment stays within both.
    pub fn set_assignment(&mut self, source: &str, target: &str) {
        if !matches!(
            self.state,
            SessionState::Ready | SessionState::Mapping | SessionState::Validated
        ) {
            warn!("Ignoring assignment for '{source}' while session is {}", self.state);
            return;
        }
        if !self.columns().iter().any(|c| c == source) {
            warn!("Ignoring assignment for unknown source column '{source}'");
            return;
        }
        let known_target = target.is_empty()
            || self
                .template
                .as_ref()
                .is_some_and(|t| t.attribute(target).is_some());
        if !known_target {
            warn!("Ignoring assignment of '{source}' to unknown attribute '{target}'");
            return;
        }
        self.assignment.set(source, target);
        self.state = SessionState::Mapping;
    }

    pub fn apply(&mut self, assignment: &MappingAssignment) {
        for (source, target) in assignment.iter() {
            self.set_assignment(source, target);
        }
    }

    /// Moves to `Validated` only when every required attribute is covered.
    pub fn validate(&mut self) -> Result<ValidationOutcome> {
        self.ensure(
            "validate",
            &[SessionState::Ready, SessionState::Mapping, SessionState::Validated],
        )?;
        let template = self.template.as_ref().ok_or_else(|| MapperError::OutOfOrder {
            action: "validate",
            state: self.state.to_string(),
        })?;
        let outcome = validate(&self.assignment, template);
        self.state = if outcome.is_ok() {
            SessionState::Validated
        } else {
            SessionState::Mapping
        };
        Ok(outcome)
    }

    /// Persists the mapping. A storage failure leaves the session `Validated`.
    pub fn commit(&mut self, store: &mut dyn Store) -> Result<&MappingRecord> {
        self.ensure("commit", &[SessionState::Validated])?;
        let (Some(file), Some(template)) = (self.file.as_ref(), self.template.as_ref()) else {
            return Err(MapperError::OutOfOrder {
                action: "commit",
                state: self.state.to_string(),
            });
        };
        let request = NewMapping {
            file_name: file.name.clone(),
            template_name: template.name.clone(),
            mapping_count: self.assignment.assigned_count(),
            product_count: file.discovery.row_count,
            mappings: self.assignment.clone(),
        };
        let record = store.create_mapping(request)?;
        info!(
            "Saved mapping {} for '{}' ({} mapped column(s), {} product(s))",
            record.id, record.file_name, record.mapping_count, record.product_count
        );
        self.state = SessionState::Committed;
        Ok(&*self.record.insert(record))
    }

    pub fn abort(&mut self) {
        if self.state != SessionState::Committed {
            debug!("Aborting mapping session in state {}", self.state);
            self.file = None;
            self.template = None;
            self.assignment = MappingAssignment::new();
            self.state = SessionState::Aborted;
        }
    }
}
