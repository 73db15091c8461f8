//! Template model: a named, ordered list of target attributes.
//!
//! Templates are derived once from an uploaded file and are read-only after
//! they are stored. Two derivations exist:
//!
//! - [`derive_attributes`] turns every distinct key observed across the rows
//!   into a text attribute, optional and unconstrained.
//! - [`attributes_from_definitions`] reads an attribute-definition sheet where
//!   each row describes one attribute (`name`, `type`, `required`,
//!   `maxLength`, `enumValues`).

use std::{collections::HashSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{
    error::{MapperError, Result},
    parser::{ParsedTable, Row},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Text,
    Number,
    Boolean,
    Enum,
    Date,
    Url,
    /// Any tag the closed set does not know about, kept verbatim.
    Other(String),
}

impl AttributeType {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeType::Text => "text",
            AttributeType::Number => "number",
            AttributeType::Boolean => "boolean",
            AttributeType::Enum => "enum",
            AttributeType::Date => "date",
            AttributeType::Url => "url",
            AttributeType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Ok(match normalized.as_str() {
            "" | "text" | "string" => AttributeType::Text,
            "number" | "integer" | "int" | "float" | "decimal" => AttributeType::Number,
            "boolean" | "bool" => AttributeType::Boolean,
            "enum" | "select" => AttributeType::Enum,
            "date" => AttributeType::Date,
            "url" => AttributeType::Url,
            _ => AttributeType::Other(value.trim().to_string()),
        })
    }
}

impl Serialize for AttributeType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        let Ok(parsed) = AttributeType::from_str(&token);
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl Attribute {
    /// Default inference: optional text with no constraints.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::Text,
            required: false,
            max_length: None,
            enum_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn constraints(&self) -> String {
        let mut parts = Vec::new();
        if let Some(max) = self.max_length {
            parts.push(format!("max length {max}"));
        }
        if let Some(values) = self.enum_values.as_ref().filter(|v| !v.is_empty()) {
            parts.push(format!("values {}", values.join("|")));
        }
        parts.join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// Assigns identity to a validated attribute list.
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MapperError::InvalidInput(
                "Template name cannot be empty".to_string(),
            ));
        }
        validate_attributes(&attributes)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            attributes,
            created_at: Utc::now(),
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Required attribute names in declared order.
    pub fn required_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|attr| attr.required)
            .map(|attr| attr.name.as_str())
            .collect()
    }
}

pub fn validate_attributes(attributes: &[Attribute]) -> Result<()> {
    let mut seen = HashSet::with_capacity(attributes.len());
    for attribute in attributes {
        if attribute.name.is_empty() {
            return Err(MapperError::InvalidInput(
                "Attribute name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(attribute.name.as_str()) {
            return Err(MapperError::InvalidInput(format!(
                "Duplicate attribute name '{}'",
                attribute.name
            )));
        }
        if attribute.max_length == Some(0) {
            return Err(MapperError::InvalidInput(format!(
                "Attribute '{}' must have a positive max length",
                attribute.name
            )));
        }
    }
    Ok(())
}

/// One text attribute per distinct key, in first-seen order across `rows`.
pub fn derive_attributes(rows: &[Row]) -> Vec<Attribute> {
    rows.iter()
        .flat_map(|row| row.columns().iter())
        .unique()
        .map(Attribute::text)
        .collect()
}

/// Same as [`derive_attributes`] but keeps header-only files usable: a table
/// without data rows still yields one attribute per column.
pub fn derive_from_table(table: &ParsedTable) -> Vec<Attribute> {
    if table.rows().is_empty() {
        table.columns().iter().map(Attribute::text).collect()
    } else {
        derive_attributes(table.rows())
    }
}

/// Columns an attribute-definition sheet may carry, matched loosely.
#[derive(Debug, Default)]
struct DefinitionColumns {
    name: Option<String>,
    attribute_type: Option<String>,
    required: Option<String>,
    max_length: Option<String>,
    enum_values: Option<String>,
}

impl DefinitionColumns {
    fn locate(columns: &[String]) -> Self {
        let mut found = DefinitionColumns::default();
        for column in columns {
            let key = column
                .chars()
                .filter(|c| !matches!(c, '_' | '-' | ' '))
                .collect::<String>()
                .to_ascii_lowercase();
            let slot = match key.as_str() {
                "name" | "attribute" | "attributename" => &mut found.name,
                "type" | "datatype" => &mut found.attribute_type,
                "required" | "mandatory" => &mut found.required,
                "maxlength" => &mut found.max_length,
                "enumvalues" | "values" | "allowedvalues" => &mut found.enum_values,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(column.clone());
            }
        }
        found
    }
}

pub fn attributes_from_definitions(table: &ParsedTable) -> Result<Vec<Attribute>> {
    let columns = DefinitionColumns::locate(table.columns());
    let name_column = columns.name.as_deref().ok_or_else(|| {
        MapperError::InvalidInput(
            "Attribute definitions need a 'name' column".to_string(),
        )
    })?;

    let cell = |row: &Row, column: Option<&str>| -> String {
        column
            .and_then(|c| row.get(c))
            .map(|value| value.as_display().trim().to_string())
            .unwrap_or_default()
    };

    let mut attributes = Vec::new();
    for (idx, row) in table.rows().iter().enumerate() {
        let name = cell(row, Some(name_column));
        if name.is_empty() {
            continue;
        }
        let type_token = cell(row, columns.attribute_type.as_deref());
        let Ok(attribute_type) = AttributeType::from_str(&type_token);
        let required = parse_flag(&cell(row, columns.required.as_deref())).ok_or_else(|| {
            MapperError::InvalidInput(format!(
                "Row {}: 'required' for '{name}' must be yes/no or true/false",
                idx + 2
            ))
        })?;
        let max_length = match cell(row, columns.max_length.as_deref()) {
            raw if raw.is_empty() => None,
            raw => Some(parse_max_length(&raw).ok_or_else(|| {
                MapperError::InvalidInput(format!(
                    "Row {}: max length '{raw}' for '{name}' is not a positive integer",
                    idx + 2
                ))
            })?),
        };
        let enum_values = match cell(row, columns.enum_values.as_deref()) {
            raw if raw.is_empty() => None,
            raw => Some(
                raw.split([',', '|'])
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>(),
            ),
        };
        attributes.push(Attribute {
            name,
            attribute_type,
            required,
            max_length,
            enum_values,
        });
    }
    validate_attributes(&attributes)?;
    Ok(attributes)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "n" | "0" | "f" => Some(false),
        "true" | "yes" | "y" | "1" | "t" => Some(true),
        _ => None,
    }
}

fn parse_max_length(raw: &str) -> Option<u32> {
    // Spreadsheet numbers arrive as "50" after display formatting.
    raw.parse::<u32>().ok().filter(|value| *value > 0)
}
