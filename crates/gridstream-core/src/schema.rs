//! Column schema. Pure data, validated once at construction.
//!
//! A schema is immutable for the lifetime of an export session; the accessor
//! cache keys on its ordered column names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declared kind of a column. Drives typed cell writes in sinks that support
/// them; formatting of the value itself is driven by the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Number,
    Boolean,
    DateTime,
    Guid,
    #[default]
    Generic,
}

impl std::str::FromStr for ColumnKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(ColumnKind::Text),
            "number" | "numeric" => Ok(ColumnKind::Number),
            "boolean" | "bool" => Ok(ColumnKind::Boolean),
            "datetime" | "date" | "timestamp" => Ok(ColumnKind::DateTime),
            "guid" | "uuid" => Ok(ColumnKind::Guid),
            "generic" | "any" | "" => Ok(ColumnKind::Generic),
            other => Err(Error::Schema(format!("unknown column kind `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub header: String,
    pub kind: ColumnKind,
}

impl Column {
    /// Column whose header is its name.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        Self {
            header: name.clone(),
            name,
            kind,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Parse `name[:kind[:header]]`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        let kind = match parts.next() {
            Some(k) => k.parse()?,
            None => ColumnKind::Generic,
        };
        let mut column = Column::new(name, kind);
        if let Some(header) = parts.next() {
            column = column.with_header(header);
        }
        Ok(column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    /// Validate and build. Rejects an empty list, blank names and duplicate
    /// names (reporting every duplicate with its positions).
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Schema("column list is empty".into()));
        }
        if let Some(idx) = columns.iter().position(|c| c.name.trim().is_empty()) {
            return Err(Error::Schema(format!("column {idx} has a blank name")));
        }

        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, column) in columns.iter().enumerate() {
            positions.entry(column.name.as_str()).or_default().push(idx);
        }
        let mut duplicates: Vec<(&str, Vec<usize>)> = positions
            .into_iter()
            .filter(|(_, idxs)| idxs.len() > 1)
            .collect();
        if !duplicates.is_empty() {
            duplicates.sort_by_key(|(_, idxs)| idxs[0]);
            let detail = duplicates
                .iter()
                .map(|(name, idxs)| format!("`{name}` at {idxs:?}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::Schema(format!("duplicate column names: {detail}")));
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.header.as_str())
    }

    pub fn kinds(&self) -> impl Iterator<Item = ColumnKind> + '_ {
        self.columns.iter().map(|c| c.kind)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl<'de> Deserialize<'de> for ColumnSchema {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            columns: Vec<Column>,
        }
        let raw = Raw::deserialize(de)?;
        ColumnSchema::new(raw.columns).map_err(serde::de::Error::custom)
    }
}
