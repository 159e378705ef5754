use std::collections::HashMap;
use std::path::Path;

use crate::error::{LoadError, SourceKind};
use crate::model::columns;
use crate::table::Table;

/// ISO alpha-2 code to display name. Static reference data.
#[derive(Debug, Clone, Default)]
pub struct CountryNameMap {
    names: HashMap<String, String>,
}

impl CountryNameMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(code, name)| (code.into().trim().to_ascii_uppercase(), name.into()))
                .collect(),
        }
    }

    pub fn from_table(table: &Table, path: &Path) -> Result<Self, LoadError> {
        table.require_columns(
            SourceKind::Countries,
            path,
            &[columns::ISO_ALPHA2, columns::ISO_NAME],
        )?;
        let mut names = HashMap::with_capacity(table.len());
        for row in table.rows() {
            let (Some(code), Some(name)) = (
                row.get(columns::ISO_ALPHA2).as_text(),
                row.get(columns::ISO_NAME).as_text(),
            ) else {
                continue;
            };
            names.insert(code.to_ascii_uppercase(), name);
        }
        Ok(Self { names })
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Display name, falling back to the code itself.
    pub fn display_name(&self, code: &str) -> String {
        self.name(code).unwrap_or(code).to_string()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
