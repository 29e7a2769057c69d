//! Cloud-side name resolution: display name → Cloud identifier.
//!
//! The mapper only needs a synchronous lookup; where the directory comes
//! from (a CSV export or the live Jira Cloud REST API, see
//! [`crate::client`]) is up to the caller.

use crate::category::Category;
use crate::error::MigrateError;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Resolves a display name to its Cloud identifier for a category
pub trait CloudIndex {
    fn resolve(&self, category: Category, name: &str) -> Option<String>;
}

/// In-memory [`CloudIndex`]
#[derive(Debug, Clone, Default)]
pub struct CloudDirectory {
    entries: HashMap<(Category, String), String>,
}

impl CloudDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, name: impl Into<String>, id: impl Into<String>) {
        self.entries.insert((category, name.into()), id.into());
    }

    /// Load from a CSV file with columns (category, name, cloud id) and a
    /// header row. Unknown category names are rejected.
    pub fn load(path: &Path) -> Result<Self, MigrateError> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let mut directory = CloudDirectory::new();
        for record in reader.records() {
            let record = record?;
            let category = record.get(0).unwrap_or("");
            let name = record.get(1).unwrap_or("");
            let id = record.get(2).unwrap_or("");
            if category.is_empty() {
                continue;
            }
            let category = Category::parse(category)
                .ok_or_else(|| MigrateError::UnknownCategory(category.to_string()))?;
            if name.is_empty() || id.is_empty() {
                continue;
            }
            directory.insert(category, name, id);
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CloudIndex for CloudDirectory {
    fn resolve(&self, category: Category, name: &str) -> Option<String> {
        self.entries.get(&(category, name.to_string())).cloned()
    }
}
