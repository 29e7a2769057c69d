//! Server-side lookup tables: server identifier → human-readable name.
//!
//! One table per [`Category`], loaded from a directory of CSV files named
//! after the category (`users.csv`, `customFields.csv`, ...). The first
//! column holds the server identifier, the second the name; a header row
//! is expected and skipped. Tables are read-only once loaded.

use crate::category::Category;
use crate::error::MigrateError;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// An ordered server-id → name mapping for one category
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    ids: Vec<String>,
    names: HashMap<String, String>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Duplicate server ids are rejected.
    pub fn insert(
        &mut self,
        category: Category,
        id: String,
        name: String,
    ) -> Result<(), MigrateError> {
        if self.names.contains_key(&id) {
            return Err(MigrateError::DuplicateLookupKey { category, id });
        }
        self.ids.push(id.clone());
        self.names.insert(id, name);
        Ok(())
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.names.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids
            .iter()
            .map(|id| (id.as_str(), self.names[id].as_str()))
    }
}

/// One lookup table per category
#[derive(Debug, Clone)]
pub struct MappingSet {
    tables: HashMap<Category, LookupTable>,
}

impl Default for MappingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingSet {
    pub fn new() -> Self {
        let tables = Category::ALL
            .into_iter()
            .map(|c| (c, LookupTable::new()))
            .collect();
        Self { tables }
    }

    /// Load all tables from a directory of `<category>.csv` files.
    /// Missing files yield empty tables; the category is simply unmapped.
    pub fn load_dir(dir: &Path) -> Result<Self, MigrateError> {
        let mut set = MappingSet::new();
        for category in Category::ALL {
            let path = dir.join(format!("{}.csv", category));
            if !path.is_file() {
                continue;
            }
            let file = File::open(&path)?;
            let mut reader = ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(BufReader::new(file));
            for record in reader.records() {
                let record = record?;
                let id = record.get(0).unwrap_or("").to_string();
                let name = record.get(1).unwrap_or("").to_string();
                if id.is_empty() || name.is_empty() {
                    continue;
                }
                set.insert(category, id, name)?;
            }
            log::debug!(
                "loaded {} {} entries from {}",
                set.table(category).len(),
                category,
                path.display()
            );
        }
        Ok(set)
    }

    /// Write all non-empty tables as `<category>.csv` files under `dir`.
    pub fn save_dir(&self, dir: &Path) -> Result<(), MigrateError> {
        fs::create_dir_all(dir)?;
        for category in Category::ALL {
            let table = self.table(category);
            if table.is_empty() {
                continue;
            }
            let path = dir.join(format!("{}.csv", category));
            let mut writer = WriterBuilder::new().from_path(&path)?;
            writer.write_record(["server_id", "name"])?;
            for (id, name) in table.iter() {
                writer.write_record([id, name])?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    /// Insert one row, normalizing the server id for its category.
    ///
    /// Custom field ids appear in spreadsheets either as the bare numeric
    /// suffix (`10001`) or in full (`customfield_10001`); both normalize
    /// to the full form the export files use.
    pub fn insert(
        &mut self,
        category: Category,
        id: String,
        name: String,
    ) -> Result<(), MigrateError> {
        let id = if category == Category::CustomFields && id.chars().all(|c| c.is_ascii_digit()) {
            format!("customfield_{id}")
        } else {
            id
        };
        self.tables
            .get_mut(&category)
            .expect("all categories present")
            .insert(category, id, name)
    }

    pub fn table(&self, category: Category) -> &LookupTable {
        &self.tables[&category]
    }

    /// Total entries across all categories
    pub fn len(&self) -> usize {
        self.tables.values().map(LookupTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_lookup() {
        let mut set = MappingSet::new();
        set.insert(Category::Status, "10001".into(), "In Progress".into())
            .unwrap();

        assert_eq!(set.table(Category::Status).name_of("10001"), Some("In Progress"));
        assert_eq!(set.table(Category::Status).name_of("10002"), None);
        assert!(set.table(Category::Priority).is_empty());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut set = MappingSet::new();
        set.insert(Category::Users, "JIRAUSER1".into(), "a@example.com".into())
            .unwrap();
        let err = set
            .insert(Category::Users, "JIRAUSER1".into(), "b@example.com".into())
            .unwrap_err();

        assert!(matches!(err, MigrateError::DuplicateLookupKey { .. }));
    }

    #[test]
    fn test_custom_field_id_normalized() {
        let mut set = MappingSet::new();
        set.insert(Category::CustomFields, "10001".into(), "Team".into())
            .unwrap();
        set.insert(Category::CustomFields, "customfield_10002".into(), "Area".into())
            .unwrap();

        let table = set.table(Category::CustomFields);
        assert_eq!(table.name_of("customfield_10001"), Some("Team"));
        assert_eq!(table.name_of("customfield_10002"), Some("Area"));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempdir().unwrap();
        let mut f = File::create(dir.path().join("status.csv")).unwrap();
        writeln!(f, "id,pname").unwrap();
        writeln!(f, "10001,In Progress").unwrap();
        writeln!(f, "10002, Done ").unwrap();

        let set = MappingSet::load_dir(dir.path()).unwrap();

        let table = set.table(Category::Status);
        assert_eq!(table.len(), 2);
        assert_eq!(table.name_of("10001"), Some("In Progress"));
        // fields are trimmed
        assert_eq!(table.name_of("10002"), Some("Done"));
        // files for other categories are simply absent
        assert!(set.table(Category::Users).is_empty());
    }

    #[test]
    fn test_load_dir_duplicate_rejected() {
        let dir = tempdir().unwrap();
        let mut f = File::create(dir.path().join("priority.csv")).unwrap();
        writeln!(f, "id,pname").unwrap();
        writeln!(f, "1,High").unwrap();
        writeln!(f, "1,Highest").unwrap();

        assert!(MappingSet::load_dir(dir.path()).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut set = MappingSet::new();
        set.insert(Category::Projects, "10000".into(), "OPS".into())
            .unwrap();
        set.save_dir(dir.path()).unwrap();

        let reloaded = MappingSet::load_dir(dir.path()).unwrap();
        assert_eq!(reloaded.table(Category::Projects).name_of("10000"), Some("OPS"));
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let mut table = LookupTable::new();
        for id in ["3", "1", "2"] {
            table
                .insert(Category::Status, id.into(), format!("name-{id}"))
                .unwrap();
        }
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }
}
