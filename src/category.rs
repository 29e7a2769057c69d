//! Identifier categories handled by the mapper.
//!
//! Each category corresponds to one sheet of the lookup spreadsheet the
//! original Server/DC export tooling produces: server identifier in the
//! first column, human-readable name in the second.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern matching a custom field reference, e.g. `customfield_10001`.
pub const CUSTOM_FIELD_PATTERN: &str = r"customfield_\d+";

/// Pattern matching a Server/DC user key, e.g. `JIRAUSER12345`.
pub const USER_KEY_PATTERN: &str = r"JIRAUSER\d+";

/// A category of mappable identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Users,
    CustomFields,
    Projects,
    Status,
    Priority,
    IssueType,
}

impl Category {
    /// All categories, in report order
    pub const ALL: [Category; 6] = [
        Category::Users,
        Category::CustomFields,
        Category::Projects,
        Category::Status,
        Category::Priority,
        Category::IssueType,
    ];

    /// Canonical name, used for lookup file names and report rows
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Users => "users",
            Category::CustomFields => "customFields",
            Category::Projects => "projects",
            Category::Status => "status",
            Category::Priority => "priority",
            Category::IssueType => "issuetype",
        }
    }

    /// Parse a canonical category name
    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str().eq_ignore_ascii_case(s))
    }

    /// Category referenced by a `fieldType`/`selectedFieldType` tag in a
    /// rule body. Only id-bearing field types are recognized.
    pub fn from_field_type(s: &str) -> Option<Category> {
        match s {
            "status" => Some(Category::Status),
            "priority" => Some(Category::Priority),
            "issuetype" => Some(Category::IssueType),
            "project" => Some(Category::Projects),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for cat in Category::ALL {
            assert_eq!(Category::parse(cat.as_str()), Some(cat));
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Category::parse("customfields"), Some(Category::CustomFields));
        assert_eq!(Category::parse("ISSUETYPE"), Some(Category::IssueType));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Category::parse("resolutions"), None);
    }

    #[test]
    fn test_from_field_type() {
        assert_eq!(Category::from_field_type("status"), Some(Category::Status));
        assert_eq!(Category::from_field_type("project"), Some(Category::Projects));
        assert_eq!(Category::from_field_type("summary"), None);
    }
}
