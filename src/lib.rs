//! Migrate Jira Server/Data Center automation rules to Jira Cloud
//!
//! Server exports reference everything by server-side identifiers:
//! custom field ids, status ids, priority ids, issue-type ids, project
//! ids and user keys. None of them survive the move to Cloud. This crate
//! rewrites an exported rule file so every recognized reference carries
//! its Cloud identifier instead, drops disabled rules, and records one
//! mapping row per identifier for the audit report.
//!
//! Resolution is layered: a lookup-table directory maps each server id
//! to its display name, and a [`CloudIndex`] maps that name to the Cloud
//! identifier. Names with no Cloud counterpart fall back to a NAME
//! reference where the rule schema accepts one, and are flagged as
//! missing in the report either way.
//!
//! # Example
//!
//! ```
//! use jira_migrate::{Category, CloudDirectory, Mapper, MappingSet};
//! use serde_json::json;
//!
//! let mut lookups = MappingSet::new();
//! lookups.insert(Category::Status, "10001".into(), "In Progress".into()).unwrap();
//!
//! let mut cloud = CloudDirectory::new();
//! cloud.insert(Category::Status, "In Progress", "3");
//!
//! let export = json!({"rules": [
//!     {"id": 1, "state": "DISABLED"},
//!     {"id": 2, "state": "ENABLED", "conditions": [{"field": "status", "value": "10001"}]},
//! ]});
//!
//! let conversion = Mapper::new(&lookups, &cloud).convert(export).unwrap();
//!
//! // the disabled rule is gone and the status id is now the Cloud one
//! assert_eq!(conversion.document["rules"][0]["conditions"][0]["value"], json!("3"));
//! assert_eq!(conversion.records.len(), 1);
//! ```

pub mod category;
pub mod client;
pub mod cloud;
pub mod document;
pub mod error;
pub mod lookup;
pub mod mapper;
pub mod report;

// Re-export main types
pub use category::Category;
pub use client::{JiraCloudClient, JiraServerClient};
pub use cloud::{CloudDirectory, CloudIndex};
pub use error::MigrateError;
pub use lookup::{LookupTable, MappingSet};
pub use mapper::{Conversion, Mapper, MappingRecord, DEFAULT_DISABLED_MARKERS};
pub use report::MappingReport;
