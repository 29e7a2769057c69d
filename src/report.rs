//! Mapping report: a CSV file for auditing plus a terminal summary.

use crate::category::Category;
use crate::error::MigrateError;
use crate::mapper::MappingRecord;
use colored::Colorize;
use csv::WriterBuilder;
use std::io::Write;
use std::path::Path;

/// Renders the mapping log produced by a conversion
pub struct MappingReport<'a> {
    records: &'a [MappingRecord],
}

impl<'a> MappingReport<'a> {
    pub fn new(records: &'a [MappingRecord]) -> Self {
        Self { records }
    }

    pub fn missing_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_missing()).count()
    }

    /// Write the report as CSV: Type, Name, Server ID, Cloud ID, Missing?
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), MigrateError> {
        let mut csv = WriterBuilder::new().from_writer(writer);
        csv.write_record(["Type", "Name", "Server ID", "Cloud ID", "Missing?"])?;
        for record in self.records {
            csv.write_record([
                record.category.as_str(),
                record.name.as_deref().unwrap_or(""),
                record.server_id.as_str(),
                record.cloud_id.as_deref().unwrap_or(""),
                if record.is_missing() { "YES" } else { "NO" },
            ])?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), MigrateError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    /// Per-category summary with missing entries flagged
    pub fn print_summary(&self) {
        println!();
        println!("Mapping summary");
        println!("───────────────────────────────────────────────");
        for category in Category::ALL {
            let mapped = self
                .records
                .iter()
                .filter(|r| r.category == category && !r.is_missing())
                .count();
            let missing = self
                .records
                .iter()
                .filter(|r| r.category == category && r.is_missing())
                .count();
            if mapped + missing == 0 {
                continue;
            }
            let missing_note = if missing > 0 {
                format!("{missing} missing").red().to_string()
            } else {
                "all mapped".green().to_string()
            };
            println!("  {:<14} {:>4} mapped   {}", category.as_str(), mapped, missing_note);
        }

        let missing: Vec<&MappingRecord> =
            self.records.iter().filter(|r| r.is_missing()).collect();
        if !missing.is_empty() {
            println!();
            println!("{}", "Missing on Cloud:".red().bold());
            for record in missing {
                match &record.name {
                    Some(name) => println!(
                        "  {} {} ({})",
                        "✗".red(),
                        name,
                        record.server_id
                    ),
                    None => println!(
                        "  {} {} (not in lookup table, {})",
                        "✗".red(),
                        record.server_id,
                        record.category
                    ),
                }
            }
        }
    }
}
