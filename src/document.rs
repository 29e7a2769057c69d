//! Reading, writing and splitting rule-export files.

use crate::error::MigrateError;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Load a rule export and validate its top-level shape.
pub fn load_export(path: &Path) -> Result<Value, MigrateError> {
    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    validate_shape(&document)?;
    Ok(document)
}

/// An export is an object holding a `rules` array of objects.
pub fn validate_shape(document: &Value) -> Result<(), MigrateError> {
    let rules = document
        .as_object()
        .ok_or_else(|| MigrateError::Format("top level must be a JSON object".into()))?
        .get("rules")
        .ok_or_else(|| MigrateError::Format("missing \"rules\" array".into()))?
        .as_array()
        .ok_or_else(|| MigrateError::Format("\"rules\" must be an array".into()))?;
    if rules.iter().any(|rule| !rule.is_object()) {
        return Err(MigrateError::Format("every rule must be a JSON object".into()));
    }
    Ok(())
}

pub fn write_compact(path: &Path, document: &Value) -> Result<(), MigrateError> {
    fs::write(path, serde_json::to_string(document)?)?;
    Ok(())
}

pub fn write_pretty(path: &Path, document: &Value) -> Result<(), MigrateError> {
    fs::write(path, serde_json::to_string_pretty(document)?)?;
    Ok(())
}

/// Find rule exports in a directory: `.json` files whose top level holds
/// a `rules` key. Non-JSON and unparsable files are skipped.
pub fn scan_exports(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let mut exports = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(document) if document.get("rules").is_some() => exports.push(path.to_path_buf()),
            _ => log::debug!("skipping {}: no rules key", path.display()),
        }
    }
    exports.sort();
    Ok(exports)
}

/// Split a converted export into one document per rule.
///
/// Rule names gain an ordinal prefix so the import order stays visible;
/// file names follow `<ordinal>-<rule id>-modified-for-cloud.json`.
pub fn split_rules(document: &Value) -> Result<Vec<(String, Value)>, MigrateError> {
    validate_shape(document)?;
    let rules = document["rules"].as_array().expect("validated above");

    let mut parts = Vec::with_capacity(rules.len());
    for (ordinal, rule) in rules.iter().enumerate() {
        let ordinal = ordinal + 1;
        let mut rule = rule.clone();
        let name = rule.get("name").and_then(Value::as_str).unwrap_or("unnamed").to_string();
        rule["name"] = json!(format!("{ordinal} - {name}"));

        let id = match rule.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "unknown".to_string(),
        };
        let file_name = format!("{ordinal}-{id}-modified-for-cloud.json");
        parts.push((file_name, json!({"rules": [rule], "cloud": false})));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_load_export_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        fs::write(&path, r#"{"rules": [{"id": 1, "state": "ENABLED"}]}"#).unwrap();

        let document = load_export(&path).unwrap();
        assert_eq!(document["rules"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_load_export_rejects_bad_shapes() {
        let dir = tempdir().unwrap();
        for (name, content) in [
            ("a.json", "[1,2]"),
            ("b.json", r#"{"cloud": true}"#),
            ("c.json", r#"{"rules": {"nested": true}}"#),
            ("d.json", r#"{"rules": ["flat"]}"#),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            assert!(
                matches!(load_export(&path), Err(MigrateError::Format(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_scan_exports() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rules.json"), r#"{"rules": []}"#).unwrap();
        fs::write(dir.path().join("other.json"), r#"{"users": []}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "rules").unwrap();

        let exports = scan_exports(dir.path()).unwrap();

        assert_eq!(exports.len(), 1);
        assert!(exports[0].ends_with("rules.json"));
    }

    #[test]
    fn test_split_rules() {
        let document = json!({"rules": [
            {"id": 42, "name": "Escalate", "state": "ENABLED"},
            {"id": "ab-7", "name": "Close stale", "state": "ENABLED"},
        ], "cloud": false});

        let parts = split_rules(&document).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "1-42-modified-for-cloud.json");
        assert_eq!(parts[0].1["rules"][0]["name"], json!("1 - Escalate"));
        assert_eq!(parts[1].0, "2-ab-7-modified-for-cloud.json");
        assert_eq!(parts[1].1["cloud"], json!(false));
    }

    #[test]
    fn test_write_roundtrip() {
        let dir = tempdir().unwrap();
        let document = json!({"rules": [{"id": 1}], "cloud": false});

        let pretty = dir.path().join("out.json");
        write_pretty(&pretty, &document).unwrap();
        let raw = fs::read_to_string(&pretty).unwrap();
        assert!(raw.contains('\n'));
        assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), document);

        let compact = dir.path().join("compact.json");
        write_compact(&compact, &document).unwrap();
        let raw = fs::read_to_string(&compact).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), document);
    }
}
