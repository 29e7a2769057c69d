//! The identifier-mapping engine.
//!
//! Walks a parsed automation-rule export, rewrites every recognized
//! server-side identifier reference to its Cloud counterpart, and logs
//! one [`MappingRecord`] per distinct identifier encountered.
//!
//! Classification is structural: a scalar is only a candidate when it
//! sits in a recognized position (a typed `{"type": "ID", ...}` value
//! node, a known id-bearing key, or a token matching the custom-field or
//! user-key pattern inside text). Anything else is left untouched.

use crate::category::{Category, CUSTOM_FIELD_PATTERN, USER_KEY_PATTERN};
use crate::cloud::CloudIndex;
use crate::error::MigrateError;
use crate::lookup::MappingSet;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Rule states that are dropped from the output entirely
pub const DEFAULT_DISABLED_MARKERS: &[&str] = &["DISABLED"];

/// Server field names that are simply renamed on Cloud
const FIXED_TEXT: &[(&str, &str)] = &[("Customer Request Type", "Request Type")];

/// Outcome of resolving one server identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRecord {
    pub category: Category,
    pub server_id: String,
    /// Name from the lookup table; `None` when the id was not listed
    pub name: Option<String>,
    /// Cloud identifier; `None` when missing on the Cloud side
    pub cloud_id: Option<String>,
}

impl MappingRecord {
    pub fn is_missing(&self) -> bool {
        self.cloud_id.is_none()
    }
}

/// Result of converting one export
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The rewritten document, disabled rules removed
    pub document: Value,
    /// One record per distinct (category, server id) pair, in encounter order
    pub records: Vec<MappingRecord>,
    pub rules_total: usize,
    pub rules_dropped: usize,
}

impl Conversion {
    pub fn rules_kept(&self) -> usize {
        self.rules_total - self.rules_dropped
    }

    pub fn mapped_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_missing()).count()
    }

    pub fn missing_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_missing()).count()
    }
}

#[derive(Clone)]
enum Resolution {
    /// Cloud identifier found, value replaced
    Mapped(String),
    /// Name known but absent on Cloud; substituted where a name is accepted
    Fallback(String),
    /// Not in the lookup table, value left unchanged
    Unresolved,
}

#[derive(Default)]
struct State {
    records: Vec<MappingRecord>,
    resolved: HashMap<(Category, String), Resolution>,
}

/// Rewrites server identifiers in a rule export to Cloud identifiers
pub struct Mapper<'a> {
    lookups: &'a MappingSet,
    cloud: &'a dyn CloudIndex,
    disabled: Vec<String>,
    custom_field_value: Regex,
    custom_field_token: Regex,
    user_key_token: Regex,
}

impl<'a> Mapper<'a> {
    pub fn new(lookups: &'a MappingSet, cloud: &'a dyn CloudIndex) -> Self {
        Self {
            lookups,
            cloud,
            disabled: DEFAULT_DISABLED_MARKERS.iter().map(|s| s.to_string()).collect(),
            custom_field_value: Regex::new(&format!("^{CUSTOM_FIELD_PATTERN}$")).unwrap(),
            custom_field_token: Regex::new(CUSTOM_FIELD_PATTERN).unwrap(),
            user_key_token: Regex::new(USER_KEY_PATTERN).unwrap(),
        }
    }

    /// Override the rule states treated as disabled
    pub fn disabled_markers(mut self, markers: &[&str]) -> Self {
        self.disabled = markers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convert one export document.
    ///
    /// Disabled rules are removed before any identifier substitution.
    /// Fails with [`MigrateError::Format`] when the document is not an
    /// object holding a `rules` array of objects; nothing is mutated in
    /// that case.
    pub fn convert(&self, mut document: Value) -> Result<Conversion, MigrateError> {
        let rules = document
            .as_object_mut()
            .ok_or_else(|| MigrateError::Format("top level must be a JSON object".into()))?
            .get_mut("rules")
            .ok_or_else(|| MigrateError::Format("missing \"rules\" array".into()))?
            .as_array_mut()
            .ok_or_else(|| MigrateError::Format("\"rules\" must be an array".into()))?;
        if rules.iter().any(|rule| !rule.is_object()) {
            return Err(MigrateError::Format("every rule must be a JSON object".into()));
        }

        let rules_total = rules.len();
        rules.retain(|rule| !self.is_disabled(rule));
        let rules_dropped = rules_total - rules.len();

        let mut state = State::default();
        for rule in rules.iter_mut() {
            self.walk(rule, None, &mut state);
        }

        // the converted export is marked as not-yet-imported
        if let Some(top) = document.as_object_mut() {
            top.insert("cloud".into(), Value::Bool(false));
        }

        log::info!(
            "converted {} rules ({} disabled dropped), {} identifiers mapped, {} missing",
            rules_total - rules_dropped,
            rules_dropped,
            state.records.iter().filter(|r| !r.is_missing()).count(),
            state.records.iter().filter(|r| r.is_missing()).count(),
        );

        Ok(Conversion {
            document,
            records: state.records,
            rules_total,
            rules_dropped,
        })
    }

    fn is_disabled(&self, rule: &Value) -> bool {
        rule.get("state")
            .or_else(|| rule.get("status"))
            .and_then(Value::as_str)
            .is_some_and(|s| self.disabled.iter().any(|m| m == s))
    }

    fn walk(&self, node: &mut Value, ctx: Option<Category>, state: &mut State) {
        match node {
            Value::Object(map) => {
                if is_id_node(map) {
                    self.rewrite_id_node(map, ctx, state);
                    for (key, child) in map.iter_mut() {
                        if key != "value" && key != "type" {
                            self.walk(child, None, state);
                        }
                    }
                    return;
                }

                let field_ctx = map
                    .get("fieldType")
                    .or_else(|| map.get("selectedFieldType"))
                    .or_else(|| map.get("field"))
                    .and_then(Value::as_str)
                    .and_then(Category::from_field_type);

                for (key, child) in map.iter_mut() {
                    match key.as_str() {
                        "projectId" => self.rewrite_plain_id(child, Category::Projects, state),
                        "authorAccountId" | "actorAccountId" => self.rewrite_user_id(child, state),
                        "destinationStatus" | "fromStatus" | "toStatus" => {
                            self.walk(child, Some(Category::Status), state)
                        }
                        "value" | "compareValue" => self.walk(child, field_ctx.or(ctx), state),
                        _ => self.walk(child, None, state),
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, ctx, state);
                }
            }
            Value::String(text) => match ctx {
                Some(category) => self.rewrite_id_string(text, category, state),
                None => self.rewrite_text(text, state),
            },
            _ => {}
        }
    }

    /// A `{"type": "ID", "value": "..."}` node. The category comes from the
    /// value shape (custom fields) or from the position it was reached
    /// through; with neither, only an exact user-key match is accepted.
    fn rewrite_id_node(&self, map: &mut Map<String, Value>, ctx: Option<Category>, state: &mut State) {
        let Some(value) = map.get("value").and_then(Value::as_str).map(str::to_string) else {
            return;
        };

        if self.custom_field_value.is_match(&value) {
            match self.resolve(Category::CustomFields, &value, state) {
                Resolution::Mapped(id) => {
                    map.insert("value".into(), Value::String(id));
                }
                Resolution::Fallback(name) => {
                    map.insert("type".into(), Value::String("NAME".into()));
                    map.insert("value".into(), Value::String(name));
                }
                Resolution::Unresolved => {}
            }
            return;
        }

        if let Some(category) = ctx {
            if let Some(encoded) = self.rewrite_embedded_list(&value, category, state) {
                map.insert("value".into(), Value::String(encoded));
                return;
            }

            match self.resolve(category, &value, state) {
                Resolution::Mapped(id) => {
                    map.insert("value".into(), Value::String(id));
                }
                Resolution::Fallback(name) if accepts_name(category) => {
                    map.insert("type".into(), Value::String("NAME".into()));
                    map.insert("value".into(), Value::String(name));
                }
                _ => {}
            }
            return;
        }

        if self.lookups.table(Category::Users).contains(&value) {
            if let Resolution::Mapped(id) = self.resolve(Category::Users, &value, state) {
                map.insert("value".into(), Value::String(id));
            }
            return;
        }

        // not a recognized reference; the text may still embed tokens
        if let Some(Value::String(text)) = map.get_mut("value") {
            self.rewrite_text(text, state);
        }
    }

    /// A raw string in an id position (`value` under a recognized field tag)
    fn rewrite_id_string(&self, text: &mut String, category: Category, state: &mut State) {
        if let Some(encoded) = self.rewrite_embedded_list(text, category, state) {
            *text = encoded;
            return;
        }
        match self.resolve(category, text, state) {
            Resolution::Mapped(id) => *text = id,
            Resolution::Fallback(name) if accepts_name(category) => *text = name,
            _ => {}
        }
    }

    /// ONE_OF / NOT_ONE_OF comparisons carry a JSON-encoded id array; a
    /// NAME cannot be expressed per element, so unresolved ids stay in
    /// place.
    fn rewrite_embedded_list(
        &self,
        value: &str,
        category: Category,
        state: &mut State,
    ) -> Option<String> {
        let ids = parse_embedded_list(value)?;
        let rewritten: Vec<String> = ids
            .into_iter()
            .map(|id| match self.resolve(category, &id, state) {
                Resolution::Mapped(new) => new,
                _ => id,
            })
            .collect();
        Some(serde_json::to_string(&rewritten).expect("string array serialization"))
    }

    /// A raw id under a key that names its category (`projectId`)
    fn rewrite_plain_id(&self, node: &mut Value, category: Category, state: &mut State) {
        let Value::String(text) = node else { return };
        if let Resolution::Mapped(id) = self.resolve(category, text, state) {
            *text = id;
        }
    }

    /// `authorAccountId` / `actorAccountId`: a server user key. An email
    /// fallback is never valid in an account-id position.
    fn rewrite_user_id(&self, node: &mut Value, state: &mut State) {
        let Value::String(text) = node else { return };
        if self.lookups.table(Category::Users).contains(text) {
            if let Resolution::Mapped(id) = self.resolve(Category::Users, text, state) {
                *text = id;
            }
        } else {
            self.rewrite_text(text, state);
        }
    }

    /// Free text: fixed renames plus token-level user-key and custom-field
    /// substitution. Only the matched token is replaced.
    fn rewrite_text(&self, text: &mut String, state: &mut State) {
        for (from, to) in FIXED_TEXT {
            if text.contains(from) {
                *text = text.replace(from, to);
            }
        }
        if text.contains("JIRAUSER") {
            *text = self
                .user_key_token
                .replace_all(text, |caps: &regex::Captures| {
                    let key = &caps[0];
                    match self.resolve(Category::Users, key, state) {
                        Resolution::Mapped(id) => id,
                        _ => key.to_string(),
                    }
                })
                .into_owned();
        }
        if text.contains("customfield_") {
            *text = self
                .custom_field_token
                .replace_all(text, |caps: &regex::Captures| {
                    let id = &caps[0];
                    match self.resolve(Category::CustomFields, id, state) {
                        Resolution::Mapped(new) => new,
                        _ => id.to_string(),
                    }
                })
                .into_owned();
        }
    }

    /// Layered resolution: server id → name (lookup table), name → cloud id
    /// (cloud index). The first resolution of each (category, server id)
    /// pair wins and emits the single record; later encounters reuse it.
    fn resolve(&self, category: Category, server_id: &str, state: &mut State) -> Resolution {
        let key = (category, server_id.to_string());
        if let Some(resolution) = state.resolved.get(&key) {
            return resolution.clone();
        }

        let resolution = match self.lookups.table(category).name_of(server_id) {
            None => {
                state.records.push(MappingRecord {
                    category,
                    server_id: server_id.to_string(),
                    name: None,
                    cloud_id: None,
                });
                Resolution::Unresolved
            }
            Some(name) => match self.cloud.resolve(category, name) {
                Some(cloud_id) => {
                    state.records.push(MappingRecord {
                        category,
                        server_id: server_id.to_string(),
                        name: Some(name.to_string()),
                        cloud_id: Some(cloud_id.clone()),
                    });
                    Resolution::Mapped(cloud_id)
                }
                None => {
                    state.records.push(MappingRecord {
                        category,
                        server_id: server_id.to_string(),
                        name: Some(name.to_string()),
                        cloud_id: None,
                    });
                    Resolution::Fallback(name.to_string())
                }
            },
        };
        state.resolved.insert(key, resolution.clone());
        resolution
    }
}

fn is_id_node(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("ID")
        && map.get("value").map(Value::is_string).unwrap_or(false)
}

/// Some `compareValue` nodes hold a JSON-encoded string array, e.g.
/// `"[\"10001\",\"10002\"]"`.
fn parse_embedded_list(value: &str) -> Option<Vec<String>> {
    if !value.trim_start().starts_with('[') {
        return None;
    }
    serde_json::from_str(value).ok()
}

/// Positions typed as ID that also accept a NAME reference on Cloud
fn accepts_name(category: Category) -> bool {
    matches!(
        category,
        Category::CustomFields | Category::Status | Category::Priority | Category::IssueType
    )
}
