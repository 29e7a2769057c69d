//! Blocking REST clients for Jira Cloud and Jira Server/Data Center.
//!
//! The Cloud client resolves display names to Cloud identifiers, one
//! name at a time, matching what the automation schema needs; the Server
//! client fetches the id → name catalogs used to build a lookup-table
//! directory. Neither is touched by the mapper itself.

use crate::category::Category;
use crate::cloud::CloudDirectory;
use crate::error::MigrateError;
use crate::lookup::MappingSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Paged<T> {
    values: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedId {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct CloudUser {
    #[serde(rename = "accountId")]
    account_id: String,
}

#[derive(Debug, Deserialize)]
struct ServerUser {
    key: String,
    #[serde(rename = "emailAddress")]
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerField {
    id: String,
    name: String,
    #[serde(default)]
    custom: bool,
}

/// Jira Cloud REST client (API token auth)
pub struct JiraCloudClient {
    http: reqwest::blocking::Client,
    base_url: String,
    email: String,
    token: String,
    /// Priority and issue-type catalogs are small; fetched once
    catalogs: RefCell<HashMap<Category, Vec<NamedId>>>,
}

impl JiraCloudClient {
    pub fn new(base_url: &str, email: &str, token: &str) -> Result<Self, MigrateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            token: token.to_string(),
            catalogs: RefCell::new(HashMap::new()),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MigrateError> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.token))
            .query(query)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MigrateError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(response.json()?)
    }

    /// Verify credentials against the `myself` endpoint.
    pub fn test_connection(&self) -> Result<(), MigrateError> {
        let _: serde_json::Value = self.get_json("rest/api/3/myself", &[])?;
        Ok(())
    }

    /// Resolve one display name to its Cloud identifier.
    pub fn resolve_name(
        &self,
        category: Category,
        name: &str,
    ) -> Result<Option<String>, MigrateError> {
        match category {
            Category::CustomFields => {
                let page: Paged<NamedId> =
                    self.get_json("rest/api/3/field/search", &[("query", name)])?;
                Ok(page.values.into_iter().find(|f| f.name == name).map(|f| f.id))
            }
            Category::Status => {
                let page: Paged<NamedId> =
                    self.get_json("rest/api/3/statuses/search", &[("searchString", name)])?;
                Ok(page.values.into_iter().find(|s| s.name == name).map(|s| s.id))
            }
            Category::Priority => self.catalog_lookup(category, "rest/api/3/priority/search", name),
            Category::IssueType => self.catalog_lookup(category, "rest/api/3/issuetype", name),
            Category::Users => {
                let users: Vec<CloudUser> =
                    self.get_json("rest/api/3/user/search", &[("query", name)])?;
                Ok(users.into_iter().next().map(|u| u.account_id))
            }
            Category::Projects => {
                let page: Paged<ProjectRef> =
                    self.get_json("rest/api/3/project/search", &[("keys", name)])?;
                Ok(page.values.into_iter().find(|p| p.key == name).map(|p| p.id))
            }
        }
    }

    fn catalog_lookup(
        &self,
        category: Category,
        path: &str,
        name: &str,
    ) -> Result<Option<String>, MigrateError> {
        if !self.catalogs.borrow().contains_key(&category) {
            let entries = if category == Category::IssueType {
                // the issue-type endpoint returns a flat array
                self.get_json::<Vec<NamedId>>(path, &[])?
            } else {
                self.get_json::<Paged<NamedId>>(path, &[])?.values
            };
            self.catalogs.borrow_mut().insert(category, entries);
        }
        Ok(self
            .catalogs
            .borrow()
            .get(&category)
            .and_then(|entries| entries.iter().find(|e| e.name == name))
            .map(|e| e.id.clone()))
    }

    /// Resolve every name in the lookup set into a [`CloudDirectory`].
    ///
    /// `progress` is called once per name after its resolution; names
    /// absent on the Cloud side are simply not inserted.
    pub fn build_directory(
        &self,
        lookups: &MappingSet,
        mut progress: impl FnMut(Category, &str),
    ) -> Result<CloudDirectory, MigrateError> {
        use crate::cloud::CloudIndex;

        let mut directory = CloudDirectory::new();
        for category in Category::ALL {
            for (_, name) in lookups.table(category).iter() {
                // two server ids can share a name; resolve each name once
                if directory.resolve(category, name).is_none() {
                    if let Some(id) = self.resolve_name(category, name)? {
                        directory.insert(category, name, id);
                    }
                }
                progress(category, name);
            }
        }
        Ok(directory)
    }
}

/// Jira Server/Data Center REST client (basic auth), used to generate
/// the lookup-table directory.
pub struct JiraServerClient {
    http: reqwest::blocking::Client,
    base_url: String,
    username: String,
    password: String,
}

impl JiraServerClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, MigrateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MigrateError> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(query)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MigrateError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(response.json()?)
    }

    /// Fetch all server catalogs into a lookup set.
    ///
    /// The user search endpoint caps at 1000 results; larger instances
    /// should export the user table from the database instead.
    pub fn fetch_lookups(
        &self,
        mut progress: impl FnMut(Category, usize),
    ) -> Result<MappingSet, MigrateError> {
        let mut set = MappingSet::new();

        let users: Vec<ServerUser> = self.get_json(
            "rest/api/2/user/search",
            &[("username", "."), ("maxResults", "1000")],
        )?;
        for user in &users {
            let Some(email) = user.email_address.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };
            if !set.table(Category::Users).contains(&user.key) {
                set.insert(Category::Users, user.key.clone(), email.to_lowercase())?;
            }
        }
        progress(Category::Users, set.table(Category::Users).len());

        let fields: Vec<ServerField> = self.get_json("rest/api/2/field", &[])?;
        for field in fields.iter().filter(|f| f.custom) {
            set.insert(Category::CustomFields, field.id.clone(), field.name.clone())?;
        }
        progress(Category::CustomFields, set.table(Category::CustomFields).len());

        let projects: Vec<ProjectRef> = self.get_json("rest/api/2/project", &[])?;
        for project in &projects {
            set.insert(Category::Projects, project.id.clone(), project.key.clone())?;
        }
        progress(Category::Projects, set.table(Category::Projects).len());

        for (category, path) in [
            (Category::Status, "rest/api/2/status"),
            (Category::Priority, "rest/api/2/priority"),
            (Category::IssueType, "rest/api/2/issuetype"),
        ] {
            let entries: Vec<NamedId> = self.get_json(path, &[])?;
            for entry in &entries {
                set.insert(category, entry.id.clone(), entry.name.clone())?;
            }
            progress(category, set.table(category).len());
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_response_model() {
        let raw = r#"{"values": [{"id": "3", "name": "In Progress", "untracked": true}]}"#;
        let page: Paged<NamedId> = serde_json::from_str(raw).unwrap();

        assert_eq!(page.values.len(), 1);
        assert_eq!(page.values[0].id, "3");
        assert_eq!(page.values[0].name, "In Progress");
    }

    #[test]
    fn test_cloud_user_model() {
        let raw = r#"[{"accountId": "abc-123", "displayName": "Jane"}]"#;
        let users: Vec<CloudUser> = serde_json::from_str(raw).unwrap();

        assert_eq!(users[0].account_id, "abc-123");
    }

    #[test]
    fn test_server_field_model() {
        let raw = r#"[
            {"id": "summary", "name": "Summary"},
            {"id": "customfield_10001", "name": "Team", "custom": true}
        ]"#;
        let fields: Vec<ServerField> = serde_json::from_str(raw).unwrap();

        let custom: Vec<&ServerField> = fields.iter().filter(|f| f.custom).collect();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].id, "customfield_10001");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = JiraCloudClient::new("https://example.atlassian.net/", "a@b.c", "t").unwrap();
        assert_eq!(client.base_url, "https://example.atlassian.net");
    }
}
