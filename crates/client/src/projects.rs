//! Upstream project listing for the flag view.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::types::{Project, ProjectFlags};
use configs::ClientConfig;
use serde_json::Value;
use tracing::{debug, warn};

use crate::bridge::{BridgeError, HostBridge};

pub const PROJECTS_PATH: &str = "admin/projects";
pub const PROJECT_QUERY_FIELDS: &str =
    "id,name,shortName,description,createdBy(login,name,id),leader(login,name,id)";
pub const DEFAULT_PROJECT_LIMIT: u32 = 20;

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectsState {
    pub projects: Vec<Project>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for ProjectsState {
    fn default() -> Self {
        Self { projects: Vec::new(), loading: true, error: None }
    }
}

#[derive(Clone)]
pub struct ProjectsClient {
    bridge: Arc<dyn HostBridge>,
    limit: u32,
    state: Arc<Mutex<ProjectsState>>,
}

impl ProjectsClient {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self::with_limit(bridge, DEFAULT_PROJECT_LIMIT)
    }

    pub fn with_limit(bridge: Arc<dyn HostBridge>, limit: u32) -> Self {
        Self { bridge, limit, state: Arc::new(Mutex::new(ProjectsState::default())) }
    }

    /// Page size from `client.project_limit`.
    pub fn from_config(bridge: Arc<dyn HostBridge>, cfg: &ClientConfig) -> Self {
        Self::with_limit(bridge, cfg.project_limit)
    }

    fn lock(&self) -> MutexGuard<'_, ProjectsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ProjectsState {
        self.lock().clone()
    }

    /// Load the first `limit` projects. Unlike the flag map, a failed load
    /// clears the list.
    pub async fn fetch_projects(&self) -> Result<Vec<Project>, BridgeError> {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let query = vec![
            ("fields".to_string(), PROJECT_QUERY_FIELDS.to_string()),
            ("$top".to_string(), self.limit.to_string()),
        ];
        let result = self.bridge.call_upstream(PROJECTS_PATH, query).await;

        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(body) => {
                let projects = decode_projects(body);
                debug!(count = projects.len(), "projects fetched");
                state.projects = projects.clone();
                Ok(projects)
            }
            Err(e) => {
                warn!(error = %e, "projects fetch failed");
                state.projects.clear();
                state.error = Some(format!("Failed to load projects: {e}"));
                Err(e)
            }
        }
    }
}

/// Entries that fail to decode are skipped; a non-array body is empty.
fn decode_projects(body: Value) -> Vec<Project> {
    let Value::Array(items) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Project>(item) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "skipping malformed project entry");
                None
            }
        })
        .collect()
}

/// One line of the flag view.
#[derive(Debug, PartialEq, Eq)]
pub struct ProjectRow<'a> {
    pub project: &'a Project,
    pub enabled: bool,
}

/// Pair each listed project with its flag. Flags for projects that are not
/// listed are ignored.
pub fn project_rows<'a>(projects: &'a [Project], flags: &ProjectFlags) -> Vec<ProjectRow<'a>> {
    projects
        .iter()
        .map(|project| ProjectRow { project, enabled: flags.is_enabled(&project.id) })
        .collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::bridge::{BackendRequest, Query};

    struct UpstreamStub {
        response: Result<Value, BridgeError>,
        seen: Mutex<Vec<(String, Query)>>,
    }

    #[async_trait]
    impl HostBridge for UpstreamStub {
        async fn call_backend(&self, _path: &str, _request: BackendRequest) -> Result<Value, BridgeError> {
            unreachable!("projects come from upstream")
        }

        async fn call_upstream(&self, path: &str, query: Query) -> Result<Value, BridgeError> {
            self.seen.lock().unwrap().push((path.to_string(), query));
            self.response.clone()
        }
    }

    fn stub(response: Result<Value, BridgeError>) -> Arc<UpstreamStub> {
        Arc::new(UpstreamStub { response, seen: Mutex::new(Vec::new()) })
    }

    fn project(id: &str) -> Project {
        serde_json::from_value(json!({"id": id, "name": id, "shortName": id})).unwrap()
    }

    #[tokio::test]
    async fn requests_fields_and_limit() -> anyhow::Result<()> {
        let bridge = stub(Ok(json!([{"id": "0-1", "name": "Demo", "shortName": "DEMO"}])));
        let client = ProjectsClient::with_limit(bridge.clone(), 5);

        let projects = client.fetch_projects().await?;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].short_name, "DEMO");

        let seen = bridge.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "admin/projects");
        assert_eq!(
            seen[0].1,
            vec![
                ("fields".to_string(), PROJECT_QUERY_FIELDS.to_string()),
                ("$top".to_string(), "5".to_string()),
            ]
        );
        assert!(!client.snapshot().loading);
        Ok(())
    }

    #[tokio::test]
    async fn limit_comes_from_client_config() -> anyhow::Result<()> {
        let mut cfg = configs::parse("[client]\nproject_limit = 7\n")?;
        cfg.normalize_and_validate()?;
        let bridge = stub(Ok(json!([])));
        let client = ProjectsClient::from_config(bridge.clone(), &cfg.client);

        client.fetch_projects().await?;
        let seen = bridge.seen.lock().unwrap().clone();
        assert_eq!(seen[0].1[1], ("$top".to_string(), "7".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn non_array_body_is_empty_and_bad_entries_skipped() -> anyhow::Result<()> {
        let client = ProjectsClient::new(stub(Ok(json!({"error": "weird"}))));
        assert!(client.fetch_projects().await?.is_empty());

        let client = ProjectsClient::new(stub(Ok(json!([{"id": "0-1"}, {"name": "no id"}]))));
        let projects = client.fetch_projects().await?;
        assert_eq!(projects.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["0-1"]);
        Ok(())
    }

    #[tokio::test]
    async fn failure_clears_list_and_sets_error() {
        let client = ProjectsClient::new(stub(Err(BridgeError::Http { status: 403, message: "Forbidden".into() })));
        assert!(client.fetch_projects().await.is_err());
        let state = client.snapshot();
        assert!(state.projects.is_empty());
        assert_eq!(state.error.as_deref(), Some("Failed to load projects: HTTP 403: Forbidden"));
    }

    #[test]
    fn rows_default_to_disabled() {
        let projects = vec![project("A"), project("B")];
        let flags = ProjectFlags::from([("B", true), ("GONE", true)]);
        let rows = project_rows(&projects, &flags);
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].enabled);
        assert!(rows[1].enabled);
        assert_eq!(rows[1].project.id, "B");
    }
}
