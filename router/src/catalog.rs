//! Agent catalog: YAML model, loader, and validation.
//!
//! The catalog is an immutable value once loaded; hot reload builds a fresh
//! one and swaps it together with the semantic index. Handles are normalized
//! to lowercase at load so `@mention` lookup is case-insensitive.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directories a config path may resolve under. `/tmp` is included for
/// tests; orchestrator mounts land under `/config`.
pub const ALLOWED_CONFIG_DIRS: [&str; 5] = ["/config", "/app/config", "/tmp", "config", "."];

/// Protocol spoken by a backend agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    #[serde(rename = "a2a")]
    A2a,
    #[serde(rename = "ag-ui")]
    AgUi,
}

impl Protocol {
    /// Wire/log name of the protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::A2a => "a2a",
            Protocol::AgUi => "ag-ui",
        }
    }
}

/// Sticky session policy for the whole catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionPolicy {
    #[serde(default = "default_true")]
    pub sticky_enabled: bool,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default = "default_drift_threshold")]
    pub topic_drift_threshold: f32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        SessionPolicy {
            sticky_enabled: true,
            timeout_minutes: default_timeout_minutes(),
            topic_drift_threshold: default_drift_threshold(),
        }
    }
}

/// Routing knobs for one agent: priority (lower is stronger), match
/// threshold, and example utterances for the semantic index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// One configured backend agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    /// Display name, surfaced to clients as `displayName` on RUN_STARTED.
    pub name: String,
    /// `@mention` handles; the first is the primary one.
    pub handles: Vec<String>,
    pub url: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub routing: Option<RoutingConfig>,
    #[serde(default)]
    pub description: String,
}

impl Agent {
    /// The agent's primary handle (handles are validated non-empty).
    pub fn primary_handle(&self) -> &str {
        self.handles.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultAgent {
    pub id: String,
}

/// The whole agent catalog as loaded from YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub session: SessionPolicy,
    pub default_agent: DefaultAgent,
    pub agents: Vec<Agent>,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("configuration path {path:?} is outside allowed directories {allowed:?}")]
    PathOutsideAllowed { path: PathBuf, allowed: Vec<String> },
    #[error("configuration file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("empty configuration file: {0:?}")]
    Empty(PathBuf),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Catalog {
    /// Finds an agent by id; first match in catalog order wins.
    pub fn agent_by_id(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Finds an agent by handle, case-insensitively; first agent in catalog
    /// order whose handle list contains the lowercased handle wins.
    pub fn agent_by_handle(&self, handle: &str) -> Option<&Agent> {
        let handle = handle.to_lowercase();
        self.agents
            .iter()
            .find(|a| a.handles.iter().any(|h| h == &handle))
    }

    /// The default agent. Validation guarantees it resolves.
    pub fn default_agent(&self) -> &Agent {
        self.agent_by_id(&self.default_agent.id)
            .unwrap_or(&self.agents[0])
    }

    /// Whether the given agent is the configured default.
    pub fn is_default_agent(&self, agent: &Agent) -> bool {
        agent.id == self.default_agent.id
    }

    fn normalize(&mut self) {
        for agent in &mut self.agents {
            for handle in &mut agent.handles {
                *handle = handle.to_lowercase();
            }
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.agents.is_empty() {
            return Err(CatalogError::Validation("agents must not be empty".into()));
        }
        if self.session.timeout_minutes < 1 {
            return Err(CatalogError::Validation(
                "session.timeout_minutes must be >= 1".into(),
            ));
        }
        check_unit_interval(
            "session.topic_drift_threshold",
            self.session.topic_drift_threshold,
        )?;
        for agent in &self.agents {
            let ctx = if agent.id.is_empty() { "<missing id>" } else { &agent.id };
            check_len("agent.id", ctx, &agent.id, 1, 100)?;
            check_len("agent.name", ctx, &agent.name, 0, 200)?;
            check_len("agent.description", ctx, &agent.description, 0, 1000)?;
            if agent.handles.is_empty() || agent.handles.len() > 10 {
                return Err(CatalogError::Validation(format!(
                    "agent {ctx}: handles must contain 1..=10 entries"
                )));
            }
            for handle in &agent.handles {
                check_len("agent.handles[]", ctx, handle, 1, 50)?;
            }
            let url = url::Url::parse(&agent.url).map_err(|e| {
                CatalogError::Validation(format!("agent {ctx}: invalid url: {e}"))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(CatalogError::Validation(format!(
                    "agent {ctx}: url must be http or https"
                )));
            }
            if let Some(routing) = &agent.routing {
                if routing.priority < 1 {
                    return Err(CatalogError::Validation(format!(
                        "agent {ctx}: routing.priority must be >= 1"
                    )));
                }
                check_unit_interval("routing.threshold", routing.threshold)?;
                if routing.examples.len() > 100 {
                    return Err(CatalogError::Validation(format!(
                        "agent {ctx}: routing.examples exceed 100 entries"
                    )));
                }
                for example in &routing.examples {
                    check_len("routing.examples[]", ctx, example, 0, 500)?;
                }
            }
        }
        let default_id = &self.default_agent.id;
        if self.agent_by_id(default_id).is_none() {
            let ids: Vec<&str> = self.agents.iter().map(|a| a.id.as_str()).collect();
            return Err(CatalogError::Validation(format!(
                "default_agent.id '{default_id}' not found in agents. Available agent IDs: {ids:?}"
            )));
        }
        Ok(())
    }
}

fn check_len(
    field: &str,
    agent: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), CatalogError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(CatalogError::Validation(format!(
            "agent {agent}: {field} length must be {min}..={max} characters"
        )));
    }
    Ok(())
}

fn check_unit_interval(field: &str, value: f32) -> Result<(), CatalogError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CatalogError::Validation(format!(
            "{field} must be in [0, 1]"
        )));
    }
    Ok(())
}

/// Lexically normalizes a path against the current directory: makes it
/// absolute and resolves `.`/`..` components without touching the
/// filesystem, so escape checks also apply to paths that do not exist yet.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().unwrap_or_else(|_| PathBuf::from("/")).join(path)
    };
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Validates that `path` sits under one of the allowed base directories and
/// returns its normalized form.
fn validate_config_path(path: &Path) -> Result<PathBuf, CatalogError> {
    let resolved = normalize_path(path);
    for allowed in ALLOWED_CONFIG_DIRS {
        let base = normalize_path(Path::new(allowed));
        if resolved.starts_with(&base) {
            return Ok(resolved);
        }
    }
    Err(CatalogError::PathOutsideAllowed {
        path: resolved,
        allowed: ALLOWED_CONFIG_DIRS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Loads and validates the agent catalog from a YAML file.
///
/// Fails with [`CatalogError`] on path escape, missing file, unreadable
/// file, YAML errors, an empty document, or validation failure. On success
/// the agent roster is logged at info.
pub fn load_catalog(config_path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let path = validate_config_path(config_path.as_ref())?;
    if !path.exists() {
        return Err(CatalogError::NotFound(path));
    }
    let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Read {
        path: path.clone(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Err(CatalogError::Empty(path));
    }
    let mut catalog: Catalog =
        serde_yaml::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.clone(),
            source,
        })?;
    catalog.normalize();
    catalog.validate()?;
    tracing::info!(
        "loaded configuration with {} agents from {}",
        catalog.agents.len(),
        path.display()
    );
    for agent in &catalog.agents {
        tracing::info!(
            "  - {} (@{}) via {}",
            agent.name,
            agent.handles.join(", @"),
            agent.protocol.as_str()
        );
    }
    Ok(catalog)
}

fn default_true() -> bool {
    true
}

fn default_timeout_minutes() -> u64 {
    30
}

fn default_drift_threshold() -> f32 {
    0.5
}

fn default_priority() -> u32 {
    1
}

fn default_threshold() -> f32 {
    0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BASIC: &str = r#"
session:
  sticky_enabled: true
  timeout_minutes: 30
  topic_drift_threshold: 0.5
default_agent:
  id: general-agent
agents:
  - id: general-agent
    name: General Assistant
    handles: [General, assistant]
    url: http://localhost:8001
    protocol: a2a
    description: General purpose assistant
  - id: metrics-agent
    name: Metrics Agent
    handles: [metrics]
    url: http://localhost:8002
    protocol: ag-ui
    routing:
      priority: 1
      threshold: 0.6
      examples:
        - Show me CPU usage
        - Query prometheus metrics
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.yaml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    /// **Scenario**: a valid catalog loads, handles are lowercased, and the
    /// default agent resolves.
    #[test]
    fn loads_and_normalizes_handles() {
        let (_dir, path) = write_config(BASIC);
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.agents.len(), 2);
        assert_eq!(catalog.agents[0].handles, vec!["general", "assistant"]);
        assert_eq!(catalog.default_agent().id, "general-agent");
        assert!(catalog.is_default_agent(catalog.default_agent()));
    }

    /// **Scenario**: handle lookup is case-insensitive and idempotent across
    /// casings; id lookup is exact.
    #[test]
    fn handle_lookup_case_insensitive() {
        let (_dir, path) = write_config(BASIC);
        let catalog = load_catalog(&path).unwrap();
        let by_upper = catalog.agent_by_handle("METRICS").map(|a| a.id.clone());
        let by_lower = catalog.agent_by_handle("metrics").map(|a| a.id.clone());
        assert_eq!(by_upper, by_lower);
        assert_eq!(by_upper.as_deref(), Some("metrics-agent"));
        assert!(catalog.agent_by_id("metrics-agent").is_some());
        assert!(catalog.agent_by_id("METRICS-AGENT").is_none());
    }

    /// **Scenario**: duplicate handles are accepted; the first agent in
    /// catalog order wins.
    #[test]
    fn duplicate_handles_first_match_wins() {
        let config = r#"
default_agent:
  id: a
agents:
  - id: a
    name: First
    handles: [shared]
    url: http://localhost:1
  - id: b
    name: Second
    handles: [shared]
    url: http://localhost:2
"#;
        let (_dir, path) = write_config(config);
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.agent_by_handle("shared").unwrap().id, "a");
    }

    /// **Scenario**: a dangling default_agent.id fails validation with the
    /// available ids in the message.
    #[test]
    fn missing_default_agent_rejected() {
        let config = r#"
default_agent:
  id: nope
agents:
  - id: a
    name: A
    handles: [a]
    url: http://localhost:1
"#;
        let (_dir, path) = write_config(config);
        let err = load_catalog(&path).unwrap_err();
        match err {
            CatalogError::Validation(msg) => {
                assert!(msg.contains("nope"));
                assert!(msg.contains("\"a\""));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    /// **Scenario**: missing file, empty file, and bad YAML each map to
    /// their own error variant.
    #[test]
    fn load_failures_have_distinct_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("agents.yaml");
        assert!(matches!(load_catalog(&missing), Err(CatalogError::NotFound(_))));

        let (_dir2, empty) = write_config("   \n");
        assert!(matches!(load_catalog(&empty), Err(CatalogError::Empty(_))));

        let (_dir3, bad) = write_config("agents: [unclosed");
        assert!(matches!(load_catalog(&bad), Err(CatalogError::Parse { .. })));
    }

    /// **Scenario**: a path outside the allowlist is rejected before any
    /// filesystem access.
    #[test]
    fn path_escape_rejected() {
        let err = load_catalog("/etc/agents.yaml").unwrap_err();
        assert!(matches!(err, CatalogError::PathOutsideAllowed { .. }));
    }

    /// **Scenario**: bounds are enforced: bad threshold, empty handles,
    /// non-http url.
    #[test]
    fn validation_bounds() {
        let bad_threshold = r#"
default_agent:
  id: a
agents:
  - id: a
    name: A
    handles: [a]
    url: http://localhost:1
    routing:
      threshold: 1.5
"#;
        let (_d1, p1) = write_config(bad_threshold);
        assert!(matches!(load_catalog(&p1), Err(CatalogError::Validation(_))));

        let bad_url = r#"
default_agent:
  id: a
agents:
  - id: a
    name: A
    handles: [a]
    url: ftp://localhost:1
"#;
        let (_d2, p2) = write_config(bad_url);
        assert!(matches!(load_catalog(&p2), Err(CatalogError::Validation(_))));

        let no_handles = r#"
default_agent:
  id: a
agents:
  - id: a
    name: A
    handles: []
    url: http://localhost:1
"#;
        let (_d3, p3) = write_config(no_handles);
        assert!(matches!(load_catalog(&p3), Err(CatalogError::Validation(_))));
    }

    /// **Scenario**: protocol defaults to a2a when omitted.
    #[test]
    fn protocol_defaults_to_a2a() {
        let config = r#"
default_agent:
  id: a
agents:
  - id: a
    name: A
    handles: [a]
    url: http://localhost:1
"#;
        let (_dir, path) = write_config(config);
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.agents[0].protocol, Protocol::A2a);
    }
}
