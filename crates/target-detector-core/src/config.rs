//! Startup configuration document.
//!
//! The document is a JSON or TOML tree. The node reads two sections:
//!
//! ```json
//! {
//!   "target_finder": { "type": "CircleGridTargetFinder", "rows": 4, "cols": 5 },
//!   "node": { "detected_topic": "image_detected", "annotated_topic": "image_annotated" }
//! }
//! ```
//!
//! `target_finder.type` selects the finder; the whole `target_finder` section
//! is handed to its factory. `node` is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TARGET_FINDER_SECTION: &str = "target_finder";
const NODE_SECTION: &str = "node";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("missing required config field '{0}'")]
    MissingField(String),

    #[error("config field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

/// Hierarchical key/value document, immutable after loading.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigDocument {
    root: Value,
    source: Option<PathBuf>,
}

/// The finder selection extracted from a document.
#[derive(Clone, Copy, Debug)]
pub struct FinderConfig<'a> {
    pub type_name: &'a str,
    /// The full `target_finder` section, including `type`.
    pub params: &'a Value,
}

impl ConfigDocument {
    pub fn from_value(root: Value) -> Self {
        Self { root, source: None }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_value(serde_json::from_str(raw)?))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_value(toml::from_str::<Value>(raw)?))
    }

    /// Load a document from disk; `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let mut doc = if is_toml {
            Self::from_toml_str(&raw)?
        } else {
            Self::from_json_str(&raw)?
        };
        doc.source = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Path the document was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Required top-level section.
    pub fn section(&self, key: &str) -> Result<&Value, ConfigError> {
        let section = self
            .root
            .get(key)
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))?;
        if !section.is_object() {
            return Err(ConfigError::InvalidField {
                field: key.to_string(),
                expected: "a table",
            });
        }
        Ok(section)
    }

    pub fn finder_config(&self) -> Result<FinderConfig<'_>, ConfigError> {
        let section = self.section(TARGET_FINDER_SECTION)?;
        let field = format!("{TARGET_FINDER_SECTION}.type");
        let type_name = match section.get("type") {
            None => return Err(ConfigError::MissingField(field)),
            Some(Value::String(s)) if !s.is_empty() => s.as_str(),
            Some(_) => {
                return Err(ConfigError::InvalidField {
                    field,
                    expected: "a non-empty string",
                })
            }
        };
        Ok(FinderConfig {
            type_name,
            params: section,
        })
    }

    /// Node options from the optional `node` section; defaults when absent.
    pub fn node_options(&self) -> Result<NodeOptions, ConfigError> {
        match self.root.get(NODE_SECTION) {
            None => Ok(NodeOptions::default()),
            Some(v) => Ok(NodeOptions::deserialize(v)?),
        }
    }
}

fn default_detected_topic() -> String {
    "image_detected".to_string()
}

fn default_annotated_topic() -> String {
    "image_annotated".to_string()
}

/// Transport-facing options of the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOptions {
    #[serde(default = "default_detected_topic")]
    pub detected_topic: String,
    #[serde(default = "default_annotated_topic")]
    pub annotated_topic: String,
    /// Outbound queue depth requested from the transport.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// How often the spin loop re-checks the shutdown flag while idle.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_queue_size() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            detected_topic: default_detected_topic(),
            annotated_topic: default_annotated_topic(),
            queue_size: default_queue_size(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finder_config_exposes_type_and_section() {
        let doc = ConfigDocument::from_value(json!({
            "target_finder": { "type": "CircleGridTargetFinder", "rows": 3 }
        }));
        let cfg = doc.finder_config().expect("finder config");
        assert_eq!(cfg.type_name, "CircleGridTargetFinder");
        assert_eq!(cfg.params["rows"], 3);
    }

    #[test]
    fn missing_type_is_reported_with_its_path() {
        let doc = ConfigDocument::from_value(json!({ "target_finder": { "rows": 3 } }));
        match doc.finder_config() {
            Err(ConfigError::MissingField(field)) => assert_eq!(field, "target_finder.type"),
            other => panic!("unexpected: {other:?}"),
        }

        let doc = ConfigDocument::from_value(json!({ "finder": {} }));
        assert!(matches!(
            doc.finder_config(),
            Err(ConfigError::MissingField(f)) if f == "target_finder"
        ));
    }

    #[test]
    fn type_must_be_a_string() {
        let doc = ConfigDocument::from_value(json!({ "target_finder": { "type": 5 } }));
        assert!(matches!(
            doc.finder_config(),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    #[test]
    fn loads_toml_and_json_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");

        let toml_path = dir.path().join("detector.toml");
        fs::write(
            &toml_path,
            "[target_finder]\ntype = \"Fixed\"\nrows = 4\n\n[node]\nqueue_size = 3\n",
        )
        .expect("write toml");
        let doc = ConfigDocument::load(&toml_path).expect("toml");
        assert_eq!(doc.finder_config().expect("cfg").type_name, "Fixed");
        assert_eq!(doc.node_options().expect("node").queue_size, 3);
        assert_eq!(doc.source(), Some(toml_path.as_path()));

        let json_path = dir.path().join("detector.json");
        fs::write(&json_path, r#"{"target_finder": {"type": "Fixed"}}"#).expect("write json");
        let doc = ConfigDocument::load(&json_path).expect("json");
        assert_eq!(doc.node_options().expect("node"), NodeOptions::default());
    }

    #[test]
    fn unreadable_and_malformed_files_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ConfigDocument::load(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").expect("write");
        assert!(matches!(
            ConfigDocument::load(&bad),
            Err(ConfigError::Json(_))
        ));
    }
}
