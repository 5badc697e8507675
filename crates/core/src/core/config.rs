//! Endpoint and policy knobs for the sync loop.
//!
//! Every field has a serde default so a partial JSON override (or none at all)
//! still yields a working config.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with a 200 reply whose body is not a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapePolicy {
    /// Drop the frame, keep polling.
    #[default]
    Skip,
    /// End the loop.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_update_path")]
    pub update_path: String,
    #[serde(default = "default_event_path")]
    pub event_path: String,
    #[serde(default = "default_click_content_type")]
    pub click_content_type: String,
    #[serde(default)]
    pub shape_policy: ShapePolicy,
}

fn default_update_path() -> String {
    "/update".to_string()
}

fn default_event_path() -> String {
    "/event".to_string()
}

// Older plugin builds were driven by a page that declared
// `application/javascript` here; the server never looks at it.
fn default_click_content_type() -> String {
    "application/json".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            update_path: default_update_path(),
            event_path: default_event_path(),
            click_content_type: default_click_content_type(),
            shape_policy: ShapePolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: SyncConfig =
            serde_json::from_str(raw).map_err(|e| Error::Config(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("update_path", &self.update_path),
            ("event_path", &self.event_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        if self.click_content_type.trim().is_empty() {
            return Err(Error::Config("click_content_type is empty".to_string()));
        }
        Ok(())
    }

    /// Read endpoint: immediate snapshot or long-poll.
    pub fn read_url(&self, immediate: bool) -> String {
        let path = if immediate {
            &self.update_path
        } else {
            &self.event_path
        };
        self.url(path)
    }

    pub fn click_url(&self) -> String {
        self.url(&self.update_path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = SyncConfig::from_json("{}").unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.read_url(true), "/update");
        assert_eq!(cfg.read_url(false), "/event");
        assert_eq!(cfg.click_url(), "/update");
        assert_eq!(cfg.shape_policy, ShapePolicy::Skip);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = SyncConfig::from_json(
            r#"{"base_url":"http://localhost:12345/","shape_policy":"stop","click_content_type":"application/javascript"}"#,
        )
        .unwrap();
        assert_eq!(cfg.read_url(false), "http://localhost:12345/event");
        assert_eq!(cfg.click_url(), "http://localhost:12345/update");
        assert_eq!(cfg.shape_policy, ShapePolicy::Stop);
        assert_eq!(cfg.click_content_type, "application/javascript");
    }

    #[test]
    fn rejects_relative_paths_and_garbage() {
        assert!(matches!(
            SyncConfig::from_json(r#"{"event_path":"event"}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SyncConfig::from_json(r#"{"click_content_type":"  "}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SyncConfig::from_json("not json"),
            Err(Error::Config(_))
        ));
    }
}
