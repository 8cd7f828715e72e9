//! Request model for the configuration-extension webhook.
//!
//! The CI server posts the repository, the pipeline being started and the
//! configuration files it already found. Only the handful of fields the
//! resolver needs are modelled; everything else in the payload is ignored.

use serde::{Deserialize, Serialize};

/// Body of a configuration request sent by the CI server.
///
/// Missing objects deserialize to their empty defaults so that a sparse
/// payload simply fails (or passes) the repository filter instead of being
/// rejected outright.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingRequest {
    /// Repository the pipeline belongs to.
    #[serde(default)]
    pub repo: RepositoryDescriptor,

    /// Revision being built.
    #[serde(default)]
    pub pipeline: BuildDescriptor,

    /// Configuration files the CI server resolved on its own.
    #[serde(default)]
    pub configs: Vec<ConfigOverride>,
}

/// Repository identity and source location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Repository name, matched against the override filter.
    #[serde(default)]
    pub name: String,

    /// Source URL used as the git location of the build reference.
    #[serde(default, alias = "link_url")]
    pub link: String,
}

/// The exact revision a pipeline runs for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    /// Git ref (e.g. `refs/heads/main`).
    #[serde(default, rename = "ref")]
    pub git_ref: String,

    /// Commit SHA.
    #[serde(default)]
    pub commit: String,
}

/// A configuration file as seen by the CI server. Passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverride {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload_ignores_extra_fields() {
        let body = r#"{
            "repo": {
                "id": 42,
                "name": "pipeliner",
                "full_name": "ci/pipeliner",
                "link": "https://git.example.com/ci/pipeliner"
            },
            "pipeline": {
                "number": 7,
                "event": "push",
                "ref": "refs/heads/main",
                "commit": "0123456789abcdef"
            },
            "configs": [
                { "name": ".woodpecker.yml", "data": "steps: []" }
            ]
        }"#;

        let req: IncomingRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.repo.name, "pipeliner");
        assert_eq!(req.repo.link, "https://git.example.com/ci/pipeliner");
        assert_eq!(req.pipeline.git_ref, "refs/heads/main");
        assert_eq!(req.pipeline.commit, "0123456789abcdef");
        assert_eq!(req.configs.len(), 1);
        assert_eq!(req.configs[0].name, ".woodpecker.yml");
        assert_eq!(req.configs[0].data, "steps: []");
    }

    #[test]
    fn test_parse_link_url_alias() {
        let body = r#"{"repo": {"name": "r", "link_url": "https://example.com/r"}}"#;
        let req: IncomingRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.repo.link, "https://example.com/r");
    }

    #[test]
    fn test_parse_empty_object_uses_defaults() {
        let req: IncomingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.repo, RepositoryDescriptor::default());
        assert_eq!(req.pipeline, BuildDescriptor::default());
        assert!(req.configs.is_empty());
    }

    #[test]
    fn test_parse_config_entry_with_missing_fields() {
        let body = r#"{
            "repo": {"name": "r"},
            "pipeline": {"ref": "refs/heads/main", "commit": "abc"},
            "configs": [{"name": ".woodpecker.yml"}, {"data": "steps: []"}]
        }"#;
        let req: IncomingRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.configs.len(), 2);
        assert_eq!(req.configs[0].name, ".woodpecker.yml");
        assert_eq!(req.configs[0].data, "");
        assert_eq!(req.configs[1].name, "");
        assert_eq!(req.configs[1].data, "steps: []");
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let body = r#"{"repo": {"name": 12}}"#;
        assert!(serde_json::from_str::<IncomingRequest>(body).is_err());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(serde_json::from_str::<IncomingRequest>("not json").is_err());
    }
}
