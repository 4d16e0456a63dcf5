//! Pipeline configuration stored in `mender.toml` at the project root.
//!
//! Thresholds and detection rules are configuration inputs, not behavior
//! baked into the agents. The file is meant to be edited by humans; missing
//! fields fall back to conservative defaults and a missing file means
//! all-defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::issue::Severity;
use crate::core::outcome::Acceptance;

/// Full pipeline configuration (TOML), one table per quality dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MenderConfig {
    pub test_coverage: TestCoverageConfig,
    pub architecture: ArchitectureConfig,
    pub security: PatternDimensionConfig,
    pub performance: PatternDimensionConfig,
    pub documentation: DocumentationConfig,
}

/// Test-coverage dimension: required test directories plus a peer-file rule
/// mapping each source file to the test file expected beside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestCoverageConfig {
    pub required_dirs: Vec<String>,
    pub peer: PeerRule,
    pub acceptance: Acceptance,
}

impl Default for TestCoverageConfig {
    fn default() -> Self {
        Self {
            required_dirs: vec!["tests".to_string()],
            peer: PeerRule::default(),
            acceptance: Acceptance {
                block_at: Severity::High,
                max_open: 0,
            },
        }
    }
}

/// Maps a source file to its expected peer path.
///
/// `peer_template` supports `{stem}`, `{ext}`, and `{parent}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeerRule {
    pub source_ext: String,
    pub peer_template: String,
    /// Top-level directories whose files never need peers (tests, docs, ...).
    pub skip_dirs: Vec<String>,
}

impl Default for PeerRule {
    fn default() -> Self {
        Self {
            source_ext: "rs".to_string(),
            peer_template: "tests/{stem}_test.{ext}".to_string(),
            skip_dirs: vec!["tests".to_string(), "docs".to_string()],
        }
    }
}

/// Architecture dimension: the directory layout the project must have.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchitectureConfig {
    pub required_dirs: Vec<String>,
    pub acceptance: Acceptance,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            required_dirs: vec!["src".to_string()],
            acceptance: Acceptance::default(),
        }
    }
}

/// A dimension driven by content-pattern rules (security, performance).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatternDimensionConfig {
    pub patterns: Vec<PatternRule>,
    pub required_files: Vec<String>,
    pub acceptance: Acceptance,
}

impl Default for PatternDimensionConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            required_files: Vec::new(),
            acceptance: Acceptance::default(),
        }
    }
}

/// One denylisted content pattern and its rewrite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRule {
    /// Regex matched against file contents.
    pub pattern: String,
    pub replacement: String,
    /// Restrict matching to files with this extension; `None` = all files.
    #[serde(default)]
    pub file_ext: Option<String>,
    #[serde(default = "default_pattern_severity")]
    pub severity: Severity,
}

fn default_pattern_severity() -> Severity {
    Severity::Medium
}

/// Documentation dimension: required documentation files and directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentationConfig {
    pub required_files: Vec<String>,
    pub required_dirs: Vec<String>,
    pub acceptance: Acceptance,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            required_files: vec!["README.md".to_string()],
            required_dirs: vec!["docs".to_string()],
            acceptance: Acceptance::default(),
        }
    }
}

impl MenderConfig {
    /// Default security posture: the one rule from every starter config.
    pub fn with_default_security_rules(mut self) -> Self {
        if self.security.patterns.is_empty() {
            self.security.patterns.push(PatternRule {
                pattern: r"http://".to_string(),
                replacement: "https://".to_string(),
                file_ext: None,
                severity: Severity::High,
            });
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        for rule in self
            .security
            .patterns
            .iter()
            .chain(self.performance.patterns.iter())
        {
            if rule.pattern.trim().is_empty() {
                return Err(anyhow!("pattern rules must have a non-empty pattern"));
            }
            regex::Regex::new(&rule.pattern)
                .with_context(|| format!("invalid pattern regex '{}'", rule.pattern))?;
        }
        if self.test_coverage.peer.source_ext.trim().is_empty() {
            return Err(anyhow!("test_coverage.peer.source_ext must be non-empty"));
        }
        if !self.test_coverage.peer.peer_template.contains("{stem}") {
            return Err(anyhow!(
                "test_coverage.peer.peer_template must contain '{{stem}}'"
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `MenderConfig::default()`.
pub fn load_config(path: &Path) -> Result<MenderConfig> {
    if !path.exists() {
        return Ok(MenderConfig::default());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: MenderConfig =
        toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(config)
}
