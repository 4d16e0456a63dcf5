//! Transformer seam and the built-in fixes.
//!
//! A transformer applies the fix for exactly one issue and reports the write
//! it performed as a [`Patch`]; the ledger assigns the monotonic sequence
//! number when the patch is recorded. Generated content is rendered from
//! embedded templates; correctness of that content is out of scope, the
//! pipeline only guarantees the artifact exists.

use std::path::{Path, PathBuf};

use minijinja::{Environment, context};

use crate::core::error::PipelineError;
use crate::core::issue::{Issue, IssueKind};
use crate::core::ledger::Patch;
use crate::io::config::PatternRule;
use crate::io::tree::FileTree;

const DOC_STUB_TEMPLATE: &str = include_str!("templates/doc_stub.md");
const PEER_STUB_TEMPLATE: &str = include_str!("templates/peer_stub.txt");

/// Applies a fix for a single issue.
pub trait Transformer {
    fn apply(&self, tree: &FileTree, issue: &Issue) -> Result<Patch, PipelineError>;
}

/// Template engine wrapper around minijinja for generated stubs.
struct StubEngine {
    env: Environment<'static>,
}

impl StubEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("doc_stub", DOC_STUB_TEMPLATE)
            .expect("doc stub template should be valid");
        env.add_template("peer_stub", PEER_STUB_TEMPLATE)
            .expect("peer stub template should be valid");
        Self { env }
    }

    fn render_doc(&self, path: &Path) -> Result<String, PipelineError> {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Documentation".to_string());
        self.render("doc_stub", context! { title, path => path.display().to_string() })
    }

    fn render_peer(&self, source: &Path) -> Result<String, PipelineError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.render(
            "peer_stub",
            context! { source => source.display().to_string(), stem },
        )
    }

    fn render(
        &self,
        name: &str,
        ctx: minijinja::value::Value,
    ) -> Result<String, PipelineError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|err| PipelineError::Configuration(err.to_string()))?;
        template
            .render(ctx)
            .map_err(|err| PipelineError::Configuration(err.to_string()))
    }
}

/// Fix for `missing_directory`: create the directory.
pub struct CreateDirectory;

impl Transformer for CreateDirectory {
    fn apply(&self, tree: &FileTree, issue: &Issue) -> Result<Patch, PipelineError> {
        tree.create_dir_all(issue.location())?;
        Ok(Patch::new(issue.location(), "create directory"))
    }
}

/// Fix for `missing_file`: write a templated stub at the location.
pub struct CreateFile {
    engine: StubEngine,
}

impl CreateFile {
    pub fn new() -> Self {
        Self {
            engine: StubEngine::new(),
        }
    }
}

impl Default for CreateFile {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for CreateFile {
    fn apply(&self, tree: &FileTree, issue: &Issue) -> Result<Patch, PipelineError> {
        let location = issue.location();
        let contents = if location.extension().and_then(|e| e.to_str()) == Some("md") {
            self.engine.render_doc(location)?
        } else {
            self.engine.render_peer(location)?
        };
        tree.write(location, &contents)?;
        Ok(Patch::new(location, "create required file stub"))
    }
}

/// Fix for `missing_peer`: generate the peer file named in issue metadata.
pub struct CreatePeerFile {
    engine: StubEngine,
}

impl CreatePeerFile {
    pub fn new() -> Self {
        Self {
            engine: StubEngine::new(),
        }
    }
}

impl Default for CreatePeerFile {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for CreatePeerFile {
    fn apply(&self, tree: &FileTree, issue: &Issue) -> Result<Patch, PipelineError> {
        let peer = issue.metadata.get("peer").ok_or_else(|| {
            PipelineError::local(
                IssueKind::MissingPeer,
                issue.location().display().to_string(),
                "issue carries no 'peer' metadata",
            )
        })?;
        let peer = PathBuf::from(peer);
        let contents = self.engine.render_peer(issue.location())?;
        tree.write(&peer, &contents)?;
        Ok(Patch::new(
            peer.clone(),
            format!("generate peer stub for {}", issue.location().display()),
        ))
    }
}

/// Fix for `forbidden_pattern`: apply every configured rewrite to the file.
///
/// Holds the full rule list because issue identity is (kind, location): one
/// issue per file stands for every pattern found in it.
pub struct RewritePattern {
    rules: Vec<(regex::Regex, PatternRule)>,
}

impl RewritePattern {
    pub fn new(rules: &[PatternRule]) -> Result<Self, PipelineError> {
        let compiled = rules
            .iter()
            .map(|rule| {
                regex::Regex::new(&rule.pattern)
                    .map(|regex| (regex, rule.clone()))
                    .map_err(|err| {
                        PipelineError::Configuration(format!(
                            "invalid pattern regex '{}': {err}",
                            rule.pattern
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules: compiled })
    }
}

impl Transformer for RewritePattern {
    fn apply(&self, tree: &FileTree, issue: &Issue) -> Result<Patch, PipelineError> {
        let location = issue.location();
        let contents = tree.read_to_string(location).map_err(|err| {
            PipelineError::local(
                IssueKind::ForbiddenPattern,
                location.display().to_string(),
                err.to_string(),
            )
        })?;

        let mut rewritten = contents.clone();
        for (regex, rule) in &self.rules {
            rewritten = regex
                .replace_all(&rewritten, rule.replacement.as_str())
                .into_owned();
        }
        if rewritten != contents {
            tree.write(location, &rewritten)?;
        }
        Ok(Patch::new(location, "rewrite forbidden patterns"))
    }
}
