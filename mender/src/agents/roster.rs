//! The default expert-agent roster, wired from configuration.
//!
//! Five dimensions, each built from the generic detectors and transformers:
//! nothing here knows about any particular language or framework. Severity
//! assignments follow the usual convention that a missing top-level artifact
//! is high and a layout gap is medium.

use std::collections::BTreeMap;

use crate::core::error::PipelineError;
use crate::core::issue::{IssueKind, Severity};
use crate::core::outcome::Dimension;
use crate::io::config::MenderConfig;
use crate::io::detect::{
    CompositeDetector, Detector, PatternDetector, PeerFileDetector, RequiredDirDetector,
    RequiredFileDetector,
};
use crate::io::transform::{
    CreateDirectory, CreateFile, CreatePeerFile, RewritePattern, Transformer,
};

use super::Agent;

/// Build the full roster in reporting order.
pub fn default_roster(config: &MenderConfig) -> Result<Vec<Agent>, PipelineError> {
    Ok(vec![
        test_coverage_agent(config),
        architecture_agent(config),
        pattern_agent(Dimension::Security, &config.security)?,
        pattern_agent(Dimension::Performance, &config.performance)?,
        documentation_agent(config),
    ])
}

fn test_coverage_agent(config: &MenderConfig) -> Agent {
    let section = &config.test_coverage;
    let detector = CompositeDetector::new(vec![
        Box::new(RequiredDirDetector::new(
            section.required_dirs.clone(),
            Severity::High,
        )),
        Box::new(PeerFileDetector::new(section.peer.clone())),
    ]);
    let mut transformers: BTreeMap<IssueKind, Box<dyn Transformer>> = BTreeMap::new();
    transformers.insert(IssueKind::MissingDirectory, Box::new(CreateDirectory));
    transformers.insert(IssueKind::MissingPeer, Box::new(CreatePeerFile::new()));
    Agent::new(
        Dimension::TestCoverage,
        Box::new(detector),
        transformers,
        section.acceptance,
    )
}

fn architecture_agent(config: &MenderConfig) -> Agent {
    let section = &config.architecture;
    let mut transformers: BTreeMap<IssueKind, Box<dyn Transformer>> = BTreeMap::new();
    transformers.insert(IssueKind::MissingDirectory, Box::new(CreateDirectory));
    Agent::new(
        Dimension::Architecture,
        Box::new(RequiredDirDetector::new(
            section.required_dirs.clone(),
            Severity::Medium,
        )),
        transformers,
        section.acceptance,
    )
}

fn pattern_agent(
    dimension: Dimension,
    section: &crate::io::config::PatternDimensionConfig,
) -> Result<Agent, PipelineError> {
    let mut children: Vec<Box<dyn Detector>> =
        vec![Box::new(PatternDetector::new(&section.patterns)?)];
    if !section.required_files.is_empty() {
        children.push(Box::new(RequiredFileDetector::new(
            section.required_files.clone(),
            Severity::High,
        )));
    }
    let mut transformers: BTreeMap<IssueKind, Box<dyn Transformer>> = BTreeMap::new();
    transformers.insert(
        IssueKind::ForbiddenPattern,
        Box::new(RewritePattern::new(&section.patterns)?),
    );
    transformers.insert(IssueKind::MissingFile, Box::new(CreateFile::new()));
    Ok(Agent::new(
        dimension,
        Box::new(CompositeDetector::new(children)),
        transformers,
        section.acceptance,
    ))
}

fn documentation_agent(config: &MenderConfig) -> Agent {
    let section = &config.documentation;
    let detector = CompositeDetector::new(vec![
        Box::new(RequiredFileDetector::new(
            section.required_files.clone(),
            Severity::High,
        )),
        Box::new(RequiredDirDetector::new(
            section.required_dirs.clone(),
            Severity::Medium,
        )),
    ]);
    let mut transformers: BTreeMap<IssueKind, Box<dyn Transformer>> = BTreeMap::new();
    transformers.insert(IssueKind::MissingFile, Box::new(CreateFile::new()));
    transformers.insert(IssueKind::MissingDirectory, Box::new(CreateDirectory));
    Agent::new(
        Dimension::Documentation,
        Box::new(detector),
        transformers,
        section.acceptance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::ModificationLedger;
    use crate::test_support::TestProject;
    use std::path::Path;

    #[test]
    fn roster_covers_all_dimensions_in_order() {
        let roster = default_roster(&MenderConfig::default()).expect("roster");
        let dims: Vec<Dimension> = roster.iter().map(Agent::dimension).collect();
        assert_eq!(dims, Dimension::all().to_vec());
    }

    #[test]
    fn default_documentation_agent_fixes_missing_readme_and_docs() {
        let project = TestProject::new();
        let tree = project.tree();
        tree.create_dir_all(Path::new("src")).expect("mkdir");

        let config = MenderConfig::default();
        let agent = documentation_agent(&config);
        let issues = agent.analyze(&tree).expect("analyze");
        assert_eq!(issues.len(), 2);

        let mut ledger = ModificationLedger::new();
        let (outcome, _) = agent.fix(&tree, &issues, &mut ledger).expect("fix");
        assert_eq!(outcome.fixed, 2);
        assert!(tree.exists(Path::new("README.md")));
        assert!(tree.is_dir(Path::new("docs")));
        assert!(agent.validate(&tree).expect("validate"));
    }

    #[test]
    fn security_rules_flow_into_detector_and_transformer() {
        let project = TestProject::new();
        let tree = project.tree();
        tree.write(Path::new("src/net.rs"), "let url = \"http://api\";")
            .expect("write");

        let config = MenderConfig::default().with_default_security_rules();
        let agent = pattern_agent(Dimension::Security, &config.security).expect("agent");

        let issues = agent.analyze(&tree).expect("analyze");
        assert_eq!(issues.len(), 1);

        let mut ledger = ModificationLedger::new();
        let (outcome, _) = agent.fix(&tree, &issues, &mut ledger).expect("fix");
        assert_eq!(outcome.fixed, 1);
        assert!(
            tree.read_to_string(Path::new("src/net.rs"))
                .expect("read")
                .contains("https://api")
        );
        assert!(agent.validate(&tree).expect("validate"));
    }
}
