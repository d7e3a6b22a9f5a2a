//! CLI Commands

pub mod config;
pub mod run;
pub mod scenarios;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use pagectl_cms::{build_suite, PageControlOptions};
use pagectl_runner::{Scenario, Suite, SuiteConfig};

/// Which scenarios end up in the suite
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Directory of additional YAML scenarios
    pub specs: Option<PathBuf>,
    /// Keep only scenarios carrying this tag
    pub tag: Option<String>,
    /// Run scenarios that are disabled by default
    pub include_disabled: bool,
}

/// Page-control suite plus any YAML scenarios, filtered by tag
pub fn assemble(config: &SuiteConfig, selection: &Selection) -> Result<Suite> {
    let options = PageControlOptions {
        include_disabled: selection.include_disabled,
        token: None,
    };
    let builtin = build_suite(config, &options)?;

    let mut scenarios: Vec<Scenario> = builtin.scenarios().to_vec();
    if let Some(dir) = &selection.specs {
        let loaded = Scenario::load_all(dir)
            .with_context(|| format!("loading scenarios from {}", dir.display()))?;
        debug!("Loaded {} scenario(s) from {}", loaded.len(), dir.display());
        scenarios.extend(loaded);
    }

    let selected: Vec<&Scenario> = match selection.tag.as_deref() {
        Some(tag) => Scenario::filter_by_tag(&scenarios, tag),
        None => scenarios.iter().collect(),
    };

    let mut suite = Suite::new(config.clone());
    suite.register_setup(builtin.setup_steps().to_vec())?;
    suite.register_teardown(builtin.teardown_steps().to_vec())?;
    for scenario in selected {
        suite.register(scenario.clone())?;
    }
    suite.include_skipped(selection.include_disabled);

    Ok(suite)
}
