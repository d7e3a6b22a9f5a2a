//! Scenario listing and inspection

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;

use pagectl_runner::{Scenario, Step, SuiteConfig};

use super::{assemble, Selection};
use crate::output::{print_item, print_list, OutputFormat, TableDisplay};

/// Scenario summary for `pagectl list`
#[derive(Debug, Serialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub tags: Vec<String>,
    pub steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
    pub description: String,
}

impl From<&Scenario> for ScenarioInfo {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            tags: scenario.tags.clone(),
            steps: count_steps(&scenario.steps),
            skip: scenario.skip.clone(),
            description: scenario.description.clone(),
        }
    }
}

impl TableDisplay for ScenarioInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Tags", "Steps", "State"]
    }

    fn row(&self) -> Vec<String> {
        let state = match &self.skip {
            Some(reason) => format!("skipped ({})", reason).yellow().to_string(),
            None => "enabled".green().to_string(),
        };
        vec![
            self.name.clone(),
            self.tags.join(", "),
            self.steps.to_string(),
            state,
        ]
    }
}

/// Leaf steps, counting into frames and groups
fn count_steps(steps: &[Step]) -> usize {
    steps
        .iter()
        .map(|step| match step {
            Step::EnterFrame { steps, .. } | Step::Group { steps, .. } => 1 + count_steps(steps),
            _ => 1,
        })
        .sum()
}

pub fn list(config: &SuiteConfig, selection: &Selection, format: OutputFormat) -> Result<()> {
    let suite = assemble(config, selection)?;
    let infos: Vec<ScenarioInfo> = suite.scenarios().iter().map(ScenarioInfo::from).collect();
    print_list(&infos, format);
    Ok(())
}

pub fn show(
    config: &SuiteConfig,
    selection: &Selection,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    let suite = assemble(config, selection)?;
    let Some(scenario) = suite.scenarios().iter().find(|s| s.name == name) else {
        bail!("no scenario named {:?}", name);
    };

    match format {
        OutputFormat::Json => crate::output::print_json(scenario),
        OutputFormat::Yaml => crate::output::print_yaml(scenario),
        OutputFormat::Table | OutputFormat::Plain => {
            print_item(&ScenarioInfo::from(scenario), format);
            if !scenario.description.is_empty() {
                println!("{}", scenario.description.dimmed());
            }
            print_steps(&scenario.steps, 0);
        }
    }
    Ok(())
}

fn print_steps(steps: &[Step], depth: usize) {
    let indent = "  ".repeat(depth);
    for (i, step) in steps.iter().enumerate() {
        println!("{}{:>2}. {}", indent, i + 1, step.label());
        match step {
            Step::EnterFrame { steps, .. } | Step::Group { steps, .. } => {
                print_steps(steps, depth + 1)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_steps_descends_into_groups() {
        let steps = vec![
            Step::navigate("?edit"),
            Step::group("login", vec![Step::navigate("admin/"), Step::reload()]),
            Step::in_frame(0, vec![Step::reload()]),
        ];
        assert_eq!(count_steps(&steps), 6);
    }

    #[test]
    fn test_info_marks_disabled_scenarios() {
        let scenario = Scenario::new("x", vec![Step::reload()]).skipped("flaky");
        let info = ScenarioInfo::from(&scenario);
        assert_eq!(info.skip.as_deref(), Some("flaky"));
        assert_eq!(info.steps, 1);
    }
}
