//! Declarative YAML feature files

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::lifecycle::Scenario;

/// A feature file: a named group of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Feature title
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags inherited by every scenario
    #[serde(default)]
    pub tags: Vec<String>,

    /// Scenarios in file order
    pub scenarios: Vec<ScenarioSpec>,
}

/// One scenario and its step lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Step text, e.g. `two numbers 5.0 and 3.0`
    pub steps: Vec<String>,
}

impl ScenarioSpec {
    /// Lifecycle view of this scenario, with the feature's tags merged in.
    pub fn to_scenario(&self, feature: &Feature) -> Scenario {
        let mut tags = feature.tags.clone();
        tags.extend(self.tags.iter().cloned());
        Scenario::new(self.name.clone(), tags)
    }

    pub fn has_tag(&self, feature: &Feature, tag: &str) -> bool {
        let wanted = normalize_tag(tag);
        feature
            .tags
            .iter()
            .chain(self.tags.iter())
            .any(|t| normalize_tag(t) == wanted)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_ascii_lowercase()
}

impl Feature {
    /// Parse a feature from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let feature: Self = serde_yaml::from_str(yaml).map_err(E2eError::from)?;
        if let Some(scenario) = feature.scenarios.iter().find(|s| s.steps.is_empty()) {
            return Err(E2eError::SpecParse(format!(
                "Scenario '{}' in feature '{}' has no steps",
                scenario.name, feature.name
            )));
        }
        Ok(feature)
    }

    /// Parse a feature from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all features from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut features = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            features.push(Self::from_file(entry.path())?);
        }

        Ok(features)
    }

    /// Keep only scenarios carrying `tag`; features left empty are dropped
    pub fn filter_by_tag(features: Vec<Self>, tag: &str) -> Vec<Self> {
        Self::retain_scenarios(features, |feature, s| s.has_tag(feature, tag))
    }

    /// Keep only scenarios named exactly `name`
    pub fn filter_by_name(features: Vec<Self>, name: &str) -> Vec<Self> {
        Self::retain_scenarios(features, |_, s| s.name == name)
    }

    fn retain_scenarios(
        features: Vec<Self>,
        keep: impl Fn(&Feature, &ScenarioSpec) -> bool,
    ) -> Vec<Self> {
        features
            .into_iter()
            .filter_map(|mut feature| {
                let scenarios: Vec<ScenarioSpec> = feature
                    .scenarios
                    .iter()
                    .filter(|s| keep(&feature, s))
                    .cloned()
                    .collect();
                feature.scenarios = scenarios;
                (!feature.scenarios.is_empty()).then_some(feature)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALCULATOR: &str = r#"
name: Calculator
description: Basic arithmetic on the landing page
tags:
  - "@UI"
scenarios:
  - name: Add two numbers
    tags: ["@smoke"]
    steps:
      - User is in the calculator page
      - two numbers 5.0 and 3.0
      - I add them
      - the result should be 8.0
  - name: Divide by zero
    steps:
      - two numbers 1 and 0
      - I divide them
      - the result should be undefined
"#;

    #[test]
    fn test_parse_feature() {
        let feature = Feature::from_yaml(CALCULATOR).unwrap();
        assert_eq!(feature.name, "Calculator");
        assert_eq!(feature.scenarios.len(), 2);
        assert_eq!(feature.scenarios[0].steps[2], "I add them");
    }

    #[test]
    fn test_scenario_inherits_feature_tags() {
        let feature = Feature::from_yaml(CALCULATOR).unwrap();
        let scenario = feature.scenarios[0].to_scenario(&feature);
        assert_eq!(scenario.tags, vec!["@UI".to_string(), "@smoke".to_string()]);
    }

    #[test]
    fn test_filter_by_tag_ignores_at_and_case() {
        let features = vec![Feature::from_yaml(CALCULATOR).unwrap()];

        let smoke = Feature::filter_by_tag(features.clone(), "SMOKE");
        assert_eq!(smoke[0].scenarios.len(), 1);

        let ui = Feature::filter_by_tag(features.clone(), "ui");
        assert_eq!(ui[0].scenarios.len(), 2);

        assert!(Feature::filter_by_tag(features, "@api").is_empty());
    }

    #[test]
    fn test_filter_by_name() {
        let features = vec![Feature::from_yaml(CALCULATOR).unwrap()];
        let picked = Feature::filter_by_name(features, "Divide by zero");
        assert_eq!(picked[0].scenarios.len(), 1);
        assert_eq!(picked[0].scenarios[0].name, "Divide by zero");
    }

    #[test]
    fn test_scenario_without_steps_is_rejected() {
        let yaml = "name: Empty\nscenarios:\n  - name: nothing\n    steps: []\n";
        assert!(matches!(Feature::from_yaml(yaml), Err(E2eError::SpecParse(_))));
    }

    #[test]
    fn test_load_all_reads_yaml_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("calculator.yaml"), CALCULATOR).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let features = Feature::load_all(tmp.path()).unwrap();
        assert_eq!(features.len(), 1);
    }
}
