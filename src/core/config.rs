//! Pipeline configuration from YAML

use crate::core::pipeline::{Gate, OnFail, PipelineDefinition, StepSpec};
use anyhow::Result;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default executor timeout when neither the step nor the pipeline sets one
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Parameters made available to every step's executor
    #[serde(default)]
    pub parameters: HashMap<String, String>,

    /// Pipeline steps, executed strictly in order
    pub steps: Vec<StepConfig>,

    /// Default executor timeout for steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Human-readable step name, must be unique within the pipeline
    pub name: String,

    /// Worker command invoked for this step
    pub command: String,

    /// Gate applied after the step's validation passes
    #[serde(default)]
    pub gate: GateConfig,

    /// Policy applied when the step's validation fails
    #[serde(default)]
    pub on_fail: Option<OnFailConfig>,

    /// Deliverable paths the step must produce, relative to the
    /// deliverable root
    #[serde(default)]
    pub deliverables: Vec<PathBuf>,

    /// External check command that must exit zero for the gate to pass
    #[serde(default)]
    pub check: Option<String>,

    /// Executor timeout for this step (overrides the pipeline default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Gate type as written in YAML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateConfig {
    /// Pause for an external decision after validation passes
    #[default]
    Approval,
    /// Advance automatically, returning control to the caller
    Auto,
    /// Advance automatically and continue into the next step
    None,
}

/// Failure policy as written in YAML
///
/// Either a bare keyword (`retry_once`, `stop`) or a map naming a bounce
/// target step: `bounce_to: "Plan"`. Deserialization is hand-rolled: the
/// derived form would demand YAML `!bounce_to` tags instead of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailConfig {
    RetryOnce,
    Stop,
    BounceTo(String),
}

impl<'de> Deserialize<'de> for OnFailConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct OnFailVisitor;

        impl<'de> Visitor<'de> for OnFailVisitor {
            type Value = OnFailConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("`retry_once`, `stop`, or a map with a `bounce_to` key")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match value {
                    "retry_once" => Ok(OnFailConfig::RetryOnce),
                    "stop" => Ok(OnFailConfig::Stop),
                    other => Err(de::Error::unknown_variant(
                        other,
                        &["retry_once", "stop", "bounce_to"],
                    )),
                }
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let Some(key) = map.next_key::<String>()? else {
                    return Err(de::Error::custom("on_fail map must name a policy"));
                };
                if key != "bounce_to" {
                    return Err(de::Error::unknown_field(&key, &["bounce_to"]));
                }
                let target = map.next_value::<String>()?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("on_fail takes a single policy"));
                }
                Ok(OnFailConfig::BounceTo(target))
            }
        }

        deserializer.deserialize_any(OnFailVisitor)
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Pipeline '{}' has no steps", self.name);
        }

        // Step names must be unique: they are revert targets
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen.insert(&step.name) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }
        }

        for (pos, step) in self.steps.iter().enumerate() {
            let index = pos + 1;
            if let Some(OnFailConfig::BounceTo(target)) = &step.on_fail {
                let target_pos = self.steps.iter().position(|s| &s.name == target);
                let Some(target_pos) = target_pos else {
                    anyhow::bail!(
                        "Step '{}' bounces to non-existent step '{}'",
                        step.name,
                        target
                    );
                };
                if target_pos + 1 >= index {
                    anyhow::bail!(
                        "Step '{}' must bounce to an earlier step, '{}' is not",
                        step.name,
                        target
                    );
                }
                // Chained bounces are unsupported: a bounce target must be
                // terminal so a failure episode cannot hop backwards twice.
                if matches!(
                    self.steps[target_pos].on_fail,
                    Some(OnFailConfig::BounceTo(_))
                ) {
                    anyhow::bail!(
                        "Step '{}' bounces to '{}', which itself has a bounce policy; \
                         chained bounces are not supported",
                        step.name,
                        target
                    );
                }
            }
        }

        Ok(())
    }

    /// Resolve the configuration into an immutable definition
    ///
    /// Assigns contiguous 1-based indices and resolves bounce targets from
    /// names to indices.
    pub fn resolve(&self) -> Result<PipelineDefinition> {
        self.validate()?;

        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(pos, step)| {
                let on_fail = match &step.on_fail {
                    None | Some(OnFailConfig::Stop) => OnFail::Stop,
                    Some(OnFailConfig::RetryOnce) => OnFail::RetryOnce,
                    Some(OnFailConfig::BounceTo(target)) => {
                        // Validated above, the target exists
                        let target_pos =
                            self.steps.iter().position(|s| &s.name == target).unwrap();
                        OnFail::BounceTo(target_pos + 1)
                    }
                };

                StepSpec {
                    index: pos + 1,
                    name: step.name.clone(),
                    command: step.command.clone(),
                    gate: match step.gate {
                        GateConfig::Approval => Gate::Approval,
                        GateConfig::Auto => Gate::Auto,
                        GateConfig::None => Gate::None,
                    },
                    on_fail,
                    deliverables: step.deliverables.clone(),
                    check: step.check.clone(),
                    timeout_secs: step
                        .timeout_secs
                        .or(self.default_timeout_secs)
                        .unwrap_or(DEFAULT_TIMEOUT_SECS),
                }
            })
            .collect();

        Ok(PipelineDefinition::new(
            self.name.clone(),
            self.parameters.clone(),
            steps,
        ))
    }
}
