use crate::types::rt_state::JOINT_COUNT;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;

pub const DEFAULT_JOINT_NAMES: [&str; 6] = [
    "shoulder_pan_joint",
    "shoulder_lift_joint",
    "elbow_joint",
    "wrist_1_joint",
    "wrist_2_joint",
    "wrist_3_joint",
];

pub const DEFAULT_LINK_NAMES: [&str; 6] = [
    "shoulder_link",
    "upper_arm_link",
    "forearm_link",
    "wrist_1_link",
    "wrist_2_link",
    "wrist_3_link",
];

/// Naming and verbosity for the real-time state publisher.
///
/// Link `i` is assumed to share its origin with joint `i`, so per-joint
/// temperatures are stamped with the link frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Prepended to every joint, link and frame name
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_joint_names")]
    pub joint_names: Vec<String>,
    #[serde(default = "default_link_names")]
    pub link_names: Vec<String>,
    #[serde(default = "default_base_frame")]
    pub base_frame: String,
    #[serde(default = "default_tool_frame")]
    pub tool_frame: String,
    /// Skip actual joint states and wrench (something else publishes them)
    #[serde(default)]
    pub reduced_telemetry: bool,
}

/// Names with the prefix applied, as they appear on outbound messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNames {
    pub joint_names: Vec<String>,
    pub link_names: Vec<String>,
    pub base_frame: String,
    pub tool_frame: String,
}

fn default_joint_names() -> Vec<String> {
    DEFAULT_JOINT_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_link_names() -> Vec<String> {
    DEFAULT_LINK_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_base_frame() -> String {
    "base".to_string()
}

fn default_tool_frame() -> String {
    "tool0_controller".to_string()
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            joint_names: default_joint_names(),
            link_names: default_link_names(),
            base_frame: default_base_frame(),
            tool_frame: default_tool_frame(),
            reduced_telemetry: false,
        }
    }
}

impl PublisherConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read publisher config {}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PublisherConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.joint_names.len() != JOINT_COUNT {
            return Err(eyre::eyre!(
                "Joint names count ({}) doesn't match the controller's joint count ({})",
                self.joint_names.len(),
                JOINT_COUNT
            ));
        }

        if self.link_names.len() != self.joint_names.len() {
            return Err(eyre::eyre!(
                "Link names count ({}) doesn't match joint names count ({})",
                self.link_names.len(),
                self.joint_names.len()
            ));
        }

        if self.base_frame.is_empty() || self.tool_frame.is_empty() {
            return Err(eyre::eyre!("Base and tool frame ids must not be empty"));
        }

        let mut seen = HashSet::new();
        for name in &self.joint_names {
            if !seen.insert(name) {
                return Err(eyre::eyre!("Duplicate joint name '{}'", name));
            }
        }

        Ok(())
    }

    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    pub fn resolved(&self) -> ResolvedNames {
        let prefixed = |name: &String| format!("{}{}", self.prefix, name);

        ResolvedNames {
            joint_names: self.joint_names.iter().map(prefixed).collect(),
            link_names: self.link_names.iter().map(prefixed).collect(),
            base_frame: prefixed(&self.base_frame),
            tool_frame: prefixed(&self.tool_frame),
        }
    }
}
