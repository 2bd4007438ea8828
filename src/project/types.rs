//! Project attributes chosen on the command line.

use serde::{Deserialize, Serialize};

/// Project language; selects the base image a project builds on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    C,
    Go,
}

impl Language {
    /// Every language that has a base image.
    pub const ALL: [Language; 2] = [Language::C, Language::Go];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Go => "go",
        }
    }

    /// Tag of the base image for this language, e.g. `base_image_c`.
    pub fn base_image_name(&self) -> String {
        format!("base_image_{}", self.as_str())
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time instrumentation passed to the in-container build step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Sanitizer {
    #[default]
    Address,
    Undefined,
    Coverage,
    None,
}

impl Sanitizer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sanitizer::Address => "address",
            Sanitizer::Undefined => "undefined",
            Sanitizer::Coverage => "coverage",
            Sanitizer::None => "none",
        }
    }
}

impl std::fmt::Display for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
