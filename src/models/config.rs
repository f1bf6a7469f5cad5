use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target difficulty for generated questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    /// Mixture of easy, medium and hard
    #[default]
    Mix,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Mix => "mix",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty '{0}' (expected easy, medium, hard or mix)")]
pub struct DifficultyParseError(String);

impl FromStr for Difficulty {
    type Err = DifficultyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "mix" | "mixed" => Ok(Difficulty::Mix),
            other => Err(DifficultyParseError(other.to_string())),
        }
    }
}

/// What to ask the model for in a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Standalone multiple-choice questions
    pub mcq_count: u32,
    /// Case scenarios
    pub case_count: u32,
    /// Questions attached to each case
    pub questions_per_case: u32,
    pub difficulty: Difficulty,
    /// Free-text instructions passed to the model verbatim
    pub custom_instructions: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mcq_count: 5,
            case_count: 1,
            questions_per_case: 2,
            difficulty: Difficulty::Mix,
            custom_instructions: String::new(),
        }
    }
}

impl GenerationConfig {
    /// Total items a fully successful generation yields
    pub fn expected_items(&self) -> usize {
        self.mcq_count as usize + self.case_count as usize * self.questions_per_case as usize
    }

    /// Check the config describes a run that can produce items
    pub fn validate(&self) -> Result<(), String> {
        if self.questions_per_case == 0 {
            return Err("questions per case must be at least 1".to_string());
        }
        if self.expected_items() == 0 {
            return Err("nothing to generate: both question and case counts are 0".to_string());
        }
        Ok(())
    }
}
