use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::interpret::GradeError;

pub const DEFAULT_CHOICES_PER_QUESTION: usize = 5;

/// Maps a 0-based question index (top-to-bottom) to the 0-based index of its
/// correct choice (left-to-right).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(BTreeMap<usize, usize>);

impl AnswerKey {
    pub fn new(answers: BTreeMap<usize, usize>) -> Self {
        Self(answers)
    }

    /// Builds a key whose question indexes are the positions in `choices`.
    pub fn from_choices(choices: &[usize]) -> Self {
        Self(choices.iter().copied().enumerate().collect())
    }

    pub fn get(&self, question: usize) -> Option<usize> {
        self.0.get(&question).copied()
    }

    /// The number of questions being graded.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(usize, usize)> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Size and shape bounds a contour must meet to be considered a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BubbleFilter {
    pub min_width: u32,
    pub min_height: u32,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
}

impl Default for BubbleFilter {
    fn default() -> Self {
        Self {
            min_width: 20,
            min_height: 20,
            min_aspect_ratio: 0.9,
            max_aspect_ratio: 1.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocatorOptions {
    /// How many of the largest contours are tried as the page boundary.
    pub max_candidates: usize,
    /// Polygon simplification tolerance as a fraction of contour perimeter.
    pub epsilon_ratio: f64,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            epsilon_ratio: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOptions {
    #[serde(default = "default_choices_per_question")]
    pub choices_per_question: usize,
    pub answer_key: AnswerKey,
    /// A row whose most-filled bubble has less than this fraction of its area
    /// inked is reported as unanswered.
    #[serde(default)]
    pub min_fill_ratio: f32,
    #[serde(default)]
    pub bubble_filter: BubbleFilter,
    #[serde(default)]
    pub locator: LocatorOptions,
}

fn default_choices_per_question() -> usize {
    DEFAULT_CHOICES_PER_QUESTION
}

impl GradeOptions {
    pub fn new(answer_key: AnswerKey) -> Self {
        Self {
            choices_per_question: DEFAULT_CHOICES_PER_QUESTION,
            answer_key,
            min_fill_ratio: 0.0,
            bubble_filter: BubbleFilter::default(),
            locator: LocatorOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), GradeError> {
        if self.choices_per_question == 0 {
            return Err(GradeError::InvalidConfig(
                "choices per question must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_fill_ratio) {
            return Err(GradeError::InvalidConfig(format!(
                "minimum fill ratio must be within [0, 1], got {}",
                self.min_fill_ratio
            )));
        }
        if self.locator.max_candidates == 0 {
            return Err(GradeError::InvalidConfig(
                "at least one document candidate must be considered".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
    Invalid(PathBuf, GradeError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
            ConfigError::Parse(path, e) => write!(f, "unable to parse {}: {}", path.display(), e),
            ConfigError::Invalid(path, e) => write!(f, "invalid config {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Reads and validates grading options from a JSON file.
pub fn load_grade_options(path: &Path) -> Result<GradeOptions, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let options: GradeOptions =
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    options
        .validate()
        .map_err(|e| ConfigError::Invalid(path.to_path_buf(), e))?;
    Ok(options)
}
