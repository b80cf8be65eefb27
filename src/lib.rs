//! Grades photographed multiple-choice answer sheets.
//!
//! The pipeline finds the sheet in a photo, straightens it, picks out the
//! bubbles row by row, decides which bubble in each row was filled in, and
//! scores those answers against an [`AnswerKey`].

pub mod bubbles;
pub mod config;
pub mod debug;
pub mod document;
pub mod edges;
pub mod geometry;
pub mod grouping;
pub mod image_utils;
pub mod interpret;
pub mod rectify;
pub mod scoring;
pub mod types;

pub use config::{load_grade_options, AnswerKey, BubbleFilter, GradeOptions, LocatorOptions};
pub use interpret::{
    grade_batch, grade_image_path, grade_rectified, interpret_bubble_sheet, GradeError,
    GradeResult, GradedSheet,
};
pub use scoring::{QuestionOutcome, ScoreResult};
pub use types::{BubbleCandidate, DetectedAnswer, Quadrilateral, QuestionGroup};
