//! Talent Match - hybrid candidate matching and skill-gap course recommendation
//!
//! Free-text staffing requirements are parsed into structured skill
//! requirements, matched against a candidate pool by fusing vector
//! similarity, LLM relevance and deterministic rule scores, and each top
//! candidate's skill gaps are answered with course recommendations.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{EngineServices, MatchError, MatchSettings, Matcher};
pub use models::{MatchResponse, MatchResult, MatchRun, ScoreBreakdown, SkillGap, StructuredRequirement};
