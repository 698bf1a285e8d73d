// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateProfile, CourseLevel, CourseMatch, CourseProfile, FusionWeights, GapKind, MatchResult,
    MatchRun, Pool, ScoreBreakdown, Seniority, SkillGap, SkillRequirement, StructuredRequirement,
};
pub use requests::{MatchRequest, ParseRequest};
pub use responses::{
    CandidateView, CourseView, ErrorResponse, HealthResponse, MatchQuality, MatchResponse,
    QualityThresholds, ScoreView,
};
