// Core engine exports
pub mod courses;
pub mod gaps;
pub mod matcher;
pub mod parser;
pub mod pipeline;
pub mod retriever;
pub mod rules;
pub mod scoring;
pub mod similarity;
pub mod skills;

pub use courses::{CourseRecommendation, CourseRecommender, CourseSettings};
pub use gaps::detect_gaps;
pub use matcher::{EngineServices, MatchSettings, Matcher};
pub use parser::RequirementParser;
pub use pipeline::{FanOut, MatchError, PoolEntity, Scored, ScoredPool};
pub use retriever::VectorRetriever;
pub use rules::{candidate_rule_score, course_rule_score, RuleOutcome};
pub use scoring::{compare_ranked, ScoreFuser, NEUTRAL_RELEVANCE};
pub use similarity::cosine_similarity;
pub use skills::normalize_skill;
