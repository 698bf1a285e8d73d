use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single skill line of a parsed requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub skill: String,
    #[serde(rename = "minYears")]
    pub min_years: f64,
    pub required: bool,
}

/// Seniority level asked for by a requirement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    #[default]
    Mid,
    Senior,
    Lead,
    Architect,
}

impl Seniority {
    /// Lenient parse, unknown values fall back to `Mid`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "junior" | "entry" | "graduate" => Seniority::Junior,
            "senior" => Seniority::Senior,
            "lead" | "principal" | "staff" => Seniority::Lead,
            "architect" => Seniority::Architect,
            _ => Seniority::Mid,
        }
    }
}

/// Structured form of a free-text staffing requirement.
///
/// Immutable once parsed. `degraded` is set when the text-understanding
/// capability failed and the skills were recovered by keyword matching only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRequirement {
    pub skills: Vec<SkillRequirement>,
    #[serde(rename = "domainTags")]
    pub domain_tags: Vec<String>,
    pub seniority: Seniority,
    #[serde(rename = "originText")]
    pub origin_text: String,
    pub degraded: bool,
}

impl StructuredRequirement {
    /// Skills flagged as required, in requirement order
    pub fn required_skills(&self) -> impl Iterator<Item = &SkillRequirement> {
        self.skills.iter().filter(|s| s.required)
    }

    /// Render the requirement as the text sent to relevance scoring
    pub fn summary(&self) -> String {
        let skills: Vec<String> = self
            .skills
            .iter()
            .map(|s| {
                let kind = if s.required { "required" } else { "preferred" };
                format!("{} ({}y, {})", s.skill, s.min_years, kind)
            })
            .collect();

        format!(
            "Requirement: {}\nSkills: {}\nDomains: {}\nSeniority: {:?}",
            self.origin_text,
            skills.join(", "),
            self.domain_tags.join(", "),
            self.seniority
        )
    }
}

/// Candidate profile as read from the repository.
///
/// Skill keys are normalised (see `core::skills::normalize_skill`) and
/// experience years are never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub name: String,
    pub skills: BTreeMap<String, f64>,
    #[serde(rename = "domainTags", default)]
    pub domain_tags: Vec<String>,
    #[serde(rename = "rawText", default)]
    pub raw_text: String,
    #[serde(rename = "experienceSummary", default)]
    pub experience_summary: Option<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Vec<f32>,
}

/// Longest raw CV excerpt sent along to relevance scoring
const RAW_TEXT_EXCERPT_CHARS: usize = 2000;

impl CandidateProfile {
    /// Text representation used by the relevance scorer
    pub fn scoring_text(&self) -> String {
        let skills: Vec<String> = self
            .skills
            .iter()
            .map(|(skill, years)| format!("{} ({}y)", skill, years))
            .collect();

        let mut text = format!(
            "Name: {}\nSkills: {}\nDomains: {}",
            self.name,
            skills.join(", "),
            self.domain_tags.join(", ")
        );

        if let Some(summary) = self.experience_summary.as_deref().filter(|s| !s.is_empty()) {
            text.push_str("\nExperience Summary: ");
            text.push_str(summary);
        }

        if !self.raw_text.is_empty() {
            let excerpt: String = self.raw_text.chars().take(RAW_TEXT_EXCERPT_CHARS).collect();
            text.push_str("\nCV: ");
            text.push_str(&excerpt);
        }

        text
    }
}

/// Course difficulty level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "beginner" | "basic" | "introductory" => CourseLevel::Beginner,
            "advanced" | "expert" => CourseLevel::Advanced,
            _ => CourseLevel::Intermediate,
        }
    }
}

/// Training course as read from the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseProfile {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Vec<f32>,
}

impl CourseProfile {
    pub fn scoring_text(&self) -> String {
        format!(
            "Title: {}\nDescription: {}\nLevel: {:?}\nPrerequisites: {}",
            self.title,
            self.description,
            self.level,
            self.prerequisites.join(", ")
        )
    }
}

/// Which entity pool a retrieval targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Candidates,
    Courses,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pool::Candidates => write!(f, "candidates"),
            Pool::Courses => write!(f, "courses"),
        }
    }
}

/// Per-entity score components, all in [0,1].
///
/// Created once per (requirement, entity) pair by the score fuser and never
/// mutated afterwards. `partial` marks a breakdown whose relevance score is
/// the neutral default because scoring failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(rename = "vectorScore")]
    pub vector_score: f64,
    #[serde(rename = "relevanceScore")]
    pub relevance_score: f64,
    #[serde(rename = "ruleScore")]
    pub rule_score: f64,
    #[serde(rename = "fusedScore")]
    pub fused_score: f64,
    pub evidence: Vec<String>,
    pub partial: bool,
}

/// Whether a gap is a missing skill or too little experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKind {
    Missing,
    Insufficient,
}

/// A required skill the candidate lacks or is under-experienced in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: String,
    #[serde(rename = "requiredYears")]
    pub required_years: f64,
    #[serde(rename = "candidateYears")]
    pub candidate_years: f64,
    #[serde(rename = "gapSeverity")]
    pub gap_severity: f64,
    pub kind: GapKind,
}

/// A recommended course with its score breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseMatch {
    pub course: CourseProfile,
    pub breakdown: ScoreBreakdown,
    #[serde(rename = "gapsAddressed")]
    pub gaps_addressed: Vec<String>,
}

/// The engine's output unit for one ranked candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub name: String,
    pub breakdown: ScoreBreakdown,
    pub gaps: Vec<SkillGap>,
    pub courses: Vec<CourseMatch>,
}

/// Outcome of one complete matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRun {
    #[serde(rename = "runId")]
    pub run_id: uuid::Uuid,
    pub requirement: StructuredRequirement,
    pub results: Vec<MatchResult>,
    #[serde(rename = "candidatesConsidered")]
    pub candidates_considered: usize,
    /// The requirement was parsed by keyword fallback
    pub degraded: bool,
    /// Some entities were dropped before scoring finished
    pub incomplete: bool,
    #[serde(rename = "startedAt")]
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "finishedAt")]
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

/// Score fusion weights for one entity type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f64,
    pub relevance: f64,
    pub rule: f64,
}

impl FusionWeights {
    /// Candidate matching leans on verifiable structured experience
    pub const CANDIDATE: FusionWeights = FusionWeights {
        vector: 0.15,
        relevance: 0.25,
        rule: 0.60,
    };

    /// Course recommendation leans on semantic relevance
    pub const COURSE: FusionWeights = FusionWeights {
        vector: 0.30,
        relevance: 0.50,
        rule: 0.20,
    };

    pub fn sum(&self) -> f64 {
        self.vector + self.relevance + self.rule
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::CANDIDATE
    }
}
