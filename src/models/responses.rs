use serde::{Deserialize, Serialize};
use crate::models::domain::{
    CourseLevel, MatchResult, MatchRun, ScoreBreakdown, SkillGap, StructuredRequirement,
};

/// Percentage cut-offs for match quality labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub strong: f64,
    pub moderate: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            strong: 0.75,
            moderate: 0.50,
        }
    }
}

/// Coarse label for a candidate's fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Strong,
    Moderate,
    Weak,
}

impl MatchQuality {
    pub fn classify(fused_score: f64, thresholds: &QualityThresholds) -> Self {
        if fused_score >= thresholds.strong {
            MatchQuality::Strong
        } else if fused_score >= thresholds.moderate {
            MatchQuality::Moderate
        } else {
            MatchQuality::Weak
        }
    }
}

/// Convert an internal [0,1] score to a presentation percentage
pub fn to_percentage(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Score components as percentages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreView {
    #[serde(rename = "matchPercentage")]
    pub match_percentage: u8,
    #[serde(rename = "vectorPercentage")]
    pub vector_percentage: u8,
    #[serde(rename = "relevancePercentage")]
    pub relevance_percentage: u8,
    #[serde(rename = "rulePercentage")]
    pub rule_percentage: u8,
    pub evidence: Vec<String>,
    pub partial: bool,
}

impl From<&ScoreBreakdown> for ScoreView {
    fn from(b: &ScoreBreakdown) -> Self {
        Self {
            match_percentage: to_percentage(b.fused_score),
            vector_percentage: to_percentage(b.vector_score),
            relevance_percentage: to_percentage(b.relevance_score),
            rule_percentage: to_percentage(b.rule_score),
            evidence: b.evidence.clone(),
            partial: b.partial,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseView {
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub title: String,
    pub level: CourseLevel,
    pub url: Option<String>,
    pub score: ScoreView,
    #[serde(rename = "gapsAddressed")]
    pub gaps_addressed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateView {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub name: String,
    pub quality: MatchQuality,
    pub score: ScoreView,
    pub gaps: Vec<SkillGap>,
    pub courses: Vec<CourseView>,
}

impl CandidateView {
    pub fn from_result(result: &MatchResult, thresholds: &QualityThresholds) -> Self {
        Self {
            candidate_id: result.candidate_id.clone(),
            name: result.name.clone(),
            quality: MatchQuality::classify(result.breakdown.fused_score, thresholds),
            score: ScoreView::from(&result.breakdown),
            gaps: result.gaps.clone(),
            courses: result
                .courses
                .iter()
                .map(|c| CourseView {
                    course_id: c.course.id.clone(),
                    title: c.course.title.clone(),
                    level: c.course.level,
                    url: c.course.url.clone(),
                    score: ScoreView::from(&c.breakdown),
                    gaps_addressed: c.gaps_addressed.clone(),
                })
                .collect(),
        }
    }
}

/// Response for the match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "runId")]
    pub run_id: String,
    pub requirement: StructuredRequirement,
    pub candidates: Vec<CandidateView>,
    #[serde(rename = "candidatesConsidered")]
    pub candidates_considered: usize,
    pub degraded: bool,
    pub incomplete: bool,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: i64,
}

impl MatchResponse {
    pub fn from_run(run: &MatchRun, thresholds: &QualityThresholds) -> Self {
        Self {
            run_id: run.run_id.to_string(),
            requirement: run.requirement.clone(),
            candidates: run
                .results
                .iter()
                .map(|r| CandidateView::from_result(r, thresholds))
                .collect(),
            candidates_considered: run.candidates_considered,
            degraded: run.degraded,
            incomplete: run.incomplete,
            elapsed_ms: (run.finished_at - run.started_at).num_milliseconds(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(to_percentage(0.0), 0);
        assert_eq!(to_percentage(0.555), 56);
        assert_eq!(to_percentage(0.994), 99);
        assert_eq!(to_percentage(1.0), 100);
        assert_eq!(to_percentage(1.7), 100);
    }

    #[test]
    fn test_quality_classification() {
        let thresholds = QualityThresholds::default();
        assert_eq!(MatchQuality::classify(0.80, &thresholds), MatchQuality::Strong);
        assert_eq!(MatchQuality::classify(0.75, &thresholds), MatchQuality::Strong);
        assert_eq!(MatchQuality::classify(0.60, &thresholds), MatchQuality::Moderate);
        assert_eq!(MatchQuality::classify(0.10, &thresholds), MatchQuality::Weak);
    }
}
