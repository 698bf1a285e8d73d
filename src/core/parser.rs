use std::sync::Arc;

use crate::core::pipeline::MatchError;
use crate::core::skills::{extract_keywords, normalize_skill};
use crate::models::{Seniority, SkillRequirement, StructuredRequirement};
use crate::services::{ExtractedRequirement, RequirementExtractor};

/// Turns free-text requirements into `StructuredRequirement`s
///
/// Extraction is delegated to the text-understanding capability. When that
/// fails the parser falls back to keyword matching and flags the result
/// `degraded`; callers should treat degraded runs as advisory.
#[derive(Clone)]
pub struct RequirementParser {
    extractor: Arc<dyn RequirementExtractor>,
}

impl RequirementParser {
    pub fn new(extractor: Arc<dyn RequirementExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn parse(&self, text: &str) -> Result<StructuredRequirement, MatchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MatchError::EmptyRequirement);
        }

        match self.extractor.extract(text).await {
            Ok(extracted) => {
                let requirement = from_extracted(text, extracted);
                tracing::debug!(
                    "Parsed requirement: {} skills, {} domain tags",
                    requirement.skills.len(),
                    requirement.domain_tags.len()
                );
                Ok(requirement)
            }
            Err(e) => {
                tracing::warn!("Requirement extraction failed, falling back to keywords: {}", e);
                Ok(degraded(text))
            }
        }
    }
}

/// Build a requirement from extracted fields
///
/// Required skills come first; a skill listed as both required and
/// preferred stays required. Minimum years default to 0.
pub fn from_extracted(text: &str, extracted: ExtractedRequirement) -> StructuredRequirement {
    let min_years: Vec<(String, f64)> = extracted
        .min_years_per_skill
        .iter()
        .map(|(skill, years)| (normalize_skill(skill), *years))
        .collect();

    let years_for = |skill: &str| -> f64 {
        min_years
            .iter()
            .find(|(s, _)| s == skill)
            .map(|(_, y)| if y.is_finite() { y.max(0.0) } else { 0.0 })
            .unwrap_or(0.0)
    };

    let mut skills: Vec<SkillRequirement> = Vec::new();
    let tagged = extracted
        .required_skills
        .iter()
        .map(|s| (s, true))
        .chain(extracted.preferred_skills.iter().map(|s| (s, false)));

    for (raw, required) in tagged {
        let skill = normalize_skill(raw);
        if skill.is_empty() || skills.iter().any(|s| s.skill == skill) {
            continue;
        }
        skills.push(SkillRequirement {
            min_years: years_for(&skill),
            skill,
            required,
        });
    }

    let mut domain_tags: Vec<String> = Vec::new();
    for tag in extracted.domain.iter().chain(extracted.domain_tags.iter()) {
        let tag = tag.trim();
        if !tag.is_empty() && !domain_tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            domain_tags.push(tag.to_string());
        }
    }

    StructuredRequirement {
        skills,
        domain_tags,
        seniority: extracted
            .seniority
            .as_deref()
            .map(Seniority::parse)
            .unwrap_or_default(),
        origin_text: text.to_string(),
        degraded: false,
    }
}

/// Keyword-only requirement used when extraction is unavailable
///
/// Every recovered keyword is an optional skill with no minimum years.
/// Gaps are only raised for required skills, so a degraded run ranks
/// candidates but never reports gaps or recommends courses.
pub fn degraded(text: &str) -> StructuredRequirement {
    StructuredRequirement {
        skills: extract_keywords(text)
            .into_iter()
            .map(|skill| SkillRequirement {
                skill,
                min_years: 0.0,
                required: false,
            })
            .collect(),
        domain_tags: Vec::new(),
        seniority: Seniority::default(),
        origin_text: text.to_string(),
        degraded: true,
    }
}
