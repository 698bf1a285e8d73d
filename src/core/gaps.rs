use std::cmp::Ordering;

use crate::core::skills::years_for;
use crate::models::{CandidateProfile, GapKind, SkillGap, StructuredRequirement};

/// Detect missing or under-experienced required skills
///
/// Only skills flagged `required` are checked. A skill absent from the
/// candidate's map (directly or implied) is `Missing` with 0 years; one
/// held with fewer than the minimum years is `Insufficient`.
///
/// Gaps are ordered by descending severity, then skill name ascending.
pub fn detect_gaps(requirement: &StructuredRequirement, candidate: &CandidateProfile) -> Vec<SkillGap> {
    let mut gaps: Vec<SkillGap> = requirement
        .required_skills()
        .filter_map(|wanted| {
            let required_years = wanted.min_years.max(0.0);

            match years_for(&candidate.skills, &wanted.skill) {
                None => Some(SkillGap {
                    skill: wanted.skill.clone(),
                    required_years,
                    candidate_years: 0.0,
                    gap_severity: required_years,
                    kind: GapKind::Missing,
                }),
                Some(years) if years < required_years => Some(SkillGap {
                    skill: wanted.skill.clone(),
                    required_years,
                    candidate_years: years,
                    gap_severity: (required_years - years).max(0.0),
                    kind: GapKind::Insufficient,
                }),
                Some(_) => None,
            }
        })
        .collect();

    gaps.sort_by(compare_gaps);
    gaps
}

#[inline]
fn compare_gaps(a: &SkillGap, b: &SkillGap) -> Ordering {
    b.gap_severity
        .total_cmp(&a.gap_severity)
        .then_with(|| a.skill.cmp(&b.skill))
}
