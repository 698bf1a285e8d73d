use crate::core::skills::{domains_overlap, extract_keywords, has_skill, mentions_skill, normalize_skill, years_for};
use crate::models::{CandidateProfile, CourseLevel, CourseProfile, GapKind, SkillGap, StructuredRequirement};

/// Weight of a required skill in the candidate rule score
const REQUIRED_SKILL_WEIGHT: f64 = 1.0;
/// Weight of an optional skill in the candidate rule score
const OPTIONAL_SKILL_WEIGHT: f64 = 0.5;

/// Course rule components
const COURSE_COVERAGE_WEIGHT: f64 = 0.4;
const COURSE_PREREQUISITE_WEIGHT: f64 = 0.3;
const COURSE_LEVEL_WEIGHT: f64 = 0.3;

/// Gap severity (years) from which a course should start from the basics
const FOUNDATIONAL_SEVERITY: f64 = 3.0;

/// Deterministic rule score plus the skills that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub score: f64,
    pub matched: Vec<String>,
}

/// Rule score of a candidate against a requirement (0-1)
///
/// Scoring formula:
/// skills = Σ weight * min(years / max(min_years, 1), 1) / Σ weight
///     weight = 1.0 for required skills, 0.5 for optional ones
///     skills = 1.0 when the requirement names no skills
/// score = clamp(skills + domain_bonus if any domain tag overlaps)
pub fn candidate_rule_score(
    requirement: &StructuredRequirement,
    candidate: &CandidateProfile,
    domain_bonus: f64,
) -> RuleOutcome {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut matched = Vec::new();

    for skill in &requirement.skills {
        let weight = if skill.required {
            REQUIRED_SKILL_WEIGHT
        } else {
            OPTIONAL_SKILL_WEIGHT
        };
        total_weight += weight;

        let years = years_for(&candidate.skills, &skill.skill).unwrap_or(0.0);
        let contribution = (years / skill.min_years.max(1.0)).min(1.0).max(0.0);
        weighted += weight * contribution;

        if contribution > 0.0 {
            matched.push(skill.skill.clone());
        }
    }

    let skill_score = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        1.0
    };

    let domain_match = requirement.domain_tags.iter().any(|wanted| {
        candidate
            .domain_tags
            .iter()
            .any(|held| domains_overlap(wanted, held))
    });
    let bonus = if domain_match { domain_bonus.max(0.0) } else { 0.0 };

    RuleOutcome {
        score: (skill_score + bonus).clamp(0.0, 1.0),
        matched,
    }
}

/// Rule score of a course for closing a candidate's gaps (0-1)
///
/// Scoring formula:
/// score = (
///     coverage * 0.4 +        # gap skills the course covers
///     prerequisites * 0.3 +   # prerequisites the candidate already holds
///     level_fit * 0.3         # course level vs. gap severity
/// )
///
/// An unmet prerequisite lowers the score but never excludes the course.
pub fn course_rule_score(
    gaps: &[SkillGap],
    course: &CourseProfile,
    candidate: &CandidateProfile,
) -> RuleOutcome {
    let course_text = format!("{} {}", course.title, course.description).to_lowercase();
    let course_keywords = extract_keywords(&course_text);

    let matched: Vec<String> = gaps
        .iter()
        .filter(|gap| {
            let skill = normalize_skill(&gap.skill);
            course_keywords.contains(&skill) || mentions_skill(&course_text, &skill)
        })
        .map(|gap| gap.skill.clone())
        .collect();

    let coverage = if gaps.is_empty() {
        0.0
    } else {
        matched.len() as f64 / gaps.len() as f64
    };

    let prerequisites = prerequisite_score(&course.prerequisites, candidate);
    let level_fit = level_fit_score(gaps, course.level);

    let score = coverage * COURSE_COVERAGE_WEIGHT
        + prerequisites * COURSE_PREREQUISITE_WEIGHT
        + level_fit * COURSE_LEVEL_WEIGHT;

    RuleOutcome {
        score: score.clamp(0.0, 1.0),
        matched,
    }
}

/// Fraction of prerequisites the candidate plausibly satisfies
#[inline]
fn prerequisite_score(prerequisites: &[String], candidate: &CandidateProfile) -> f64 {
    if prerequisites.is_empty() {
        return 1.0;
    }

    let satisfied = prerequisites
        .iter()
        .filter(|prereq| {
            has_skill(&candidate.skills, prereq)
                || extract_keywords(prereq)
                    .iter()
                    .any(|skill| has_skill(&candidate.skills, skill))
        })
        .count();

    satisfied as f64 / prerequisites.len() as f64
}

/// How well the course level suits the gaps
///
/// Missing skills and large shortfalls call for beginner/intermediate
/// material, small shortfalls for intermediate/advanced.
#[inline]
fn level_fit_score(gaps: &[SkillGap], level: CourseLevel) -> f64 {
    let foundational = gaps
        .iter()
        .any(|g| g.kind == GapKind::Missing || g.gap_severity >= FOUNDATIONAL_SEVERITY);

    match (foundational, level) {
        (true, CourseLevel::Beginner | CourseLevel::Intermediate) => 1.0,
        (false, CourseLevel::Intermediate | CourseLevel::Advanced) => 1.0,
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::skills::normalize_skill_map;
    use crate::models::{Seniority, SkillRequirement};

    fn requirement(skills: &[(&str, f64, bool)], domains: &[&str]) -> StructuredRequirement {
        StructuredRequirement {
            skills: skills
                .iter()
                .map(|(s, y, r)| SkillRequirement {
                    skill: s.to_string(),
                    min_years: *y,
                    required: *r,
                })
                .collect(),
            domain_tags: domains.iter().map(|d| d.to_string()).collect(),
            seniority: Seniority::Mid,
            origin_text: "test".to_string(),
            degraded: false,
        }
    }

    fn candidate(skills: &[(&str, f64)], domains: &[&str]) -> CandidateProfile {
        CandidateProfile {
            id: "c1".to_string(),
            name: "Test".to_string(),
            skills: normalize_skill_map(skills.iter().copied()),
            domain_tags: domains.iter().map(|d| d.to_string()).collect(),
            raw_text: String::new(),
            experience_summary: None,
            embedding: vec![],
        }
    }

    fn course(title: &str, level: CourseLevel, prerequisites: &[&str]) -> CourseProfile {
        CourseProfile {
            id: "k1".to_string(),
            title: title.to_string(),
            description: String::new(),
            level,
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            url: None,
            embedding: vec![],
        }
    }

    fn gap(skill: &str, severity: f64, kind: GapKind) -> SkillGap {
        SkillGap {
            skill: skill.to_string(),
            required_years: severity,
            candidate_years: 0.0,
            gap_severity: severity,
            kind,
        }
    }

    #[test]
    fn test_half_coverage_scores_half() {
        let req = requirement(&[("python", 3.0, true), ("aws", 2.0, true)], &[]);
        let cand = candidate(&[("Python", 5.0)], &[]);

        let outcome = candidate_rule_score(&req, &cand, 0.1);
        assert!((outcome.score - 0.5).abs() < 1e-9);
        assert_eq!(outcome.matched, vec!["python"]);
    }

    #[test]
    fn test_partial_experience_and_optional_weight() {
        // required: 1/2 of 4y -> 0.5 * 1.0, optional: full -> 1.0 * 0.5
        let req = requirement(&[("java", 4.0, true), ("docker", 1.0, false)], &[]);
        let cand = candidate(&[("Java", 2.0), ("Docker", 3.0)], &[]);

        let outcome = candidate_rule_score(&req, &cand, 0.0);
        assert!((outcome.score - (0.5 + 0.5) / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_minimum_years_uses_one_year_floor() {
        let req = requirement(&[("sql", 0.0, true)], &[]);
        let cand = candidate(&[("SQL", 0.5)], &[]);

        let outcome = candidate_rule_score(&req, &cand, 0.0);
        assert!((outcome.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_domain_bonus_is_flat_and_clamped() {
        let req = requirement(&[("python", 1.0, true)], &["Fintech"]);
        let matching = candidate(&[("python", 2.0)], &["fintech", "payments"]);
        let partial = candidate(&[], &["fintech"]);

        assert_eq!(candidate_rule_score(&req, &matching, 0.1).score, 1.0);
        assert!((candidate_rule_score(&req, &partial, 0.1).score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_requirement_scores_full() {
        let req = requirement(&[], &[]);
        let cand = candidate(&[], &[]);
        assert_eq!(candidate_rule_score(&req, &cand, 0.1).score, 1.0);
    }

    #[test]
    fn test_rule_score_is_deterministic() {
        let req = requirement(&[("python", 3.0, true), ("react", 2.0, false)], &["retail"]);
        let cand = candidate(&[("Python", 1.5), ("ReactJS", 4.0)], &["Retail Banking"]);

        let first = candidate_rule_score(&req, &cand, 0.1);
        for _ in 0..10 {
            assert_eq!(candidate_rule_score(&req, &cand, 0.1), first);
        }
    }

    #[test]
    fn test_course_rule_prefers_covering_course() {
        let cand = candidate(&[("python", 5.0)], &[]);
        let gaps = vec![gap("aws", 2.0, GapKind::Missing)];

        let covering = course("AWS Fundamentals", CourseLevel::Beginner, &["Python basics"]);
        let unrelated = course("Advanced Excel", CourseLevel::Advanced, &["Excel"]);

        let good = course_rule_score(&gaps, &covering, &cand);
        let bad = course_rule_score(&gaps, &unrelated, &cand);

        assert!((good.score - 1.0).abs() < 1e-9);
        assert_eq!(good.matched, vec!["aws"]);
        assert!((bad.score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_unmet_prerequisite_lowers_but_keeps_course() {
        let cand = candidate(&[], &[]);
        let gaps = vec![gap("kubernetes", 1.0, GapKind::Insufficient)];
        let k8s = course("Kubernetes in Production", CourseLevel::Advanced, &["Docker"]);

        let outcome = course_rule_score(&gaps, &k8s, &cand);
        assert!((outcome.score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_course_coverage_needs_whole_skill_names() {
        let cand = candidate(&[], &[]);
        let gaps = vec![gap("java", 2.0, GapKind::Missing), gap("sql", 1.0, GapKind::Missing)];

        let javascript = course("JavaScript Essentials", CourseLevel::Beginner, &[]);
        let postgres = course("PostgreSQL Administration", CourseLevel::Beginner, &[]);
        let java = course("Java for Backend Developers", CourseLevel::Beginner, &[]);

        assert!(course_rule_score(&gaps, &javascript, &cand).matched.is_empty());
        assert!(course_rule_score(&gaps, &postgres, &cand).matched.is_empty());
        assert_eq!(course_rule_score(&gaps, &java, &cand).matched, vec!["java"]);
    }
}
