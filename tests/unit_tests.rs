// Unit tests for Talent Match scoring building blocks

use std::collections::BTreeMap;

use talent_match::core::gaps::detect_gaps;
use talent_match::core::parser::from_extracted;
use talent_match::core::rules::{candidate_rule_score, course_rule_score};
use talent_match::core::scoring::{compare_ranked, ScoreFuser};
use talent_match::core::similarity::{cosine_similarity, normalize_hits};
use talent_match::core::skills::{normalize_skill, normalize_skill_map};
use talent_match::models::responses::to_percentage;
use talent_match::models::{
    CandidateProfile, CourseLevel, CourseProfile, FusionWeights, MatchQuality, QualityThresholds, Seniority,
    SkillRequirement, StructuredRequirement,
};
use talent_match::services::{ExtractedRequirement, Relevance, SimilarityHit};

fn requirement(skills: &[(&str, f64, bool)], domains: &[&str]) -> StructuredRequirement {
    StructuredRequirement {
        skills: skills
            .iter()
            .map(|(s, y, r)| SkillRequirement {
                skill: normalize_skill(s),
                min_years: *y,
                required: *r,
            })
            .collect(),
        domain_tags: domains.iter().map(|d| d.to_string()).collect(),
        seniority: Seniority::Mid,
        origin_text: "unit".to_string(),
        degraded: false,
    }
}

fn candidate(skills: &[(&str, f64)], domains: &[&str]) -> CandidateProfile {
    CandidateProfile {
        id: "c1".to_string(),
        name: "Unit".to_string(),
        skills: normalize_skill_map(skills.iter().copied()),
        domain_tags: domains.iter().map(|d| d.to_string()).collect(),
        raw_text: String::new(),
        experience_summary: None,
        embedding: vec![],
    }
}

#[test]
fn test_rule_score_half_coverage() {
    let req = requirement(&[("Python", 3.0, true), ("AWS", 2.0, true)], &[]);
    let outcome = candidate_rule_score(&req, &candidate(&[("Python", 5.0)], &[]), 0.1);

    assert!((outcome.score - 0.5).abs() < 1e-12);
    assert_eq!(outcome.matched, vec!["python"]);
}

#[test]
fn test_rule_score_is_deterministic() {
    let req = requirement(&[("Python", 3.0, true), ("React", 2.0, false)], &["fintech"]);
    let cand = candidate(&[("Python", 2.0), ("ReactJS", 1.0)], &["FinTech payments"]);

    let first = candidate_rule_score(&req, &cand, 0.1);
    for _ in 0..10 {
        assert_eq!(candidate_rule_score(&req, &cand, 0.1), first);
    }
}

#[test]
fn test_domain_bonus_is_clamped() {
    let req = requirement(&[("Python", 1.0, true)], &["Cloud"]);
    let outcome = candidate_rule_score(&req, &candidate(&[("Python", 9.0)], &["cloud computing"]), 0.25);
    assert_eq!(outcome.score, 1.0);
}

#[test]
fn test_spring_boot_implies_java() {
    let req = requirement(&[("Java", 3.0, true)], &[]);
    let cand = candidate(&[("Spring Boot", 4.0)], &[]);

    assert_eq!(candidate_rule_score(&req, &cand, 0.0).score, 1.0);
    assert!(detect_gaps(&req, &cand).is_empty());
}

#[test]
fn test_course_rule_prefers_covering_course() {
    let req = requirement(&[("Terraform", 2.0, true)], &[]);
    let cand = candidate(&[("AWS", 3.0)], &[]);
    let gaps = detect_gaps(&req, &cand);

    let course = |title: &str| CourseProfile {
        id: title.to_lowercase(),
        title: title.to_string(),
        description: "Hands-on labs".to_string(),
        level: CourseLevel::Beginner,
        prerequisites: vec!["AWS".to_string()],
        url: None,
        embedding: vec![],
    };

    let covering = course_rule_score(&gaps, &course("Terraform Basics"), &cand);
    let unrelated = course_rule_score(&gaps, &course("Intro to Figma"), &cand);

    assert!(covering.score > unrelated.score);
    assert_eq!(covering.matched, vec!["terraform"]);
    assert!((covering.score - 1.0).abs() < 1e-12);
}

#[test]
fn test_fused_score_bounds() {
    let fuser = ScoreFuser::new(FusionWeights::COURSE);
    for (v, r, rule) in [(0.0, 0.0, 0.0), (1.0, 1.0, 1.0), (-3.0, 7.0, f64::NAN), (0.4, 0.9, 0.1)] {
        let fused = fuser.fuse(v, r, rule);
        assert!((0.0..=1.0).contains(&fused));
    }
}

#[test]
fn test_failed_relevance_is_neutral_and_partial() {
    let fuser = ScoreFuser::new(FusionWeights::CANDIDATE);
    let rule = candidate_rule_score(
        &requirement(&[("Python", 1.0, true)], &[]),
        &candidate(&[("Python", 1.0)], &[]),
        0.0,
    );

    let ok = fuser.breakdown(0.8, Some(Relevance { score: 0.9, evidence: vec!["Python".into()] }), rule.clone());
    let failed = fuser.breakdown(0.8, None, rule);

    assert!(!ok.partial);
    assert!(failed.partial);
    assert_eq!(failed.relevance_score, 0.5);
    // rule evidence and scorer evidence merge case-insensitively
    assert_eq!(ok.evidence, vec!["python"]);
}

#[test]
fn test_ranking_order_is_total() {
    let mut items = vec![(0.7, "b"), (0.9, "z"), (0.7, "a"), (f64::NAN, "n"), (0.9, "c")];
    let mut reversed = items.clone();
    reversed.reverse();

    items.sort_by(|x, y| compare_ranked(x.0, x.1, y.0, y.1));
    reversed.sort_by(|x, y| compare_ranked(x.0, x.1, y.0, y.1));

    let ids: Vec<&str> = items.iter().map(|i| i.1).collect();
    let ids_rev: Vec<&str> = reversed.iter().map(|i| i.1).collect();
    assert_eq!(ids, ids_rev);
    assert_eq!(&ids[1..], &["c", "z", "a", "b"]);
}

#[test]
fn test_cosine_similarity_basics() {
    assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
}

#[test]
fn test_hits_respect_threshold_cap_and_ties() {
    let hits = vec![
        SimilarityHit { id: "d".into(), similarity: 0.30 },
        SimilarityHit { id: "b".into(), similarity: 0.80 },
        SimilarityHit { id: "a".into(), similarity: 0.80 },
        SimilarityHit { id: "b".into(), similarity: 0.60 },
        SimilarityHit { id: "c".into(), similarity: 0.50 },
    ];
    let out = normalize_hits(hits, 0.3, 2);
    let ids: Vec<&str> = out.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(out[1].similarity, 0.80);
}

#[test]
fn test_extracted_requirement_mapping() {
    let extracted = ExtractedRequirement {
        required_skills: vec!["Node".to_string()],
        preferred_skills: vec!["Docker".to_string()],
        min_years_per_skill: [("nodejs".to_string(), 4.0)].into_iter().collect(),
        seniority: Some("Lead".to_string()),
        ..ExtractedRequirement::default()
    };
    let req = from_extracted("Lead Node engineer", extracted);

    assert_eq!(req.seniority, Seniority::Lead);
    assert_eq!(req.skills[0].skill, "node.js");
    assert_eq!(req.skills[0].min_years, 4.0);
    assert!(req.skills[0].required);
    assert!(!req.skills[1].required);
}

#[test]
fn test_percentage_and_quality_at_boundary() {
    let thresholds = QualityThresholds::default();
    assert_eq!(to_percentage(0.746), 75);
    assert_eq!(to_percentage(0.5), 50);
    assert_eq!(MatchQuality::classify(0.75, &thresholds), MatchQuality::Strong);
    assert_eq!(MatchQuality::classify(0.5, &thresholds), MatchQuality::Moderate);
    assert_eq!(MatchQuality::classify(0.49, &thresholds), MatchQuality::Weak);
}

#[test]
fn test_skill_map_keys_are_canonical() {
    let skills: BTreeMap<String, f64> = normalize_skill_map([("K8s", 2.0), ("Amazon Web Services", 3.0)]);
    assert_eq!(skills.get("kubernetes"), Some(&2.0));
    assert_eq!(skills.get("aws"), Some(&3.0));
}
