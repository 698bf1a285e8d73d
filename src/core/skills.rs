use std::collections::BTreeMap;

/// Known skill spellings folded to one canonical name (canonical, aliases)
const SKILL_ALIASES: &[(&str, &[&str])] = &[
    ("rest api", &["rest apis", "restful api", "restful apis", "rest", "restful"]),
    ("spring boot", &["springboot", "spring-boot"]),
    ("spring framework", &["spring", "spring core"]),
    ("react.js", &["reactjs", "react", "react js"]),
    ("node.js", &["nodejs", "node js", "node"]),
    ("vue.js", &["vuejs", "vue"]),
    ("javascript", &["js", "ecmascript"]),
    ("typescript", &["ts"]),
    ("python", &["py", "python3"]),
    ("java", &["java programming", "java development"]),
    ("golang", &["go lang"]),
    ("c#", &["csharp", "c sharp"]),
    ("c++", &["cpp"]),
    ("postgresql", &["postgres", "psql"]),
    ("mysql", &["my sql"]),
    ("mongodb", &["mongo"]),
    ("aws", &["amazon web services"]),
    ("gcp", &["google cloud", "google cloud platform"]),
    ("azure", &["microsoft azure"]),
    ("kubernetes", &["k8s"]),
    ("machine learning", &["ml"]),
    ("ci/cd", &["cicd", "ci cd", "continuous integration"]),
];

/// Skills that imply knowledge of other skills
const SKILL_IMPLICATIONS: &[(&str, &[&str])] = &[
    ("spring boot", &["java", "spring framework"]),
    ("spring framework", &["java"]),
    ("react.js", &["javascript"]),
    ("node.js", &["javascript"]),
    ("vue.js", &["javascript"]),
    ("angular", &["typescript", "javascript"]),
    ("typescript", &["javascript"]),
    ("django", &["python"]),
    ("flask", &["python"]),
    ("pandas", &["python"]),
];

/// Additional canonical skills recognised by keyword extraction
const EXTRA_VOCABULARY: &[&str] = &[
    "angular", "django", "flask", "pandas", "rust", "scala", "kotlin", "swift", "php", "ruby",
    "sql", "terraform", "ansible", "linux", "kafka", "spark", "hadoop", "airflow", "snowflake",
    "redis", "graphql", "docker", "microservices", "devops", "tensorflow", "pytorch", "salesforce", "sap",
    "tableau", "power bi", "data engineering", "database migration",
];

/// Normalise a skill name to its canonical, case-folded form
///
/// Lowercases, trims, collapses internal whitespace and folds known aliases.
pub fn normalize_skill(skill: &str) -> String {
    let collapsed = skill
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    for (canonical, aliases) in SKILL_ALIASES {
        if collapsed == *canonical || aliases.contains(&collapsed.as_str()) {
            return (*canonical).to_string();
        }
    }

    collapsed
}

/// Normalise a skill → years map, merging aliases and clamping years to ≥ 0
///
/// When two raw keys fold to the same skill the larger experience wins.
pub fn normalize_skill_map<'a, I>(skills: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut normalized = BTreeMap::new();
    for (raw, years) in skills {
        let key = normalize_skill(raw);
        if key.is_empty() {
            continue;
        }
        let years = if years.is_finite() { years.max(0.0) } else { 0.0 };
        let entry = normalized.entry(key).or_insert(0.0_f64);
        *entry = entry.max(years);
    }
    normalized
}

/// Skills implied by holding `skill`
pub fn implied_skills(skill: &str) -> &'static [&'static str] {
    let normalized = normalize_skill(skill);
    SKILL_IMPLICATIONS
        .iter()
        .find(|(s, _)| *s == normalized)
        .map(|(_, implied)| *implied)
        .unwrap_or(&[])
}

/// Experience a candidate has in `skill`, if any
///
/// Looks up the canonical key first, then falls back to skills that imply it
/// (taking the most experienced one).
pub fn years_for(skills: &BTreeMap<String, f64>, skill: &str) -> Option<f64> {
    let wanted = normalize_skill(skill);

    if let Some(years) = skills.get(&wanted) {
        return Some(*years);
    }

    skills
        .iter()
        .filter(|(held, _)| implied_skills(held).contains(&wanted.as_str()))
        .map(|(_, years)| *years)
        .fold(None, |best: Option<f64>, y| Some(best.map_or(y, |b| b.max(y))))
}

/// Whether a candidate holds `skill` at all (directly or implied)
pub fn has_skill(skills: &BTreeMap<String, f64>, skill: &str) -> bool {
    years_for(skills, skill).is_some()
}

fn is_known_skill(term: &str) -> bool {
    SKILL_ALIASES
        .iter()
        .any(|(canonical, aliases)| *canonical == term || aliases.contains(&term))
        || SKILL_IMPLICATIONS.iter().any(|(s, _)| *s == term)
        || EXTRA_VOCABULARY.contains(&term)
}

/// Tokenise free text for keyword matching
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '/' | '-')))
        .map(|t| t.trim_matches(|c: char| c == '.' || c == '-').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Recover known skills from raw text by simple tokenisation
///
/// Matches single tokens and adjacent-token bigrams against the known skill
/// vocabulary. Results are canonical, de-duplicated and in order of first
/// appearance.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut found: Vec<String> = Vec::new();

    let mut push = |term: &str| {
        let canonical = normalize_skill(term);
        if !found.contains(&canonical) {
            found.push(canonical);
        }
    };

    for (i, token) in tokens.iter().enumerate() {
        if let Some(next) = tokens.get(i + 1) {
            let bigram = format!("{} {}", token, next);
            if is_known_skill(&bigram) {
                push(&bigram);
                continue;
            }
        }
        if is_known_skill(token) {
            push(token);
        }
    }

    found
}

/// Whether `text` names `skill` as whole tokens
///
/// "java" is not named by "JavaScript", nor "sql" by "PostgreSQL".
pub fn mentions_skill(text: &str, skill: &str) -> bool {
    let wanted = tokenize(skill);
    if wanted.is_empty() {
        return false;
    }
    tokenize(text).windows(wanted.len()).any(|window| window == wanted.as_slice())
}

/// Case-insensitive domain tag overlap (substring either way)
pub fn domains_overlap(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}
