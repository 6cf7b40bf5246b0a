//! Heuristic complexity estimation for inbound prompts
//!
//! Scores a prompt on four independent factors (length, trigger keywords,
//! code presence, task type) and combines them into a single weighted
//! complexity in `[0, 1]`. Pure pattern matching, no I/O, deterministic.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use frugal_config::{EstimatorConfig, WeightsConfig};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::error::RoutingError;

/// Trigger keywords used when the configuration does not replace them
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "explain",
    "analyze",
    "analyse",
    "architecture",
    "design",
    "implement",
    "optimize",
    "refactor",
    "debug",
    "algorithm",
    "compare",
    "evaluate",
    "comprehensive",
    "tradeoff",
    "trade-off",
    "prove",
    "derive",
    "concurrency",
    "distributed",
    "scalability",
    "security",
    "performance",
];

/// Allowed drift when checking that weights sum to one
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Number of distinct structural code signals that mark a prompt as code
const CODE_SIGNAL_THRESHOLD: usize = 2;

/// Relative importance of each factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorWeights {
    pub length: f64,
    pub keyword: f64,
    pub code: f64,
    pub task_type: f64,
}

impl FactorWeights {
    /// Build a weight set, rejecting any that does not sum to one
    pub fn new(length: f64, keyword: f64, code: f64, task_type: f64) -> Result<Self, RoutingError> {
        let total = length + keyword + code + task_type;
        let in_range = [length, keyword, code, task_type]
            .iter()
            .all(|w| (0.0..=1.0).contains(w));

        if !in_range || (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RoutingError::InvalidWeights { total });
        }

        Ok(Self {
            length,
            keyword,
            code,
            task_type,
        })
    }

    /// Sum of all four weights
    pub fn total(&self) -> f64 {
        self.length + self.keyword + self.code + self.task_type
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            length: 0.30,
            keyword: 0.30,
            code: 0.25,
            task_type: 0.15,
        }
    }
}

impl TryFrom<&WeightsConfig> for FactorWeights {
    type Error = RoutingError;

    fn try_from(config: &WeightsConfig) -> Result<Self, Self::Error> {
        Self::new(config.length, config.keyword, config.code, config.task_type)
    }
}

/// Broad task bucket of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Review, comparison, debugging, diagnosis
    Analysis,
    /// Writing or building something new
    Generation,
    /// Stories, poems, open-ended composition
    Creative,
    /// Short direct question
    Question,
    /// Anything else
    General,
}

impl TaskType {
    /// Factor value contributed by this bucket
    pub const fn weight(self) -> f64 {
        match self {
            Self::Analysis => 1.0,
            Self::Generation => 0.8,
            Self::Creative => 0.6,
            Self::General => 0.4,
            Self::Question => 0.1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Generation => "generation",
            Self::Creative => "creative",
            Self::Question => "question",
            Self::General => "general",
        }
    }
}

/// Per-factor scores for one prompt, each in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityFactors {
    pub length_score: f64,
    pub keyword_score: f64,
    pub code_score: f64,
    pub task_type_score: f64,
    /// Bucket that produced `task_type_score`
    pub task_type: TaskType,
    /// Distinct trigger keywords found, lowercased
    pub matched_keywords: Vec<String>,
    /// Prompt length in characters
    pub char_count: usize,
}

/// Result of estimating one prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub complexity: f64,
    pub factors: ComplexityFactors,
    pub reasoning: String,
}

// -- Regex patterns compiled once via LazyLock --

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```").unwrap());

/// Structural signals; any two of them mark the prompt as code
static CODE_SIGNALS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Indented code line
        r"(?m)^(?: {4}|\t)\S",
        // Definition keyword followed by a name
        r"\b(?:fn|def|class|function|func|struct|impl|interface)\s+\w+",
        // Import statement
        r#"(?m)^\s*(?:import\s+[\w.{*]|from\s+[\w.]+\s+import\b|use\s+\w+(?:::\w+)+|#include\s*[<"])"#,
        // Statement-terminating semicolon
        r"(?m);\s*$",
        // Brace-delimited block
        r"\{[^{}]*\}",
        // Arrow operator
        r"->|=>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Ordered task rules, first match wins
static TASK_RULES: LazyLock<Vec<(TaskType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            TaskType::Analysis,
            Regex::new(r"(?i)\b(?:analy[sz]e|analysis|compare|evaluate|review|debug|diagnose|explain\s+why)\b").unwrap(),
        ),
        (
            TaskType::Generation,
            Regex::new(r"(?i)\b(?:write|implement|create|build|generate|develop|refactor)\b").unwrap(),
        ),
        (
            TaskType::Creative,
            Regex::new(r"(?i)\b(?:story|poem|imagine|compose|lyrics)\b").unwrap(),
        ),
        (
            TaskType::Question,
            Regex::new(r"(?i)(?:\?\s*$|^\s*(?:what|who|when|where|which|how|is|are|define)\b)").unwrap(),
        ),
    ]
});

/// Weighted four-factor complexity estimator
#[derive(Debug, Clone)]
pub struct ComplexityEstimator {
    weights: FactorWeights,
    keywords: Option<Regex>,
    length_ceiling: usize,
    max_keyword_matches: usize,
}

impl ComplexityEstimator {
    /// Build an estimator from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the weights do not sum to one or the keyword
    /// list cannot be compiled
    pub fn new(config: &EstimatorConfig) -> Result<Self, RoutingError> {
        let weights = FactorWeights::try_from(&config.weights)?;
        let keywords = match &config.keywords {
            Some(custom) => compile_keywords(custom.iter().map(String::as_str))?,
            None => compile_keywords(DEFAULT_KEYWORDS.iter().copied())?,
        };

        Ok(Self {
            weights,
            keywords,
            length_ceiling: config.length_ceiling.max(1),
            max_keyword_matches: config.max_keyword_matches.max(1),
        })
    }

    /// Active factor weights
    pub const fn weights(&self) -> FactorWeights {
        self.weights
    }

    /// Score a prompt
    pub fn estimate(&self, prompt: &str) -> Estimate {
        let char_count = prompt.chars().count();
        let matched_keywords = self.matched_keywords(prompt);
        let task_type = classify_task(prompt);

        let factors = ComplexityFactors {
            length_score: self.length_score(char_count),
            keyword_score: self.keyword_score(matched_keywords.len()),
            code_score: code_score(prompt),
            task_type_score: task_type.weight(),
            task_type,
            matched_keywords,
            char_count,
        };

        let weighted = self.weights.length * factors.length_score
            + self.weights.keyword * factors.keyword_score
            + self.weights.code * factors.code_score
            + self.weights.task_type * factors.task_type_score;
        let complexity = weighted.clamp(0.0, 1.0);

        let reasoning = reasoning(complexity, &factors);

        tracing::debug!(
            complexity,
            length = factors.length_score,
            keywords = factors.keyword_score,
            code = factors.code_score,
            task_type = task_type.as_str(),
            "prompt complexity estimated"
        );

        Estimate {
            complexity,
            factors,
            reasoning,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn length_score(&self, char_count: usize) -> f64 {
        (char_count as f64 / self.length_ceiling as f64).min(1.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn keyword_score(&self, matches: usize) -> f64 {
        (matches as f64 / self.max_keyword_matches as f64).min(1.0)
    }

    fn matched_keywords(&self, prompt: &str) -> Vec<String> {
        let Some(ref keywords) = self.keywords else {
            return Vec::new();
        };

        keywords
            .find_iter(prompt)
            .map(|m| m.as_str().to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Compile the trigger list into one case-insensitive, word-bounded pattern
///
/// Longer keywords come first so that overlapping entries prefer the
/// longest match. Half boundaries only look outside the term, so keywords
/// that start or end with punctuation (`c++`, `.net`) still match.
fn compile_keywords<'a>(keywords: impl Iterator<Item = &'a str>) -> Result<Option<Regex>, RoutingError> {
    let mut terms: Vec<String> = keywords
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| regex::escape(&k.to_lowercase()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if terms.is_empty() {
        return Ok(None);
    }

    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));

    RegexBuilder::new(&format!(r"\b{{start-half}}(?:{})\b{{end-half}}", terms.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| RoutingError::InvalidKeywords(e.to_string()))
}

/// 1.0 for a fenced block or at least two structural signals, else 0.0
fn code_score(prompt: &str) -> f64 {
    if CODE_FENCE_RE.is_match(prompt) {
        return 1.0;
    }

    let signals = CODE_SIGNALS.iter().filter(|re| re.is_match(prompt)).count();
    if signals >= CODE_SIGNAL_THRESHOLD { 1.0 } else { 0.0 }
}

fn classify_task(prompt: &str) -> TaskType {
    TASK_RULES
        .iter()
        .find(|(_, re)| re.is_match(prompt))
        .map_or(TaskType::General, |(task, _)| *task)
}

fn reasoning(complexity: f64, factors: &ComplexityFactors) -> String {
    let keywords = if factors.matched_keywords.is_empty() {
        "none".to_owned()
    } else {
        factors.matched_keywords.join(" ")
    };

    let mut out = String::new();
    let _ = write!(
        out,
        "complexity {complexity:.2}: length {:.2} ({} chars), keywords {:.2} ({keywords}), code {:.2}, task {} ({:.2})",
        factors.length_score,
        factors.char_count,
        factors.keyword_score,
        factors.code_score,
        factors.task_type.as_str(),
        factors.task_type_score,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> ComplexityEstimator {
        ComplexityEstimator::new(&EstimatorConfig::default()).unwrap()
    }

    fn long_code_prompt() -> String {
        let body = "    let mut total = 0;\n".repeat(100);
        format!("Please review this algorithm and make it faster:\n```rust\nfn sum(values: &[u64]) -> u64 {{\n{body}}}\n```")
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!((FactorWeights::default().total() - 1.0).abs() < 1e-9);
        assert!((estimator().weights().total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unbalanced_weights() {
        let err = FactorWeights::new(0.5, 0.5, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidWeights { .. }));
        assert!(FactorWeights::new(1.2, -0.2, 0.0, 0.0).is_err());
    }

    #[test]
    fn short_question_is_low_complexity() {
        let estimate = estimator().estimate("What is 2+2?");

        assert!(estimate.complexity < 0.3, "got {}", estimate.complexity);
        assert_eq!(estimate.factors.task_type, TaskType::Question);
        assert!(estimate.factors.code_score.abs() < f64::EPSILON);
        assert!(estimate.factors.matched_keywords.is_empty());
    }

    #[test]
    fn long_fenced_code_with_keyword_is_high_complexity() {
        let estimate = estimator().estimate(&long_code_prompt());

        assert!((estimate.factors.code_score - 1.0).abs() < f64::EPSILON);
        assert!(estimate.factors.keyword_score > 0.0);
        assert_eq!(estimate.factors.matched_keywords, vec!["algorithm".to_owned()]);
        assert!((estimate.factors.length_score - 1.0).abs() < f64::EPSILON);
        assert!(estimate.complexity > 0.6, "got {}", estimate.complexity);
    }

    #[test]
    fn complexity_stays_in_unit_interval() {
        let estimator = estimator();
        let long = "x".repeat(50_000);
        let keywords = DEFAULT_KEYWORDS.join(" ");
        let code = long_code_prompt();
        let prompts = ["", " ", "hi", "?", long.as_str(), keywords.as_str(), code.as_str()];

        for prompt in prompts {
            let estimate = estimator.estimate(prompt);
            assert!((0.0..=1.0).contains(&estimate.complexity), "out of range for {prompt:?}");
            for score in [
                estimate.factors.length_score,
                estimate.factors.keyword_score,
                estimate.factors.code_score,
                estimate.factors.task_type_score,
            ] {
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn estimation_is_deterministic() {
        let estimator = estimator();
        let prompt = "Compare the tradeoff between distributed locks and optimistic concurrency.";
        assert_eq!(estimator.estimate(prompt), estimator.estimate(prompt));
    }

    #[test]
    fn length_score_is_monotonic_and_saturates() {
        let estimator = estimator();
        let mut previous = 0.0;
        for len in [0, 10, 500, 1999, 2000, 2001, 10_000] {
            let score = estimator.estimate(&"a".repeat(len)).factors.length_score;
            assert!(score >= previous);
            previous = score;
        }
        assert!((previous - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let estimate = estimator().estimate("ééé");
        assert_eq!(estimate.factors.char_count, 3);
    }

    #[test]
    fn keywords_match_case_insensitively_on_word_boundaries() {
        let estimator = estimator();

        let estimate = estimator.estimate("EXPLAIN the Design of this system");
        assert_eq!(estimate.factors.matched_keywords, vec!["design".to_owned(), "explain".to_owned()]);

        // "designer" must not count as "design"
        let estimate = estimator.estimate("hire a designer");
        assert!(estimate.factors.matched_keywords.is_empty());
    }

    #[test]
    fn repeated_keyword_counts_once_and_score_saturates() {
        let estimator = estimator();

        let once = estimator.estimate("debug debug debug");
        assert!((once.factors.keyword_score - 1.0 / 3.0).abs() < 1e-9);

        let many = estimator.estimate("analyze, optimize, refactor and debug the security model");
        assert!((many.factors.keyword_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn keyword_set_does_not_affect_length_or_code() {
        let default = estimator();
        let custom = ComplexityEstimator::new(&EstimatorConfig {
            keywords: Some(vec!["kubernetes".to_owned()]),
            ..EstimatorConfig::default()
        })
        .unwrap();

        let prompt = "Explain kubernetes pods:\nimport os\nprint(os.environ);";
        let a = default.estimate(prompt);
        let b = custom.estimate(prompt);

        assert!((a.factors.length_score - b.factors.length_score).abs() < f64::EPSILON);
        assert!((a.factors.code_score - b.factors.code_score).abs() < f64::EPSILON);
        assert_eq!(b.factors.matched_keywords, vec!["kubernetes".to_owned()]);
        assert_eq!(a.factors.matched_keywords, vec!["explain".to_owned()]);
    }

    #[test]
    fn punctuated_keywords_match() {
        let estimator = ComplexityEstimator::new(&EstimatorConfig {
            keywords: Some(vec!["c++".to_owned(), "c#".to_owned(), ".net".to_owned()]),
            ..EstimatorConfig::default()
        })
        .unwrap();

        let estimate = estimator.estimate("Port this C++ service to C# on .NET.");
        assert_eq!(
            estimate.factors.matched_keywords,
            vec![".net".to_owned(), "c#".to_owned(), "c++".to_owned()]
        );

        // Still bounded: "abc++" is not "c++"
        assert!(estimator.estimate("abc++ and xc#").factors.matched_keywords.is_empty());
    }

    #[test]
    fn empty_keyword_list_scores_zero() {
        let estimator = ComplexityEstimator::new(&EstimatorConfig {
            keywords: Some(Vec::new()),
            ..EstimatorConfig::default()
        })
        .unwrap();

        assert!(estimator.estimate("explain the algorithm").factors.keyword_score.abs() < f64::EPSILON);
    }

    #[test]
    fn code_needs_fence_or_two_signals() {
        let estimator = estimator();

        assert!((estimator.estimate("```\nls -la\n```").factors.code_score - 1.0).abs() < f64::EPSILON);
        assert!((estimator.estimate("import os\nprint(os.getcwd());").factors.code_score - 1.0).abs() < f64::EPSILON);
        // A single signal is not enough
        assert!(estimator.estimate("what does => mean").factors.code_score.abs() < f64::EPSILON);
    }

    #[test]
    fn task_rules_apply_in_order() {
        let estimator = estimator();

        // Analysis outranks the trailing question mark
        assert_eq!(estimator.estimate("Can you review my essay?").factors.task_type, TaskType::Analysis);
        assert_eq!(estimator.estimate("Write a cover letter").factors.task_type, TaskType::Generation);
        assert_eq!(estimator.estimate("A poem about autumn").factors.task_type, TaskType::Creative);
        assert_eq!(estimator.estimate("Define entropy").factors.task_type, TaskType::Question);
        assert_eq!(estimator.estimate("Translate hello to French").factors.task_type, TaskType::General);
    }

    #[test]
    fn reasoning_lists_every_factor() {
        let estimate = estimator().estimate("What is 2+2?");
        assert_eq!(
            estimate.reasoning,
            "complexity 0.02: length 0.01 (12 chars), keywords 0.00 (none), code 0.00, task question (0.10)"
        );
    }
}
