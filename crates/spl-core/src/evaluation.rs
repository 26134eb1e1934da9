use serde::{Deserialize, Serialize};

use crate::lexicon::Lexicon;
use crate::resolver::{Resolver, ResolverConfig};
use crate::{setops, PopulationMap};

/// A question with its expected answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionCase {
    #[serde(default)]
    pub id: String,
    pub question: String,
    pub expected: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionOutcome {
    pub id: String,
    pub question: String,
    pub expected: String,
    pub actual: String,
    pub correct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct EvaluationReport {
    pub correct: usize,
    pub total: usize,
    pub outcomes: Vec<QuestionOutcome>,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Scores of every evaluated population configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigurationScores {
    pub scores: Vec<usize>,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

fn normalize_answer(answer: &str) -> String {
    let lowered = answer.trim().trim_end_matches('.').to_lowercase();
    for article in ["a ", "an ", "the "] {
        if let Some(rest) = lowered.strip_prefix(article) {
            return rest.trim().to_string();
        }
    }
    lowered
}

/// Case-insensitive comparison that ignores a leading article ("animal" matches "an animal").
pub fn answers_match(expected: &str, actual: &str) -> bool {
    normalize_answer(expected) == normalize_answer(actual)
}

pub fn evaluate(resolver: &Resolver<'_>, cases: &[QuestionCase]) -> EvaluationReport {
    let outcomes: Vec<QuestionOutcome> = cases
        .iter()
        .map(|case| {
            let actual = resolver.resolve(&case.question).to_string();
            QuestionOutcome {
                id: case.id.clone(),
                question: case.question.clone(),
                expected: case.expected.clone(),
                correct: answers_match(&case.expected, &actual),
                actual,
            }
        })
        .collect();
    EvaluationReport {
        correct: outcomes.iter().filter(|o| o.correct).count(),
        total: outcomes.len(),
        outcomes,
    }
}

/// Evaluate each population configuration (the i-th member of every entity) separately.
pub fn score_configurations(
    populations: &PopulationMap,
    lexicon: &Lexicon,
    config: &ResolverConfig,
    cases: &[QuestionCase],
) -> ConfigurationScores {
    let scores: Vec<usize> = (0..setops::configuration_count(populations))
        .map(|i| {
            let resolver = Resolver::new(
                setops::configuration(populations, i),
                lexicon,
                config.clone(),
            );
            evaluate(&resolver, cases).correct
        })
        .collect();
    if scores.is_empty() {
        return ConfigurationScores::default();
    }
    ConfigurationScores {
        min: scores.iter().copied().min().unwrap_or(0),
        max: scores.iter().copied().max().unwrap_or(0),
        mean: scores.iter().sum::<usize>() as f64 / scores.len() as f64,
        scores,
    }
}
