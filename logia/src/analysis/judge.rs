//! LLM-assisted grading of stored responses

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::ground_truth::GroundTruth;
use super::AnalysisError;
use crate::providers::LLMProvider;
use crate::runner::{Executor, ModelResponse};

const JUDGE_SYSTEM_PROMPT: &str =
    "You are a security analyst grading answers that language models gave about security event logs.";

/// What the judge compares a model's answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeBasis {
    /// Another model's answers
    Reference,
    /// The expected answers
    GroundTruth,
}

impl JudgeBasis {
    fn answer_label(&self) -> &'static str {
        match self {
            JudgeBasis::Reference => "Reference answer",
            JudgeBasis::GroundTruth => "Expected answer",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            JudgeBasis::Reference => "the answers of a reference model",
            JudgeBasis::GroundTruth => "the expected correct answers",
        }
    }
}

/// Judge output for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeEvaluation {
    pub topic: String,
    pub file: String,
    /// Model the answers were compared with, in reference mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Raw judge text
    pub evaluation: String,
    /// Score out of 10 parsed from the judge's final line
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// First model whose id contains `gpt4`, case-insensitive
pub fn find_reference_model(responses: &IndexMap<String, ModelResponse>) -> Option<&str> {
    responses
        .keys()
        .map(String::as_str)
        .find(|model| model.to_lowercase().contains("gpt4"))
}

/// Prompt asking the judge to grade `model` question by question
pub fn build_judge_prompt(
    model: &str,
    topic: &str,
    basis: JudgeBasis,
    pairs: &[(&str, &str, &str)],
) -> String {
    let mut prompt = format!(
        "Compare the answers of the model \"{}\" with {}.\nTopic: {}\n",
        model,
        basis.description(),
        topic
    );

    for (i, (question, expected, answer)) in pairs.iter().enumerate() {
        prompt.push_str(&format!(
            "\nQuestion {}: {}\n{}: {}\nModel answer: {}\n",
            i + 1,
            question,
            basis.answer_label(),
            expected,
            answer
        ));
    }

    prompt.push_str(
        "\nFor each question, state whether the model answer is correct, partially correct \
         or incorrect and explain briefly.\n\
         Finish with a single line in the format \"Score: X/10\".",
    );
    prompt
}

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)score:\s*\**\s*([0-9]+(?:\.[0-9]+)?)\s*/\s*10").expect("static pattern")
    })
}

/// Last `Score: X/10` in the judge text
pub fn extract_score(text: &str) -> Option<f64> {
    score_pattern()
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Grades responses with an LLM
pub struct JudgeEvaluator<'a> {
    judge: &'a dyn LLMProvider,
    executor: &'a Executor,
}

impl<'a> JudgeEvaluator<'a> {
    pub fn new(judge: &'a dyn LLMProvider, executor: &'a Executor) -> Self {
        Self { judge, executor }
    }

    /// Judge every model against the reference model's answers
    ///
    /// The reference is `reference` when given, otherwise the first model
    /// whose id contains `gpt4`. The reference itself is not judged.
    pub async fn evaluate_against_reference(
        &self,
        responses: &IndexMap<String, ModelResponse>,
        reference: Option<&str>,
    ) -> Result<IndexMap<String, JudgeEvaluation>, AnalysisError> {
        let reference_id = match reference {
            Some(id) => id,
            None => find_reference_model(responses).ok_or(AnalysisError::NoReference)?,
        };
        let reference_response = responses.get(reference_id).ok_or(AnalysisError::NoReference)?;
        tracing::info!("Using '{}' as reference model", reference_id);

        let mut results = IndexMap::new();
        for (model, response) in responses {
            if model == reference_id {
                continue;
            }
            let pairs: Vec<(&str, &str, &str)> = reference_response
                .questions_answers
                .iter()
                .map(|(q, expected)| (q.as_str(), expected.as_str(), response.answer_for(q)))
                .collect();

            let mut evaluation = self.judge_pairs(model, response, JudgeBasis::Reference, &pairs).await;
            evaluation.reference = Some(reference_id.to_string());
            results.insert(model.clone(), evaluation);
        }

        Ok(results)
    }

    /// Judge every model against the expected answers
    pub async fn evaluate_against_ground_truth(
        &self,
        responses: &IndexMap<String, ModelResponse>,
        ground_truth: &GroundTruth,
    ) -> IndexMap<String, JudgeEvaluation> {
        let mut results = IndexMap::new();
        for (model, response) in responses {
            let Some(expected) = ground_truth.expected(&response.topic) else {
                tracing::warn!("No expected answers for {}, skipping {}", response.topic, model);
                continue;
            };
            let pairs: Vec<(&str, &str, &str)> = expected
                .iter()
                .map(|(q, e)| (q.as_str(), e.as_str(), response.answer_for(q)))
                .collect();

            let evaluation = self.judge_pairs(model, response, JudgeBasis::GroundTruth, &pairs).await;
            results.insert(model.clone(), evaluation);
        }
        results
    }

    async fn judge_pairs(
        &self,
        model: &str,
        response: &ModelResponse,
        basis: JudgeBasis,
        pairs: &[(&str, &str, &str)],
    ) -> JudgeEvaluation {
        tracing::info!("Evaluating model: {}", model);
        let prompt = build_judge_prompt(model, &response.topic, basis, pairs);
        let request = self.executor.request_for(&prompt).with_system(JUDGE_SYSTEM_PROMPT);

        let (evaluation, error) = match self.executor.execute_request(self.judge, &request).await {
            Ok(completion) => (completion.content, None),
            Err(e) => {
                tracing::error!("Judge failed on {}: {}", model, e);
                (String::new(), Some(e.to_string()))
            }
        };

        let score = extract_score(&evaluation);
        if error.is_none() && score.is_none() {
            tracing::warn!("No score found in judge output for {}", model);
        }

        JudgeEvaluation {
            topic: response.topic.clone(),
            file: response.file.clone(),
            reference: None,
            evaluation,
            score,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Topic;
    use crate::providers::{ProviderError, ScriptedProvider};
    use crate::runner::ExecutorConfig;

    fn responses() -> IndexMap<String, ModelResponse> {
        let mut map = IndexMap::new();
        for (model, answer) in [
            ("phi4", "SSH brute force"),
            ("openai_gpt4", "SSH brute force against root"),
            ("llama3.2", "Nothing unusual"),
        ] {
            map.insert(
                model.to_string(),
                ModelResponse::new(model, "logs.json", Topic::ContentSummary, answer, "t"),
            );
        }
        map
    }

    fn executor() -> Executor {
        Executor::new(ExecutorConfig {
            retry_count: 0,
            ..ExecutorConfig::default()
        })
    }

    #[test]
    fn test_extract_score() {
        assert_eq!(extract_score("Good.\nScore: 8/10"), Some(8.0));
        assert_eq!(extract_score("score: 7.5 / 10"), Some(7.5));
        assert_eq!(extract_score("Q1 Score: 2/10\nFinal\n**Score:** 6/10"), Some(6.0));
        assert_eq!(extract_score("no verdict"), None);
    }

    #[test]
    fn test_find_reference_model() {
        assert_eq!(find_reference_model(&responses()), Some("openai_gpt4"));
        let mut without = responses();
        without.shift_remove("openai_gpt4");
        assert_eq!(find_reference_model(&without), None);
    }

    #[test]
    fn test_judge_prompt_layout() {
        let prompt = build_judge_prompt(
            "phi4",
            "Topic 2 - Content Summary",
            JudgeBasis::GroundTruth,
            &[("What happened?", "SSH brute force", "Port scan")],
        );
        assert!(prompt.starts_with("Compare the answers of the model \"phi4\" with the expected correct answers."));
        assert!(prompt.contains("Question 1: What happened?\nExpected answer: SSH brute force\nModel answer: Port scan\n"));
        assert!(prompt.ends_with("\"Score: X/10\"."));
    }

    #[tokio::test]
    async fn test_reference_mode_skips_reference() {
        let judge = ScriptedProvider::new(
            "judge",
            vec![Ok("Mostly right.\nScore: 9/10".to_string()), Ok("Wrong.\nScore: 2/10".to_string())],
        );
        let executor = executor();
        let evaluator = JudgeEvaluator::new(&judge, &executor);

        let results = evaluator.evaluate_against_reference(&responses(), None).await.unwrap();
        let models: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(models, vec!["phi4", "llama3.2"]);
        assert_eq!(results["phi4"].score, Some(9.0));
        assert_eq!(results["llama3.2"].reference.as_deref(), Some("openai_gpt4"));

        let prompts = judge.prompts();
        assert!(prompts[0].contains("Reference answer: SSH brute force against root"));
        assert!(prompts[0].contains("Model answer: SSH brute force\n"));
    }

    #[tokio::test]
    async fn test_reference_mode_without_reference() {
        let judge = ScriptedProvider::new("judge", vec![]);
        let executor = executor();
        let evaluator = JudgeEvaluator::new(&judge, &executor);

        let mut without = responses();
        without.shift_remove("openai_gpt4");
        let err = evaluator.evaluate_against_reference(&without, None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoReference));

        let err = evaluator.evaluate_against_reference(&without, Some("gpt-9")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoReference));
    }

    #[tokio::test]
    async fn test_ground_truth_mode_records_failures() {
        let mut gt = GroundTruth::default();
        gt.insert(
            Topic::ContentSummary.title(),
            Topic::ContentSummary.questions()[0],
            "SSH brute force",
        );
        let judge = ScriptedProvider::new(
            "judge",
            vec![
                Ok("Correct.\nScore: 10/10".to_string()),
                Err(ProviderError::Config("quota".into())),
                Ok("No verdict".to_string()),
            ],
        );
        let executor = executor();
        let evaluator = JudgeEvaluator::new(&judge, &executor);

        let results = evaluator.evaluate_against_ground_truth(&responses(), &gt).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results["phi4"].score, Some(10.0));
        assert!(results["openai_gpt4"].error.is_some());
        assert_eq!(results["llama3.2"].score, None);
        assert!(judge.prompts()[0].contains("Expected answer: SSH brute force"));
    }
}
