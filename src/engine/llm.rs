//! LLM-backed reasoning engine
//!
//! Runs a Thought/Action/Observation loop: every `Action Input` the model
//! produces is forwarded to the operator through the [`Clarifier`], and the
//! answer is appended to the scratchpad as the `Observation`. The loop ends
//! with the model's `Final Answer`.

use crate::config::EngineSettings;
use crate::coordination::clarifier::Clarifier;
use crate::engine::prompts::{self, PromptParams, Step};
use crate::engine::{EngineInput, ReasoningEngine};
use crate::error::{ElicitError, Result};
use crate::services::llm::Completion;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LlmEngine {
    model: Arc<dyn Completion>,
    settings: EngineSettings,
}

impl LlmEngine {
    pub fn new(model: Arc<dyn Completion>, settings: EngineSettings) -> Self {
        Self { model, settings }
    }

    fn limits(&self) -> (usize, usize) {
        let max = self.settings.max_questions;
        (self.settings.min_questions.min(max), max)
    }
}

#[async_trait]
impl ReasoningEngine for LlmEngine {
    fn name(&self) -> &str {
        "llm"
    }

    async fn run(&self, input: EngineInput, clarifier: Arc<dyn Clarifier>) -> Result<String> {
        let (min_questions, max_questions) = self.limits();
        let stop = vec![prompts::OBSERVATION_MARKER.to_string()];
        let mut scratchpad = String::new();
        let mut asked = 0usize;

        for iteration in 1..=self.settings.max_iterations {
            let prompt = prompts::render(&PromptParams {
                input: &input,
                scratchpad: &scratchpad,
                min_questions,
                max_questions,
            });

            debug!("Model call {} ({} questions asked)", iteration, asked);
            let output = self.model.complete(&prompt, &stop).await?;

            match prompts::parse_step(&output) {
                Step::Finish { answer } if asked >= min_questions => {
                    info!("Engine concluded after {} question(s)", asked);
                    return Ok(answer);
                }
                Step::Finish { .. } => {
                    debug!("Final answer before {} questions, pushing back", min_questions);
                    scratchpad.push_str(&prompts::record_correction(
                        output.trim(),
                        &prompts::too_few_questions(asked, min_questions),
                    ));
                }
                Step::Ask { .. } if asked >= max_questions => {
                    debug!("Question limit {} reached, refusing", max_questions);
                    scratchpad.push_str(&prompts::record_correction(
                        output.trim(),
                        &prompts::no_more_questions(max_questions),
                    ));
                }
                Step::Ask { thought, question } => {
                    let answer = clarifier.ask(&question).await?;
                    asked += 1;
                    scratchpad.push_str(&prompts::record_observation(&thought, &question, &answer));
                }
                Step::Unparsed { raw } => {
                    warn!("Unparseable model output on call {}", iteration);
                    scratchpad.push_str(&prompts::record_correction(
                        &raw,
                        prompts::FORMAT_CORRECTION,
                    ));
                }
            }
        }

        Err(ElicitError::EngineFailed(format!(
            "no final answer after {} model calls",
            self.settings.max_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::MockCompletion;
    use mockall::Sequence;
    use std::sync::Mutex;

    struct RecordingClarifier {
        asked: Mutex<Vec<String>>,
    }

    impl RecordingClarifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                asked: Mutex::new(Vec::new()),
            })
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clarifier for RecordingClarifier {
        async fn ask(&self, question: &str) -> Result<String> {
            self.asked.lock().unwrap().push(question.to_string());
            Ok("The student initiates".to_string())
        }
    }

    fn settings(min: usize, max: usize, iterations: usize) -> EngineSettings {
        EngineSettings {
            min_questions: min,
            max_questions: max,
            max_iterations: iterations,
        }
    }

    const ASK: &str =
        "Thought: who starts it?\nAction: Ask The Domain Expert\nAction Input: Who initiates enrollment?";
    const FINISH: &str = "Thought: I now know enough.\nFinal Answer: Scenario 1\nGiven an offer\nWhen the student enrolls\nThen enrollment succeeds";

    #[tokio::test]
    async fn test_forwards_action_input_and_concludes() {
        let mut mock = MockCompletion::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, stop| stop.iter().any(|s| s == "Observation:"))
            .returning(|_, _| Ok(ASK.to_string()));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|prompt, _| prompt.contains("Observation: The student initiates"))
            .returning(|_, _| Ok(FINISH.to_string()));

        let engine = LlmEngine::new(Arc::new(mock), settings(1, 3, 5));
        let clarifier = RecordingClarifier::new();

        let result = engine
            .run(EngineInput::new("ctx", "story"), clarifier.clone())
            .await
            .unwrap();

        assert_eq!(clarifier.asked(), vec!["Who initiates enrollment?"]);
        assert!(result.starts_with("Scenario 1"));
    }

    #[tokio::test]
    async fn test_final_answer_before_minimum_is_pushed_back() {
        let mut mock = MockCompletion::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(FINISH.to_string()));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|prompt, _| prompt.contains("ask at least 1 before giving the Final Answer"))
            .returning(|_, _| Ok(ASK.to_string()));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(FINISH.to_string()));

        let engine = LlmEngine::new(Arc::new(mock), settings(1, 3, 5));
        let clarifier = RecordingClarifier::new();

        engine
            .run(EngineInput::default(), clarifier.clone())
            .await
            .unwrap();
        assert_eq!(clarifier.asked().len(), 1);
    }

    #[tokio::test]
    async fn test_question_beyond_maximum_is_refused() {
        let mut mock = MockCompletion::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(ASK.to_string()));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|prompt, _| prompt.contains("The limit of 1 questions is reached"))
            .returning(|_, _| Ok(FINISH.to_string()));

        let engine = LlmEngine::new(Arc::new(mock), settings(0, 1, 5));
        let clarifier = RecordingClarifier::new();

        engine
            .run(EngineInput::default(), clarifier.clone())
            .await
            .unwrap();
        assert_eq!(clarifier.asked().len(), 1);
    }

    #[tokio::test]
    async fn test_action_with_final_answer_gets_format_correction() {
        let mixed = format!("{ASK}\n{FINISH}");

        let mut mock = MockCompletion::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(mixed.clone()));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|prompt, _| prompt.contains(prompts::FORMAT_CORRECTION))
            .returning(|_, _| Ok(FINISH.to_string()));

        let engine = LlmEngine::new(Arc::new(mock), settings(0, 3, 5));
        let clarifier = RecordingClarifier::new();

        let result = engine
            .run(EngineInput::default(), clarifier.clone())
            .await
            .unwrap();
        assert!(result.starts_with("Scenario 1"));
        assert!(clarifier.asked().is_empty());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_iterations() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .times(2)
            .returning(|_, _| Ok("I am not following the format".to_string()));

        let engine = LlmEngine::new(Arc::new(mock), settings(0, 3, 2));

        let err = engine
            .run(EngineInput::default(), RecordingClarifier::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ElicitError::EngineFailed(_)));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Err(ElicitError::LlmApi("rate limited".to_string())));

        let engine = LlmEngine::new(Arc::new(mock), settings(0, 3, 5));
        let clarifier = RecordingClarifier::new();

        let err = engine
            .run(EngineInput::default(), clarifier.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ElicitError::LlmApi(_)));
        assert!(clarifier.asked().is_empty());
    }
}
