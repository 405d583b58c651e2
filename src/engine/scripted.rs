//! Scripted reasoning engine
//!
//! Asks a fixed list of questions in order, then concludes with scenarios
//! built from the answers. Runs offline, so it backs the demo mode and
//! serves as the scripted fake for coordinator tests.

use crate::coordination::clarifier::Clarifier;
use crate::engine::{EngineInput, ReasoningEngine};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A question the engine asked and the answer it received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clarification {
    pub question: String,
    pub answer: String,
}

type Conclusion = dyn Fn(&EngineInput, &[Clarification]) -> String + Send + Sync;

pub struct ScriptedEngine {
    questions: Vec<String>,
    conclude: Arc<Conclusion>,
    received: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: questions.into_iter().map(Into::into).collect(),
            conclude: Arc::new(given_when_then),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Replace the default Given/When/Then conclusion
    pub fn with_conclusion<F>(mut self, conclude: F) -> Self
    where
        F: Fn(&EngineInput, &[Clarification]) -> String + Send + Sync + 'static,
    {
        self.conclude = Arc::new(conclude);
        self
    }

    /// Answers delivered to this engine so far, in order
    pub fn answers_received(&self) -> Vec<String> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, input: EngineInput, clarifier: Arc<dyn Clarifier>) -> Result<String> {
        let mut clarifications = Vec::with_capacity(self.questions.len());

        for question in &self.questions {
            let answer = clarifier.ask(question).await?;
            debug!("Scripted engine got answer {}", clarifications.len() + 1);
            if let Ok(mut received) = self.received.lock() {
                received.push(answer.clone());
            }
            clarifications.push(Clarification {
                question: question.clone(),
                answer,
            });
        }

        Ok((self.conclude)(&input, &clarifications))
    }
}

/// One scenario per clarification, in Given/When/Then form
pub fn given_when_then(input: &EngineInput, clarifications: &[Clarification]) -> String {
    let subject = input
        .subject_material
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("the story");

    let mut out = String::from("Scenarios:\n");
    for (i, c) in clarifications.iter().enumerate() {
        out.push_str(&format!(
            "\nScenario {}: {}\n  Given {}\n  When {}\n  Then {}\n",
            i + 1,
            c.question,
            subject,
            c.question.trim_end_matches('?'),
            c.answer
        ));
    }
    if clarifications.is_empty() {
        out.push_str(&format!("\nScenario 1\n  Given {}\n  Then it is accepted as written\n", subject));
    }
    out
}
