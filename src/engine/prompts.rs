//! Prompt template and step parser for the LLM engine
//!
//! The model plays a business analyst interviewing a domain expert about a
//! user story. Each model turn is either one tool step
//! (`Thought / Action / Action Input`) or the `Final Answer`.

use crate::engine::EngineInput;

/// Name of the single tool the model may use
pub const ASK_TOOL: &str = "Ask The Domain Expert";

/// Stop sequence: the model must not invent the expert's answer
pub const OBSERVATION_MARKER: &str = "Observation:";

const ACTION_MARKER: &str = "Action:";
const ACTION_INPUT_MARKER: &str = "Action Input:";
const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const THOUGHT_MARKER: &str = "Thought:";

/// Values substituted into the template
pub struct PromptParams<'a> {
    pub input: &'a EngineInput,
    pub scratchpad: &'a str,
    pub min_questions: usize,
    pub max_questions: usize,
}

/// Render the full prompt for the next model call
pub fn render(params: &PromptParams<'_>) -> String {
    let history = render_history(params.input);

    format!(
        r#"You are a business analyst and I am the domain expert.

Answer the following question as best you can. You have access to the following tool:

{tool}: useful when you need to ask a question to clarify the user story. The input is the question.

Here is the context:

===CONTEXT
{context}
===END OF CONTEXT

Here is the user story:

===USER STORY
{story}
===END OF USER STORY

Explain the user story with scenarios, using the following format:

Thought: think about what is unclear in the user story. Ignore technical details.
Action: the action to take, must be [{tool}]
Action Input: the input to the action (the question that clarifies the user story)
Observation: the result of the action (my answer)
... (this Thought/Action/Action Input/Observation repeats at least {min} times and no more than {max} times)

When you understand the user story well enough, or have no further questions, you MUST answer in this format:

Thought: I now know enough about this user story.
Final Answer: [Scenarios: list as many scenarios as possible, each in Given/When/Then format.]

Begin!

Previous conversation:
{history}

Thought: {scratchpad}"#,
        tool = ASK_TOOL,
        context = params.input.static_context.trim(),
        story = params.input.subject_material.trim(),
        min = params.min_questions,
        max = params.max_questions,
        history = history,
        scratchpad = params.scratchpad,
    )
}

fn render_history(input: &EngineInput) -> String {
    if input.conversation_so_far.is_empty() {
        return "(none)".to_string();
    }

    input
        .conversation_so_far
        .iter()
        .map(|exchange| {
            format!(
                "Expert: {}\nAnalyst: {}",
                exchange.operator_message,
                exchange.response.text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One parsed model turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Ask the expert a question
    Ask { thought: String, question: String },

    /// Conclude with the scenarios
    Finish { answer: String },

    /// Output matched neither form; the raw text is kept for the scratchpad
    Unparsed { raw: String },
}

/// Parse a model turn
///
/// A turn holding both an action and a final answer is malformed. Anything
/// after an `Observation:` marker is the model talking for the expert and is
/// dropped.
pub fn parse_step(output: &str) -> Step {
    let output = match output.find(OBSERVATION_MARKER) {
        Some(idx) => &output[..idx],
        None => output,
    };

    if let Some(idx) = output.find(FINAL_ANSWER_MARKER) {
        if output.contains(ACTION_INPUT_MARKER) {
            return Step::Unparsed {
                raw: output.trim().to_string(),
            };
        }
        let answer = output[idx + FINAL_ANSWER_MARKER.len()..].trim();
        if !answer.is_empty() {
            return Step::Finish {
                answer: answer.to_string(),
            };
        }
    }

    if let Some(idx) = output.find(ACTION_INPUT_MARKER) {
        let question = clean_question(&output[idx + ACTION_INPUT_MARKER.len()..]);
        let action_ok = output[..idx]
            .rfind(ACTION_MARKER)
            .map(|a| output[a + ACTION_MARKER.len()..idx].contains(ASK_TOOL))
            .unwrap_or(false);

        if action_ok && !question.is_empty() {
            return Step::Ask {
                thought: thought_of(&output[..idx]),
                question,
            };
        }
    }

    Step::Unparsed {
        raw: output.trim().to_string(),
    }
}

fn clean_question(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

fn thought_of(head: &str) -> String {
    let head = match head.rfind(ACTION_MARKER) {
        Some(idx) => &head[..idx],
        None => head,
    };
    let head = head.trim();
    head.strip_prefix(THOUGHT_MARKER).unwrap_or(head).trim().to_string()
}

/// Scratchpad record of a completed tool step
pub fn record_observation(thought: &str, question: &str, observation: &str) -> String {
    format!(
        "{thought}\n{ACTION_MARKER} {ASK_TOOL}\n{ACTION_INPUT_MARKER} {question}\n{OBSERVATION_MARKER} {observation}\nThought: "
    )
}

/// Scratchpad record of a turn that needs correcting
pub fn record_correction(raw: &str, correction: &str) -> String {
    format!("{raw}\n{OBSERVATION_MARKER} {correction}\nThought: ")
}

pub const FORMAT_CORRECTION: &str = "Invalid format. Either use the tool with `Action:` and `Action Input:` lines, or reply with `Final Answer:`.";

pub fn too_few_questions(asked: usize, min: usize) -> String {
    format!(
        "Only {asked} question(s) asked so far; ask at least {min} before giving the Final Answer."
    )
}

pub fn no_more_questions(max: usize) -> String {
    format!("The limit of {max} questions is reached. Do not ask again; give the Final Answer now.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::session::{Exchange, Response};

    #[test]
    fn test_parse_action() {
        let output = "I need to know who starts it.\nAction: Ask The Domain Expert\nAction Input: \"Who initiates enrollment: staff or student?\"\n";

        assert_eq!(
            parse_step(output),
            Step::Ask {
                thought: "I need to know who starts it.".to_string(),
                question: "Who initiates enrollment: staff or student?".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_drops_invented_observation() {
        let output = "Thought: unclear expiry\nAction: Ask The Domain Expert\nAction Input: What happens if the offer has expired?\nObservation: It is rejected.\nFinal Answer: made up";

        match parse_step(output) {
            Step::Ask { question, thought } => {
                assert_eq!(question, "What happens if the offer has expired?");
                assert_eq!(thought, "unclear expiry");
            }
            other => panic!("expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_final_answer() {
        let output = "I now know enough.\nFinal Answer: Scenario 1\nGiven a valid offer\nWhen the student enrolls\nThen enrollment succeeds";

        match parse_step(output) {
            Step::Finish { answer } => {
                assert!(answer.starts_with("Scenario 1"));
                assert!(answer.ends_with("Then enrollment succeeds"));
            }
            other => panic!("expected finish, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_action_with_final_answer_is_unparsed() {
        let output = "Thought: one more thing\nAction: Ask The Domain Expert\nAction Input: Who pays the fee?\nFinal Answer: Scenario 1\nGiven an offer";

        match parse_step(output) {
            Step::Unparsed { raw } => {
                assert!(raw.contains("Action Input: Who pays the fee?"));
                assert!(raw.contains("Final Answer: Scenario 1"));
            }
            other => panic!("expected unparsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_tool_is_unparsed() {
        let output = "Action: Search the web\nAction Input: enrollment rules";
        assert!(matches!(parse_step(output), Step::Unparsed { .. }));
        assert!(matches!(parse_step("just chatting"), Step::Unparsed { .. }));
    }

    #[test]
    fn test_render_includes_inputs_and_limits() {
        let mut input = EngineInput::new("The system is a web app.", "As a faculty member...");
        input.conversation_so_far.push(Exchange::new(
            "hi",
            Response::Question("Who?".to_string()),
        ));

        let prompt = render(&PromptParams {
            input: &input,
            scratchpad: "previous step",
            min_questions: 3,
            max_questions: 10,
        });

        assert!(prompt.contains("===CONTEXT\nThe system is a web app.\n===END OF CONTEXT"));
        assert!(prompt.contains("As a faculty member..."));
        assert!(prompt.contains("at least 3 times and no more than 10 times"));
        assert!(prompt.contains("Expert: hi\nAnalyst: Who?"));
        assert!(prompt.ends_with("Thought: previous step"));
    }

    #[test]
    fn test_record_observation_round() {
        let record = record_observation("why", "Who?", "Student");
        assert_eq!(
            parse_step(&record),
            Step::Ask {
                thought: "why".to_string(),
                question: "Who?".to_string(),
            }
        );
        assert!(record.ends_with("Observation: Student\nThought: "));
    }
}
