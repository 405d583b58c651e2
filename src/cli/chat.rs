//! Interactive clarification session
//!
//! REPL-style front end: every line the operator types is submitted to the
//! session coordinator and the engine's next question (or final result) is
//! printed back. The first line only starts the engine.

use elicit_core::{
    error::Result, ElicitConfig, Exchange, LlmEngine, LlmService, ReasoningEngine, Response,
    ScriptedEngine, SessionCoordinator, SessionTimeouts,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

/// Sample user story used when none is given
const SAMPLE_STORY: &str = "As a faculty member,
I want the student to be able to enroll in an academic program with a given offer,
So that I can track their progress towards a degree.";

/// Sample business context used when none is given
const SAMPLE_CONTEXT: &str = "The student records system is a web application.

When faculty issue an offer, a student account is created at the same time.
Students can look up their account using their identity details.
At registration, the student logs in and completes enrollment for the academic year according to the offer.";

/// Questions asked by the offline demo engine
const DEMO_QUESTIONS: [&str; 2] = [
    "Who initiates enrollment: staff or student?",
    "What happens if the offer has expired?",
];

pub struct ChatOptions {
    pub story: Option<PathBuf>,
    pub context: Option<PathBuf>,
    pub scripted: bool,
    pub transcript: Option<PathBuf>,
}

/// Run an interactive clarification session
pub async fn run(config: &ElicitConfig, options: ChatOptions) -> Result<()> {
    let story = read_or_sample(options.story.as_deref(), SAMPLE_STORY)?;
    let context = read_or_sample(options.context.as_deref(), SAMPLE_CONTEXT)?;

    let engine: Arc<dyn ReasoningEngine> = if options.scripted {
        Arc::new(ScriptedEngine::new(DEMO_QUESTIONS))
    } else {
        let service = LlmService::new(config.to_llm_config()?)?;
        info!("Using model {}", service.model());
        Arc::new(LlmEngine::new(Arc::new(service), config.engine.clone()))
    };

    let mut coordinator = SessionCoordinator::new(
        engine,
        SessionTimeouts::from(&config.session),
        context.clone(),
        story.clone(),
    )?;

    print_banner(&story, &context);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("expert> ");
        io::stdout().flush()?;

        let Some(input) = lines.next_line().await? else {
            debug!("stdin closed");
            break;
        };

        match input.trim() {
            "" => continue,
            "help" => show_help(),
            "quit" | "exit" => {
                info!("Leaving session {}", coordinator.id());
                break;
            }
            "history" => show_history(coordinator.history()),
            message => match coordinator.submit(message).await {
                Ok(Response::Question(question)) => {
                    println!();
                    println!("analyst> {}", question);
                    println!();
                }
                Ok(Response::FinalResult(result)) => {
                    println!();
                    println!("✓ Final result");
                    println!("────────────────────────────────────────────────────────────");
                    println!("{}", result);
                    println!("────────────────────────────────────────────────────────────");
                    println!("Session complete. Type 'history' to review or 'quit' to leave.");
                }
                Err(e) => {
                    error!("Turn failed: {}", e);
                    println!("✗ {}", e);
                    if coordinator.state().is_terminal() {
                        println!("Session is over. Type 'history' to review or 'quit' to leave.");
                    }
                }
            },
        }
    }

    coordinator.shutdown();

    if let Some(path) = options.transcript {
        std::fs::write(&path, coordinator.session().to_json()?)?;
        println!("✓ Transcript written to {}", path.display());
    }

    Ok(())
}

fn read_or_sample(path: Option<&Path>, sample: &str) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(sample.to_string()),
    }
}

fn print_banner(story: &str, context: &str) {
    println!();
    println!("📋 Elicit - clarify a user story with the analyst");
    println!("════════════════════════════════════════════════════════════");
    println!("User story:");
    for line in story.lines() {
        println!("  {}", line);
    }
    println!("Business context:");
    for line in context.lines() {
        println!("  {}", line);
    }
    println!("════════════════════════════════════════════════════════════");
    println!("Type 'hi' to start. Commands: help, history, quit");
    println!();
}

fn show_help() {
    println!();
    println!("Commands:");
    println!("  help      Show this help");
    println!("  history   Show the conversation so far");
    println!("  quit      Leave the session");
    println!();
    println!("Anything else is sent to the analyst. The first message starts");
    println!("the session; later messages answer the analyst's last question.");
    println!();
}

fn show_history(history: &[Exchange]) {
    if history.is_empty() {
        println!("No exchanges yet");
        return;
    }

    println!();
    for (i, exchange) in history.iter().enumerate() {
        println!(
            "{}. [{}] expert> {}",
            i + 1,
            exchange.responded_at.format("%H:%M:%S"),
            exchange.operator_message
        );
        println!("   analyst> {}", exchange.response);
    }
    println!();
}
