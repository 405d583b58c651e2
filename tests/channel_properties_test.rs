//! Property tests for turn ordering
//!
//! For any scripted conversation, the response to the k-th operator message
//! is the k-th message the engine posted, and every answer reaches the engine
//! in the order it was typed.

use elicit_core::{
    ClarificationChannel, EngineMessage, ScriptedEngine, SessionCoordinator, SessionTimeouts,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn timeouts() -> SessionTimeouts {
    SessionTimeouts {
        first_question: Duration::from_secs(5),
        reply: Duration::from_secs(5),
        operator: Duration::from_secs(5),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_kth_response_is_kth_engine_message(
        questions in prop::collection::vec("[a-z]{1,12}\\?", 0..6),
        answers in prop::collection::vec("[a-z ]{1,16}", 6),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let engine = Arc::new(ScriptedEngine::new(questions.clone()));
            let mut session = SessionCoordinator::new(
                engine.clone(),
                timeouts(),
                "context",
                "story",
            )
            .unwrap();

            let first = session.submit("hi").await.unwrap();
            let mut responses = vec![first];
            for answer in answers.iter().take(questions.len()) {
                responses.push(session.submit(answer).await.unwrap());
            }

            prop_assert_eq!(responses.len(), questions.len() + 1);
            for (k, question) in questions.iter().enumerate() {
                prop_assert_eq!(responses[k].text(), question.as_str());
                prop_assert!(!responses[k].is_final());
            }
            prop_assert!(responses[questions.len()].is_final());
            prop_assert!(session.is_terminated());

            let expected: Vec<String> = answers[..questions.len()].to_vec();
            prop_assert_eq!(engine.answers_received(), expected);
            Ok(())
        })?;
    }

    #[test]
    fn prop_channel_preserves_posting_order(
        payloads in prop::collection::vec("[a-z]{1,8}", 1..20),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let channel = ClarificationChannel::shared();

            let producer = {
                let channel = channel.clone();
                let payloads = payloads.clone();
                tokio::spawn(async move {
                    for payload in payloads {
                        channel.post_request(EngineMessage::Question(payload));
                        tokio::task::yield_now().await;
                    }
                })
            };

            let mut taken = Vec::with_capacity(payloads.len());
            for _ in 0..payloads.len() {
                let message = channel
                    .take_request_within(Duration::from_secs(5))
                    .await
                    .unwrap();
                taken.push(message.text().to_string());
            }
            producer.await.unwrap();

            prop_assert_eq!(taken, payloads);
            Ok(())
        })?;
    }
}
