//! Integration tests against a real Bedrock model.
//!
//! These tests call real AWS APIs and require valid credentials in the
//! environment plus access to the model in `ROUNDS_TEST_MODEL` (defaults to
//! a Claude Sonnet inference profile).
//!
//! Run with: `cargo test -p rounds-bedrock --test live_judge -- --ignored`

use rounds_bedrock::{BedrockJudge, Judge, DEFAULT_TEMPERATURE};
use rounds_core::models::transcript::ChatMessage;

async fn build_judge() -> BedrockJudge {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new("us-east-1"))
        .load()
        .await;
    let model = std::env::var("ROUNDS_TEST_MODEL")
        .unwrap_or_else(|_| "us.anthropic.claude-sonnet-4-20250514-v1:0".to_string());
    BedrockJudge::new(&config, model)
}

#[tokio::test]
#[ignore]
async fn structured_judgment_returns_object() {
    let judge = build_judge().await;
    let value = judge
        .judge_json(
            "Classify whether the message is about clinical medicine. Return {\"appropriate\": boolean}.",
            "What is the patient's heart rate?",
            DEFAULT_TEMPERATURE,
        )
        .await
        .expect("judge_json should succeed");

    assert!(value.get("appropriate").is_some(), "got {value}");
    assert!(judge.usage().calls >= 1);
}

#[tokio::test]
#[ignore]
async fn conversation_starting_with_presentation_is_accepted() {
    let judge = build_judge().await;
    let history = vec![
        ChatMessage::presentation("A 67-year-old man presents with fever and cough."),
        ChatMessage::assistant("What would you like to know about the patient?"),
    ];

    let reply = judge
        .converse(
            "You are a clinical tutor. Answer briefly.",
            &history,
            "How long has he been coughing?",
            DEFAULT_TEMPERATURE,
        )
        .await
        .expect("converse should succeed");

    assert!(!reply.is_empty());
}
