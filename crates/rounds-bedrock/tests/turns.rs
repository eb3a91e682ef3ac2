use rounds_bedrock::client::{build_turns, SESSION_START_TURN};
use rounds_core::models::transcript::{ChatMessage, ChatRole};

#[test]
fn empty_history_yields_single_user_turn() {
    let turns = build_turns(&[], "What brings him in?");
    assert_eq!(turns, vec![(ChatRole::User, "What brings him in?".to_string())]);
}

#[test]
fn leading_assistant_turns_are_merged_and_preceded_by_user() {
    let history = vec![
        ChatMessage::presentation("A 67-year-old man with fever."),
        ChatMessage::assistant("What would you like to ask?"),
    ];

    let turns = build_turns(&history, "How long has he had the cough?");

    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0], (ChatRole::User, SESSION_START_TURN.to_string()));
    assert_eq!(turns[1].0, ChatRole::Assistant);
    assert!(turns[1].1.contains("fever"));
    assert!(turns[1].1.contains("What would you like to ask?"));
    assert_eq!(turns[2].0, ChatRole::User);
}

#[test]
fn roles_alternate_after_shaping() {
    let history = vec![
        ChatMessage::user("First question"),
        ChatMessage::user("Second question"),
        ChatMessage::assistant("Answer"),
    ];

    let turns = build_turns(&history, "Follow-up");

    for pair in turns.windows(2) {
        assert_ne!(pair[0].0, pair[1].0);
    }
    assert_eq!(turns[0].1, "First question\n\nSecond question");
}
