use rounds_cli::commands::{ReplCommand, parse};
use rounds_core::models::case::DiagnosisCategory;

#[test]
fn plain_text_is_a_message() {
    assert_eq!(
        parse("  Does he smoke?  "),
        Some(ReplCommand::Say("Does he smoke?".to_string()))
    );
    assert_eq!(parse("   "), None);
}

#[test]
fn add_with_and_without_category() {
    assert_eq!(
        parse("/dx add Community-acquired pneumonia likely"),
        Some(ReplCommand::DxAdd {
            name: "Community-acquired pneumonia".to_string(),
            category: DiagnosisCategory::Likely,
        })
    );
    assert_eq!(
        parse("/dx add Pulmonary embolism dont-miss"),
        Some(ReplCommand::DxAdd {
            name: "Pulmonary embolism".to_string(),
            category: DiagnosisCategory::DontMiss,
        })
    );
    assert_eq!(
        parse("/dx add Lung cancer"),
        Some(ReplCommand::DxAdd {
            name: "Lung cancer".to_string(),
            category: DiagnosisCategory::Possible,
        })
    );
}

#[test]
fn swap_and_note_split_on_pipe() {
    assert_eq!(
        parse("/dx swap Pneumonia | Pulmonary embolism"),
        Some(ReplCommand::DxSwap(
            "Pneumonia".to_string(),
            "Pulmonary embolism".to_string()
        ))
    );
    assert_eq!(
        parse("/dx note Pneumonia | rusty sputum, crackles"),
        Some(ReplCommand::DxNote {
            name: "Pneumonia".to_string(),
            notes: "rusty sputum, crackles".to_string(),
        })
    );
    assert!(matches!(
        parse("/dx swap Pneumonia"),
        Some(ReplCommand::Invalid(_))
    ));
}

#[test]
fn move_position_is_one_based() {
    assert_eq!(
        parse("/dx mv Pulmonary embolism 1"),
        Some(ReplCommand::DxMove {
            name: "Pulmonary embolism".to_string(),
            index: 0,
        })
    );
    assert!(matches!(
        parse("/dx mv Asthma 0"),
        Some(ReplCommand::Invalid(_))
    ));
    assert!(matches!(
        parse("/dx mv Asthma"),
        Some(ReplCommand::Invalid(_))
    ));
}

#[test]
fn simple_commands() {
    assert_eq!(parse("/dx"), Some(ReplCommand::DxList));
    assert_eq!(parse("/dx rm Asthma"), Some(ReplCommand::DxRemove("Asthma".to_string())));
    assert_eq!(parse("/compare"), Some(ReplCommand::Compare));
    assert_eq!(parse("/hint"), Some(ReplCommand::Hint));
    assert_eq!(parse("/progress"), Some(ReplCommand::Progress));
    assert_eq!(parse("/summary"), Some(ReplCommand::Summary));
    assert_eq!(parse("/advance"), Some(ReplCommand::Advance));
    assert_eq!(parse("/save"), Some(ReplCommand::Save));
    assert_eq!(parse("/quit"), Some(ReplCommand::Quit));
    assert!(matches!(parse("/dance"), Some(ReplCommand::Invalid(_))));
}
