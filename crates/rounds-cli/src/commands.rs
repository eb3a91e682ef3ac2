//! Parsing of lines typed into the tutoring loop.
//!
//! Anything not starting with `/` is a message to the tutor. Differential
//! edits take a name and, where a second argument could itself contain
//! spaces, a `|` separator:
//!
//! ```text
//! /dx add Community-acquired pneumonia likely
//! /dx rm Asthma
//! /dx swap Pneumonia | Pulmonary embolism
//! /dx mv Pulmonary embolism 1
//! /dx note Pneumonia | rusty sputum, focal crackles
//! ```
//!
//! Positions typed by the learner are 1-based.

use std::str::FromStr;

use rounds_core::models::case::DiagnosisCategory;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Say(String),
    DxAdd {
        name: String,
        category: DiagnosisCategory,
    },
    DxRemove(String),
    DxSwap(String, String),
    DxMove {
        name: String,
        index: usize,
    },
    DxNote {
        name: String,
        notes: String,
    },
    DxList,
    Compare,
    Hint,
    Progress,
    Summary,
    Advance,
    Save,
    Help,
    Quit,
    /// A slash command that could not be understood, with the reason.
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /dx                          show your differential
  /dx add <name> [likely|possible|dont_miss]
  /dx rm <name>
  /dx swap <name> | <name>
  /dx mv <name> <position>
  /dx note <name> | <text>
  /compare                     feedback on your differential
  /hint                        a nudge toward what is still missing
  /progress                    how far through the case you are
  /summary                     summarize the current phase
  /advance                     move to the next phase when it is complete
  /save                        write a session snapshot
  /quit
Anything else is sent to the tutor.";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Some(ReplCommand::Say(line.to_string()));
    };

    let (head, rest) = split_word(command);
    let parsed = match head {
        "dx" => parse_dx(rest),
        "compare" => ReplCommand::Compare,
        "hint" => ReplCommand::Hint,
        "progress" => ReplCommand::Progress,
        "summary" => ReplCommand::Summary,
        "advance" | "next" => ReplCommand::Advance,
        "save" => ReplCommand::Save,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("unknown command: /{other}")),
    };
    Some(parsed)
}

fn parse_dx(args: &str) -> ReplCommand {
    let (action, rest) = split_word(args);
    match action {
        "" | "ls" | "list" => ReplCommand::DxList,
        "add" => parse_add(rest),
        "rm" | "remove" => match non_empty(rest) {
            Some(name) => ReplCommand::DxRemove(name),
            None => ReplCommand::Invalid("usage: /dx rm <name>".to_string()),
        },
        "swap" => match split_pipe(rest) {
            Some((first, second)) => ReplCommand::DxSwap(first, second),
            None => ReplCommand::Invalid("usage: /dx swap <name> | <name>".to_string()),
        },
        "mv" | "move" => parse_move(rest),
        "note" => match split_pipe(rest) {
            Some((name, notes)) => ReplCommand::DxNote { name, notes },
            None => ReplCommand::Invalid("usage: /dx note <name> | <text>".to_string()),
        },
        other => ReplCommand::Invalid(format!("unknown differential action: {other}")),
    }
}

fn parse_add(rest: &str) -> ReplCommand {
    let rest = rest.trim();
    let (name, category) = match rest.rsplit_once(char::is_whitespace) {
        Some((name, last)) => match DiagnosisCategory::from_str(last) {
            Ok(category) => (name.trim(), category),
            Err(_) => (rest, DiagnosisCategory::Possible),
        },
        None => (rest, DiagnosisCategory::Possible),
    };

    match non_empty(name) {
        Some(name) => ReplCommand::DxAdd { name, category },
        None => ReplCommand::Invalid("usage: /dx add <name> [likely|possible|dont_miss]".to_string()),
    }
}

fn parse_move(rest: &str) -> ReplCommand {
    let usage = || ReplCommand::Invalid("usage: /dx mv <name> <position>".to_string());
    let Some((name, position)) = rest.trim().rsplit_once(char::is_whitespace) else {
        return usage();
    };
    match (non_empty(name), position.parse::<usize>()) {
        (Some(name), Ok(position)) if position >= 1 => ReplCommand::DxMove {
            name,
            index: position - 1,
        },
        _ => usage(),
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn split_pipe(text: &str) -> Option<(String, String)> {
    let (left, right) = text.split_once('|')?;
    Some((non_empty(left)?, non_empty(right)?))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
