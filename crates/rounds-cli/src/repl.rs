//! The interactive tutoring loop: one line in, one response out.

use eyre::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use rounds_bedrock::{BedrockJudge, Judge};
use rounds_cli::commands::{self, HELP, ReplCommand};
use rounds_cli::config::{self, RoundsConfig};
use rounds_core::loader::{self, PromptLibrary};
use rounds_engine::Session;
use rounds_engine::persistence::SnapshotStore;
use rounds_engine::phase::PhaseProgress;

pub async fn run(config: &RoundsConfig, case_id: &str, resume: Option<Uuid>) -> Result<()> {
    let prompts = PromptLibrary::load(&config.prompts_dir)?;
    let case = loader::load_case(&config.cases_dir, case_id, &prompts)?;

    let sdk_config = config::build_aws_config(config).await;
    let mut judge = BedrockJudge::new(&sdk_config, config.model_id.clone());
    if let Some(max_tokens) = config.max_tokens {
        judge = judge.with_max_tokens(max_tokens);
    }

    let store = SnapshotStore::new(config.sessions_dir.clone());
    let mut session = Session::new(case, prompts).with_temperature(config.temperature);
    if let Some(previous) = resume {
        session.resume_from(store.load(previous)?)?;
        println!("Restored differential from session {previous}.");
    }

    println!("{}", session.case().metadata.title);
    println!("Session {}  (type /help for commands)\n", session.id());
    for message in session.transcript().messages() {
        println!("{}\n", message.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout
            .write_all(format!("[{}] > ", session.current_phase().label()).as_bytes())
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = commands::parse(&line) else {
            continue;
        };

        match command {
            ReplCommand::Quit => break,
            command => handle(&mut session, &judge, &store, command).await?,
        }
    }

    let usage = judge.usage();
    println!(
        "\n{} model calls, {} tokens, est. ${:.4}",
        usage.calls,
        usage.tokens.total(),
        usage.cost_usd
    );
    let path = store.save(&session.snapshot())?;
    println!("Session saved to {}", path.display());
    Ok(())
}

async fn handle(
    session: &mut Session,
    judge: &dyn Judge,
    store: &SnapshotStore,
    command: ReplCommand,
) -> Result<()> {
    match command {
        ReplCommand::Say(message) => {
            let outcome = session.handle_message(judge, &message).await;
            println!("\n{}\n", outcome.reply);
            if let Some(coverage) = &outcome.coverage {
                for point in &coverage.newly_covered_points {
                    println!("  ✓ {}", point.content);
                }
            }
            if outcome.phase_complete {
                println!("  (This phase is complete. Type /summary or /advance.)\n");
            }
        }
        ReplCommand::DxAdd { name, category } => {
            let entry = session.ledger_mut().add(&name, category, "", None);
            println!("#{} {} ({})", entry.order_index + 1, entry.name(), category);
        }
        ReplCommand::DxRemove(name) => {
            if !session.ledger_mut().remove(&name) {
                println!("'{name}' is not on your differential.");
            }
            print_differential(session);
        }
        ReplCommand::DxSwap(first, second) => {
            session.ledger_mut().swap(&first, &second);
            print_differential(session);
        }
        ReplCommand::DxMove { name, index } => {
            session.ledger_mut().move_to(&name, index);
            print_differential(session);
        }
        ReplCommand::DxNote { name, notes } => {
            if !session.ledger_mut().update_notes(&name, &notes) {
                println!("'{name}' is not on your differential.");
            }
        }
        ReplCommand::DxList => print_differential(session),
        ReplCommand::Compare => {
            let feedback = session.compare_differential(judge).await;
            println!("\n{}", feedback.to_markdown()?);
        }
        ReplCommand::Hint => println!("\n{}\n", session.hint()),
        ReplCommand::Progress => {
            let progress = session.progress();
            println!(
                "\n{} phase: {:?}, {}/{} elements, {}/{} teaching points, {:.0}% of required, {}s elapsed\n",
                progress.current_phase.label(),
                progress.phase_progress,
                progress.elements_covered,
                progress.elements_total,
                progress.teaching_points_covered,
                progress.teaching_points_total,
                progress.completion_ratio * 100.0,
                progress.elapsed_seconds,
            );
        }
        ReplCommand::Summary => {
            let summary = session.generate_summary(judge).await;
            println!("\n{}\n", summary.chat_summary);
        }
        ReplCommand::Advance => match session.advance(judge).await {
            Some(_) => {
                if let Some(opening) = session.transcript().messages().last() {
                    println!("\n{}\n", opening.content);
                }
            }
            None if session.phase_progress() == PhaseProgress::Complete => {
                println!("\nThis is the final phase. Type /quit when you are done.\n");
            }
            None => println!("\nThis phase is not complete yet. Try /hint.\n"),
        },
        ReplCommand::Save => {
            let path = store.save(&session.snapshot())?;
            println!("Saved to {}", path.display());
        }
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Invalid(reason) => println!("{reason}"),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn print_differential(session: &Session) {
    let ranked = session.ledger().ranked();
    if ranked.is_empty() {
        println!("Your differential is empty. Add one with /dx add <name>.");
        return;
    }
    for hypothesis in ranked {
        if hypothesis.notes.is_empty() {
            println!(
                "{}. {} ({})",
                hypothesis.order_index + 1,
                hypothesis.name(),
                hypothesis.diagnosis.category
            );
        } else {
            println!(
                "{}. {} ({}) - {}",
                hypothesis.order_index + 1,
                hypothesis.name(),
                hypothesis.diagnosis.category,
                hypothesis.notes
            );
        }
    }
}
