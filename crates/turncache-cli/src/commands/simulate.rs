//! Scripted conversation against the orchestrator
//!
//! Each turn pair goes through the same path a chat service would use, so
//! the output shows where the limit is crossed, what the summarizer stored
//! and how far the cache was trimmed.

use crate::console::CliConsole;
use crate::runtime::Runtime;
use anyhow::Result;
use colored::*;
use turncache_core::{
    CachedMessage, RestoreOutcome, SessionId, SummarizationStatus, TurnReceipt,
};

const TOPICS: &[&str] = &[
    "planning a trip to Lisbon",
    "a budget for three nights",
    "vegetarian restaurants near Alfama",
    "whether to rent a car",
    "day trips to Sintra",
    "packing for spring weather",
];

fn user_turn(i: usize) -> String {
    format!("Turn {}: tell me about {}.", i + 1, TOPICS[i % TOPICS.len()])
}

fn assistant_turn(i: usize) -> String {
    format!(
        "Here are some notes on {} (reply {}).",
        TOPICS[i % TOPICS.len()],
        i + 1
    )
}

fn describe(receipt: &TurnReceipt) -> String {
    let count = match &receipt.cache {
        Some(outcome) => outcome.count.to_string(),
        None => "invalidated".red().to_string(),
    };
    match &receipt.summarization {
        SummarizationStatus::NotNeeded => format!("cache={count}"),
        SummarizationStatus::Completed {
            summarized,
            retained,
            summary_chars,
            still_needed,
        } => format!(
            "cache={count} {} summarized {summarized}, kept {retained}, summary {summary_chars} chars{}",
            "→".dimmed(),
            if *still_needed { " (still over limit)" } else { "" }
        ),
        SummarizationStatus::Failed { error } => {
            format!("cache={count} {} {}", "summarization failed:".red(), error)
        }
    }
}

pub async fn run(runtime: &Runtime, session: &str, turns: usize, fresh: bool) -> Result<()> {
    let console = CliConsole::new(true);
    let session = SessionId::new(session)?;
    let orchestrator = &runtime.orchestrator;

    console.print_header(&format!("Simulating {turns} turn pairs in '{session}'"));
    console.info(&format!(
        "message_limit={} keep_last={}",
        runtime.settings.message_limit, runtime.settings.keep_last
    ));

    if fresh {
        orchestrator.delete_session(&session).await?;
        console.info("Deleted existing session data");
    } else {
        match orchestrator.restore(&session).await? {
            RestoreOutcome::SummaryRestored { durable_messages } => console.success(&format!(
                "Restored summary of a previous run ({durable_messages} stored messages)"
            )),
            RestoreOutcome::NoSummary { durable_messages } => console.info(&format!(
                "Found {durable_messages} stored messages without a summary"
            )),
            RestoreOutcome::AlreadyPresent | RestoreOutcome::UnknownSession => {}
        }
    }
    console.print_separator();

    let mut triggers = 0;
    for i in 0..turns {
        for message in [
            CachedMessage::user(user_turn(i)),
            CachedMessage::assistant(assistant_turn(i)),
        ] {
            let role = message.role;
            let receipt = orchestrator.record_turn(&session, message).await?;
            if matches!(receipt.summarization, SummarizationStatus::Completed { .. }) {
                triggers += 1;
            }
            println!("{:>9} {}", role.label().bold(), describe(&receipt));
        }
    }

    console.print_separator();
    let context = orchestrator.load_context(&session).await?;
    console.success(&format!(
        "{triggers} summarization(s); next model call sees {} cached messages",
        context.messages.len()
    ));
    if let Some(summary) = &context.summary {
        println!("{}", "Summary:".bold());
        println!("{summary}");
    }
    Ok(())
}
