//! Line-oriented interactive shell

use crate::console::CliConsole;
use crate::runtime::Runtime;
use anyhow::{Result, bail};
use colored::*;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use turncache_core::{CacheError, CachedMessage, Role, SessionId};

const HELP: &str = "\
Commands:
  add <session> <role> <text>   Record a turn (durable, then cache)
  messages <session> [limit]    Cached messages, oldest first
  count <session>               Cached message count
  trim <session> [keep_last]    Trim the cache window
  summary <session> [text]      Show or overwrite the cached summary
  context <session>             Context for the next model call
  history <session>             Full durable history
  exists <session>              Whether the cache holds the session
  clear <session>               Clear the cached session
  delete <session>              Delete the session everywhere
  health                        Cache pool health
  help                          This text
  quit                          Exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add {
        session: SessionId,
        role: Role,
        text: String,
    },
    Messages {
        session: SessionId,
        limit: Option<usize>,
    },
    Count(SessionId),
    Trim {
        session: SessionId,
        keep_last: Option<i64>,
    },
    Summary {
        session: SessionId,
        text: Option<String>,
    },
    Context(SessionId),
    History(SessionId),
    Exists(SessionId),
    Clear(SessionId),
    Delete(SessionId),
    Health,
    Help,
    Quit,
}

fn session_arg(arg: Option<&str>) -> Result<SessionId> {
    match arg {
        Some(id) => Ok(SessionId::new(id)?),
        None => bail!("missing <session>"),
    }
}

/// Parse one shell line. Empty lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.splitn(2, char::is_whitespace);
    let name = words.next().unwrap_or_default().to_ascii_lowercase();
    let rest = words.next().unwrap_or("").trim();
    let mut args = rest.split_whitespace();

    let command = match name.as_str() {
        "add" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let session = session_arg(parts.next())?;
            let role: Role = match parts.next() {
                Some(role) => role.parse()?,
                None => bail!("usage: add <session> <role> <text>"),
            };
            let text = parts.next().map(str::trim).unwrap_or("");
            if text.is_empty() {
                bail!("usage: add <session> <role> <text>");
            }
            ShellCommand::Add {
                session,
                role,
                text: text.to_string(),
            }
        }
        "messages" => ShellCommand::Messages {
            session: session_arg(args.next())?,
            limit: args.next().map(str::parse).transpose()?,
        },
        "count" => ShellCommand::Count(session_arg(args.next())?),
        "trim" => ShellCommand::Trim {
            session: session_arg(args.next())?,
            keep_last: args.next().map(str::parse).transpose()?,
        },
        "summary" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let session = session_arg(parts.next())?;
            let text = parts
                .next()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            ShellCommand::Summary { session, text }
        }
        "context" => ShellCommand::Context(session_arg(args.next())?),
        "history" => ShellCommand::History(session_arg(args.next())?),
        "exists" => ShellCommand::Exists(session_arg(args.next())?),
        "clear" => ShellCommand::Clear(session_arg(args.next())?),
        "delete" => ShellCommand::Delete(session_arg(args.next())?),
        "health" => ShellCommand::Health,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(Some(command))
}

fn print_messages(messages: &[CachedMessage]) {
    if messages.is_empty() {
        println!("{}", "(no messages)".dimmed());
    }
    for (i, message) in messages.iter().enumerate() {
        println!("{:>3}. {}: {}", i + 1, message.role.label().bold(), message.content);
    }
}

async fn execute(runtime: &Runtime, command: ShellCommand) -> Result<()> {
    let cache = &runtime.cache;
    let orchestrator = &runtime.orchestrator;

    match command {
        ShellCommand::Add {
            session,
            role,
            text,
        } => {
            let receipt = orchestrator
                .record_turn(&session, CachedMessage::new(role, text))
                .await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        ShellCommand::Messages { session, limit } => {
            print_messages(&cache.get_messages(&session, limit).await?);
        }
        ShellCommand::Count(session) => println!("{}", cache.get_count(&session).await?),
        ShellCommand::Trim { session, keep_last } => {
            let outcome = cache.trim(&session, keep_last).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ShellCommand::Summary {
            session,
            text: Some(text),
        } => {
            cache.set_summary(&session, &text).await?;
            println!("{}", "summary stored".green());
        }
        ShellCommand::Summary {
            session,
            text: None,
        } => match cache.get_summary(&session).await? {
            Some(summary) => println!("{summary}"),
            None => println!("{}", "(no summary)".dimmed()),
        },
        ShellCommand::Context(session) => {
            let context = orchestrator.load_context(&session).await?;
            println!("{} {:?}", "source:".dimmed(), context.source);
            if let Some(summary) = &context.summary {
                println!("{} {}", "summary:".dimmed(), summary);
            }
            print_messages(&context.messages);
        }
        ShellCommand::History(session) => {
            let history = orchestrator.history(&session).await?;
            let messages: Vec<_> = history.iter().map(|m| m.to_cached()).collect();
            print_messages(&messages);
        }
        ShellCommand::Exists(session) => println!("{}", cache.session_exists(&session).await?),
        ShellCommand::Clear(session) => {
            cache.clear_session(&session).await?;
            println!("{}", "cache cleared".green());
        }
        ShellCommand::Delete(session) => {
            orchestrator.delete_session(&session).await?;
            println!("{}", "session deleted".green());
        }
        ShellCommand::Health => {
            println!("{}", serde_json::to_string_pretty(&cache.health_check().await)?);
        }
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => {}
    }
    Ok(())
}

/// Run the shell until `quit` or end of input
pub async fn run(runtime: &Runtime, verbose: bool) -> Result<()> {
    let console = CliConsole::new(verbose);
    console.print_header("turncache shell");
    println!("{}", "Type 'help' for commands.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "turncache>".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(runtime, command).await {
                    match e.downcast_ref::<CacheError>() {
                        Some(cache_error) => {
                            console.error(cache_error.user_message());
                            console.info(&format!("{} ({})", cache_error, cache_error.error_code()));
                        }
                        None => console.error(&e.to_string()),
                    }
                }
            }
            Err(e) => console.error(&e.to_string()),
        }
    }
    Ok(())
}
