//! Line-oriented operator console.
//!
//! Each input line is parsed into a [`Command`] and executed against the
//! orchestrator; new operator log entries are echoed as they arrive.

use anyhow::{Context, Result};
use fm_agents::{Orchestrator, StartOutcome};
use fm_core::event_bus::DashboardEvent;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::report;

/// Log lines shown by `logs`.
pub const LOG_TAIL: usize = 20;

pub const HELP: &str = "\
commands:
  start                         run every non-completed task in priority order
  stop                          stop after the task in flight
  select <id>                   show one task
  feedback <id> <1-5> [comment] rate a task
  status | tasks | agents | logs
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Select(String),
    Feedback {
        id: String,
        rating: u8,
        comment: String,
    },
    Status,
    Tasks,
    Agents,
    Logs,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("rating must be a number from 1 to 5, got `{0}`")]
    Rating(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "select" => {
            let id = words.next().ok_or(ParseError::Usage("select <id>"))?;
            Command::Select(id.to_string())
        }
        "feedback" => {
            const USAGE: &str = "feedback <id> <1-5> [comment]";
            let id = words.next().ok_or(ParseError::Usage(USAGE))?;
            let raw = words.next().ok_or(ParseError::Usage(USAGE))?;
            let rating = raw
                .parse()
                .map_err(|_| ParseError::Rating(raw.to_string()))?;
            Command::Feedback {
                id: id.to_string(),
                rating,
                comment: words.collect::<Vec<_>>().join(" "),
            }
        }
        "status" => Command::Status,
        "tasks" => Command::Tasks,
        "agents" => Command::Agents,
        "logs" => Command::Logs,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Run `command` and return the text to show the operator.
pub async fn execute(orch: &Orchestrator, command: Command) -> String {
    match command {
        Command::Start => match orch.start().await {
            StartOutcome::Started { queued } => format!("run started: {queued} task(s) queued"),
            StartOutcome::AlreadyRunning => "already running".to_string(),
        },
        Command::Stop => {
            orch.stop().await;
            "stopped; the task in flight will finish".to_string()
        }
        Command::Select(id) => match orch.select_task(&id).await {
            Ok(task) => report::task_detail(&task),
            Err(e) => e.to_string(),
        },
        Command::Feedback {
            id,
            rating,
            comment,
        } => match orch.submit_feedback(&id, rating, comment).await {
            Ok(task) => format!("feedback saved for {}", task.id),
            Err(e) => e.to_string(),
        },
        Command::Status => {
            let metrics = orch.metrics().await;
            report::summary(
                &orch.summary().await,
                orch.is_running().await,
                metrics.as_ref(),
            )
        }
        Command::Tasks => report::task_table(&orch.tasks().await),
        Command::Agents => report::agent_table(&orch.agents().await),
        Command::Logs => report::recent_logs(&orch.logs().await, LOG_TAIL),
        Command::Help => HELP.to_string(),
        Command::Quit => "bye".to_string(),
    }
}

/// Interactive loop over stdin until `quit`, end of input or ctrl-c.
pub async fn run(orch: Orchestrator) -> Result<()> {
    let events = orch.subscribe();
    let echo = tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            if let DashboardEvent::LogAppended(entry) = event {
                println!("{}", report::log_line(&entry));
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("ctrl-c received, leaving console");
                None
            }
        };
        let Some(line) = line else { break };

        match parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                debug!(?command, "console command");
                println!("{}", execute(&orch, command).await);
            }
            Err(e) => println!("{e}"),
        }
    }

    orch.stop().await;
    orch.wait_for_drain().await;
    orch.wait_for_side_effects().await;
    echo.abort();
    Ok(())
}
