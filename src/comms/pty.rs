//! Console channel: reads lines from stdin, prints replies to stdout.
//!
//! One session for the whole console run. Lines starting with `/` are
//! commands; everything else is a user turn. Runs until `shutdown` is
//! cancelled, stdin closes, or the user types `/quit`; the latter two
//! cancel `shutdown` for every other component.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::reports::{IncidentReport, ReportFilter, ReportSubmission};
use crate::router::RouterReply;
use crate::runtime::{Component, ComponentFuture};

use super::state::AssistantState;

const HELP: &str = "\
Commands:
  /help                                              show this help
  /report <type> | <location> | <details> | <contact>  file an incident report
  /reports                                           list reports filed in this session
  /quit                                              leave the console
Types: Rescue, Medical, Food, Shelter, Other. Anything else is sent to the assistant.";

// ── Command parsing ───────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Help,
    Quit,
    Report(ReportSubmission),
    Reports,
    Unknown(String),
    Chat(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Input::Chat(line.to_string());
    };
    let (cmd, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match cmd.to_ascii_lowercase().as_str() {
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        "reports" => Input::Reports,
        "report" => {
            let mut fields = args.split('|').map(str::trim);
            Input::Report(ReportSubmission::new(
                fields.next().unwrap_or_default(),
                fields.next().unwrap_or_default(),
                fields.next().unwrap_or_default(),
                fields.next().unwrap_or_default(),
            ))
        }
        other => Input::Unknown(other.to_string()),
    }
}

fn format_reply(reply: &RouterReply) -> String {
    let mut out = String::new();
    for w in &reply.warnings {
        out.push_str(&format!("! {w}\n"));
    }
    out.push_str(&format!("[{}] {}", reply.provider, reply.text));
    out
}

fn format_report(r: &IncidentReport) -> String {
    format!(
        "{} {:<8} {:<8} {} | {}{}",
        r.timestamp.format("%Y-%m-%d %H:%M"),
        r.kind,
        r.priority,
        r.location,
        r.details,
        if r.contact.is_empty() { String::new() } else { format!(" (contact {})", r.contact) },
    )
}

// ── PtyChannel ────────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    state: Arc<AssistantState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<AssistantState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.state, shutdown))
    }
}

async fn run_pty(channel_id: String, state: Arc<AssistantState>, shutdown: CancellationToken) -> Result<(), AppError> {
    let mut session_id = state.open_session().await;
    info!(%channel_id, %session_id, "console channel started");
    println!("─────────────────────────────────");
    println!(" {} console  (/help, Ctrl-C to quit)", state.name());
    println!("─────────────────────────────────");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!();
                info!(%channel_id, "console channel shutting down");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        warn!("console read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("console stdin closed");
                        break;
                    }
                    Ok(Some(line)) => parse_input(&line),
                };
                debug!(?input, "console input");
                if input != Input::Empty {
                    // A console left idle past the retention window loses its session.
                    session_id = state.resume_session(session_id).await;
                }
                if !handle_input(&state, session_id, input).await {
                    break;
                }
            }
        }
    }

    // The console drives the process when it runs; closing it stops the rest.
    shutdown.cancel();
    Ok(())
}

/// Returns `false` when the console should close.
async fn handle_input(state: &AssistantState, session_id: Uuid, input: Input) -> bool {
    match input {
        Input::Empty => {}
        Input::Help => println!("{HELP}"),
        Input::Quit => return false,
        Input::Unknown(cmd) => println!("unknown command '/{cmd}', try /help"),
        Input::Chat(text) => match state.send_message(Some(session_id), &text).await {
            Ok((_, reply)) => println!("{}", format_reply(&reply)),
            Err(e) => println!("error: {e}"),
        },
        Input::Report(submission) => match state.submit_report(session_id, submission).await {
            Ok(report) => println!("report {} filed with {} priority", report.id, report.priority),
            Err(e) => println!("error: {e}"),
        },
        Input::Reports => match state.list_reports(session_id, &ReportFilter::default()).await {
            Ok(reports) if reports.is_empty() => println!("no reports filed yet"),
            Ok(reports) => reports.iter().for_each(|r| println!("{}", format_report(r))),
            Err(e) => println!("error: {e}"),
        },
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse_input("  flood help "), Input::Chat("flood help".into()));
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse_input("/HELP"), Input::Help);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/reports"), Input::Reports);
        assert_eq!(parse_input("/dance now"), Input::Unknown("dance".into()));
    }

    #[test]
    fn report_fields_split_on_pipes() {
        let Input::Report(sub) = parse_input("/report Medical | Ward 5 | Injury | 123") else {
            panic!("expected report");
        };
        assert_eq!(sub.kind, "Medical");
        assert_eq!(sub.location, "Ward 5");
        assert_eq!(sub.details, "Injury");
        assert_eq!(sub.contact, "123");
    }

    #[test]
    fn short_report_leaves_fields_blank() {
        let Input::Report(sub) = parse_input("/report Food | Ward 2") else {
            panic!("expected report");
        };
        assert_eq!(sub.location, "Ward 2");
        assert!(sub.details.is_empty());
        assert!(sub.contact.is_empty());
    }

    #[test]
    fn reply_shows_provider_and_warnings() {
        let reply = RouterReply {
            text: "Move uphill.".into(),
            provider: "Fallback System".into(),
            warnings: vec!["OpenAI unavailable: timed out".into()],
        };
        assert_eq!(format_reply(&reply), "! OpenAI unavailable: timed out\n[Fallback System] Move uphill.");
    }
}
