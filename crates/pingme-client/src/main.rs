//! # pingme
//!
//! Line-oriented terminal front-end for a PingMe chat session. Reads
//! commands from stdin and prints session events as they arrive.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use pingme_net::HttpChatApi;
use pingme_shared::constants::{APP_NAME, COMMON_EMOJIS};
use pingme_shared::display::{initials, time_label};
use pingme_shared::ThreadId;

use pingme_client::{ChatSession, ClientConfig, SendOutcome, SessionEvent, TokioTimer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pingme_client::init_tracing();
    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(
        api = %config.api_url,
        user = %config.identity.username,
        authenticated = config.token.is_some(),
        "Loaded configuration"
    );

    let api = HttpChatApi::new(&config.api_url, config.token.clone(), config.request_timeout)
        .context("building chat API client")?;
    let timer = Arc::new(TokioTimer::new(Handle::current()));
    let (session, events) =
        ChatSession::new(Arc::new(api), config.identity.clone(), timer, config.typing_debounce);

    tokio::spawn(print_events(events));

    if let Err(e) = session.load_threads().await {
        warn!(error = %e, "Initial thread load failed; try /threads");
    } else {
        print_threads(&session);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Nothing => {}
            command => run(&session, command).await,
        }
    }

    info!("Bye");
    Ok(())
}

async fn run(session: &ChatSession, command: Command) {
    match command {
        Command::Threads => {
            if session.load_threads().await.is_ok() {
                print_threads(session);
            }
        }
        Command::Open(thread_id) => {
            if session.select_thread(thread_id).await.is_ok() {
                print_transcript(session);
            }
        }
        Command::Direct(username) => {
            if session.start_direct_chat(&username).await.is_ok() {
                print_transcript(session);
            }
        }
        Command::Search(query) => {
            session.set_search_query(&query);
            print_transcript(session);
        }
        Command::Reload => {
            if session.reload_transcript().await.is_ok() {
                print_transcript(session);
            }
        }
        Command::Emoji(None) => {
            for (i, emoji) in COMMON_EMOJIS.iter().enumerate() {
                print!("{}:{emoji}  ", i + 1);
            }
            println!();
        }
        Command::Emoji(Some(emoji)) => {
            session.insert_into_draft(emoji);
            println!("draft: {}", session.snapshot().draft);
        }
        Command::Send(text) => {
            // The typed line replaces the draft; anything restored after a
            // failure is only resent through /send.
            session.update_draft(&text);
            spawn_submit(session);
        }
        Command::SendDraft => spawn_submit(session),
        Command::Usage(usage) => println!("usage: {usage}"),
        Command::Quit | Command::Nothing => {}
    }
}

/// Submit the draft in the background so input stays responsive.
fn spawn_submit(session: &ChatSession) {
    let session = session.clone();
    tokio::spawn(async move {
        if let Ok(SendOutcome::Rejected(reason)) = session.submit_draft().await {
            let draft = session.snapshot().draft;
            if draft.trim().is_empty() {
                println!("! not sent: {reason}");
            } else {
                println!("! not sent: {reason}; draft kept, /send to retry: {draft}");
            }
        }
    });
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::ThreadsLoaded { count } => println!("* {count} threads"),
            SessionEvent::TranscriptLoaded { thread_id, count } => {
                println!("* thread {thread_id}: {count} messages")
            }
            SessionEvent::LoadFailed { target, reason } => {
                println!("! could not load {target}: {reason}")
            }
            SessionEvent::MessageConfirmed { message_id, .. } => println!("* sent ({message_id})"),
            SessionEvent::SendFailed { text, reason, .. } => {
                println!("! send failed ({reason}): {text}; /send to retry the restored draft")
            }
            SessionEvent::MessageReceived { thread_id, .. } => {
                println!("* new message in thread {thread_id}")
            }
        }
    }
}

fn print_threads(session: &ChatSession) {
    let snapshot = session.snapshot();
    let me = &session.identity().id;
    let now = chrono::Utc::now();
    for thread in &snapshot.threads {
        let unread = match thread.unread_count {
            0 => String::new(),
            n => format!(" ({n})"),
        };
        let label = thread.label(me);
        println!(
            "{:>5}  [{}] {}{}  {}  {}",
            thread.id,
            initials(&label),
            label,
            unread,
            thread.preview(),
            time_label(thread.updated_at, now),
        );
    }
}

fn print_transcript(session: &ChatSession) {
    let snapshot = session.snapshot();
    if let Some(thread) = &snapshot.selected_thread {
        println!("== {}", thread.label(&session.identity().id));
    }
    for visible in &snapshot.visible_messages {
        let who = if visible.is_own {
            "you"
        } else {
            visible.message.sender.display_name.as_str()
        };
        println!(
            "[{}] {}: {} ({})",
            visible.message.created_at.format("%H:%M"),
            who,
            visible.message.text,
            visible.message.status,
        );
    }
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Threads,
    Open(ThreadId),
    Direct(String),
    Search(String),
    Reload,
    /// List the palette, or insert entry `n` into the draft.
    Emoji(Option<&'static str>),
    Quit,
    /// Plain text: replaces the draft, which is then submitted.
    Send(String),
    /// Submit the draft as it stands.
    SendDraft,
    Usage(&'static str),
    Nothing,
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Command::Nothing;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let (name, arg) = match rest.split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "threads" => Command::Threads,
            "reload" => Command::Reload,
            "send" => Command::SendDraft,
            "quit" | "q" => Command::Quit,
            "search" => Command::Search(arg.to_string()),
            "open" => match arg.parse() {
                Ok(id) => Command::Open(id),
                Err(_) => Command::Usage("/open <thread id>"),
            },
            "emoji" if arg.is_empty() => Command::Emoji(None),
            "emoji" => match arg.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                Some(i) if i < COMMON_EMOJIS.len() => Command::Emoji(Some(COMMON_EMOJIS[i])),
                _ => Command::Usage("/emoji [1-10]"),
            },
            "dm" if !arg.is_empty() => Command::Direct(arg.to_string()),
            "dm" => Command::Usage("/dm <username>"),
            _ => Command::Send(line.to_string()),
        }
    }
}
