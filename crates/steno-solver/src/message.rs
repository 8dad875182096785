//! Messages carried to the host UI.

use std::sync::Mutex;

use tracing::{error, info, warn};

/// One message from the solver to whatever is driving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Plain progress/status text; echoed to the output file when configured.
    Status(String),
    /// Periodic progress while a mark entry is being expanded.
    InProgress {
        entry: usize,
        examined: u64,
        total: u64,
        inserted: u64,
    },
    /// The solve ran to completion.
    Success { positions: u64, report: String },
    /// The steno or configuration was rejected before/during setup.
    Error(String),
    /// The solve stopped early (cancellation or position limit).
    Abort(String),
}

/// Seam between the solver and its host.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: Message);
}

/// Collects everything; the test suites read it back.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<Message>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().expect("sink poisoned").clone()
    }
}

impl MessageSink for CollectingSink {
    fn send(&self, message: Message) {
        self.messages.lock().expect("sink poisoned").push(message);
    }
}

/// Routes messages into the tracing subscriber.
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn send(&self, message: Message) {
        match message {
            Message::Status(text) => info!("{text}"),
            Message::InProgress {
                entry,
                examined,
                total,
                inserted,
            } => info!(entry, examined, total, inserted, "in progress"),
            Message::Success { positions, report } => {
                info!(positions, "solve complete");
                if !report.is_empty() {
                    info!("{report}");
                }
            }
            Message::Error(text) => error!("{text}"),
            Message::Abort(text) => warn!("{text}"),
        }
    }
}

/// Discards everything.
pub struct NullSink;

impl MessageSink for NullSink {
    fn send(&self, _message: Message) {}
}

/// ASCII diagram of the placement field of a position key, rank 8 first.
pub fn render_board(key: &str) -> String {
    let placement = key.split_whitespace().next().unwrap_or("");
    let mut out = String::new();
    for rank in placement.split('/') {
        for c in rank.chars() {
            if let Some(n) = c.to_digit(10) {
                for _ in 0..n {
                    out.push('.');
                    out.push(' ');
                }
            } else {
                out.push(c);
                out.push(' ');
            }
        }
        out.pop();
        out.push('\n');
    }
    out
}
