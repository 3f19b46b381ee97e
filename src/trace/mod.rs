//! Sequenced audit trace of pipeline actions.
//!
//! Every pipeline stage reports structured events to a [`TraceLogger`]. The
//! logger is append-only: events are numbered from 1 in the order they are
//! recorded and never removed or reordered until [`TraceLogger::clear`] starts
//! a new run.
//!
//! Readers either take a [`TraceLogger::snapshot`] or [`TraceLogger::subscribe`]
//! to receive events as they are appended.

pub mod view;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

pub use view::render_trace;

/// Capacity of the live event channel. Slow subscribers lag, the log itself
/// is unaffected.
const SUBSCRIBER_CAPACITY: usize = 256;

/// Kind of a recorded pipeline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceKind {
    Query,
    ModelInput,
    ModelOutput,
    ToolInput,
    ToolOutput,
    FinalResult,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceKind::Query => write!(f, "QUERY"),
            TraceKind::ModelInput => write!(f, "MODEL_INPUT"),
            TraceKind::ModelOutput => write!(f, "MODEL_OUTPUT"),
            TraceKind::ToolInput => write!(f, "TOOL_INPUT"),
            TraceKind::ToolOutput => write!(f, "TOOL_OUTPUT"),
            TraceKind::FinalResult => write!(f, "FINAL_RESULT"),
        }
    }
}

/// One recorded pipeline action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: TraceKind,
    /// Label grouping related events, e.g. "Price Comparison".
    pub step: String,
    pub payload: Value,
}

struct TraceLog {
    events: Vec<TraceEvent>,
    next_sequence: u64,
}

impl TraceLog {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            next_sequence: 1,
        }
    }
}

/// Shared handle to an ordered, append-only event log.
///
/// Cloning the handle shares the same log. Sequence issuance and append
/// happen under one lock, so concurrent callers always observe a single
/// strictly increasing sequence.
#[derive(Clone)]
pub struct TraceLogger {
    log: Arc<Mutex<TraceLog>>,
    live: broadcast::Sender<TraceEvent>,
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TraceLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceLogger")
            .field("events", &self.len())
            .finish()
    }
}

impl TraceLogger {
    /// Create an independent logger.
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            log: Arc::new(Mutex::new(TraceLog::new())),
            live,
        }
    }

    /// The process-wide logger.
    pub fn global() -> &'static TraceLogger {
        static GLOBAL: OnceLock<TraceLogger> = OnceLock::new();
        GLOBAL.get_or_init(TraceLogger::new)
    }

    // A panic while holding the lock cannot leave the log half-written:
    // the sequence bump and the push happen without intervening calls.
    fn lock(&self) -> MutexGuard<'_, TraceLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event and return it.
    pub fn record(&self, kind: TraceKind, payload: Value, step: &str) -> TraceEvent {
        let mut log = self.lock();

        let event = TraceEvent {
            sequence: log.next_sequence,
            timestamp: Utc::now(),
            kind,
            step: step.to_string(),
            payload,
        };
        log.next_sequence += 1;
        log.events.push(event.clone());

        // Sent under the lock so subscribers see sequence order.
        let _ = self.live.send(event.clone());
        drop(log);

        debug!("trace #{} {} [{}]", event.sequence, event.kind, event.step);
        event
    }

    /// Current log contents, in sequence order.
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.lock().events.clone()
    }

    /// Empty the log and restart numbering at 1.
    pub fn clear(&self) {
        let mut log = self.lock();
        log.events.clear();
        log.next_sequence = 1;
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every event appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.live.subscribe()
    }

    pub fn log_query(&self, query: &str) -> TraceEvent {
        self.record(
            TraceKind::Query,
            json!({ "query": query, "timestamp": Utc::now().to_rfc3339() }),
            "Initial Query",
        )
    }

    pub fn log_model_input(&self, prompt: &str, model: &str, step: &str) -> TraceEvent {
        self.record(
            TraceKind::ModelInput,
            json!({ "prompt": prompt, "model": model }),
            step,
        )
    }

    pub fn log_model_output(&self, response: &str, step: &str) -> TraceEvent {
        self.record(TraceKind::ModelOutput, json!({ "response": response }), step)
    }

    pub fn log_tool_input(&self, tool: &str, parameters: Value, step: &str) -> TraceEvent {
        self.record(
            TraceKind::ToolInput,
            json!({ "tool": tool, "parameters": parameters }),
            step,
        )
    }

    pub fn log_tool_output(&self, tool: &str, result: Value, step: &str) -> TraceEvent {
        self.record(
            TraceKind::ToolOutput,
            json!({ "tool": tool, "result": result }),
            step,
        )
    }

    pub fn log_final_result(&self, recommendation: &str) -> TraceEvent {
        self.record(
            TraceKind::FinalResult,
            json!({ "recommendation": recommendation, "timestamp": Utc::now().to_rfc3339() }),
            "Final Result",
        )
    }
}
