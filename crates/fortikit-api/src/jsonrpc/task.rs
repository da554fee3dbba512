// Task polling for JSON-RPC products
//
// Long-running operations (package assignment, installs) return a task id.
// The task is polled at `/task/task/<id>/line`; each poll returns one entry
// per device line, each with its own cumulative `history`. A tracker keeps
// what has been seen so far so history entries are reported exactly once.

use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::{JsonRpcApi, JsonRpcKind, rpc};
use crate::client::ApiClient;
use crate::error::Error;

/// Identifier of a server-side task. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    /// `None` for zero, which the appliance uses for "no task".
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a task or one of its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Aborted,
    Done,
    Error,
}

impl TaskState {
    /// Map the appliance's numeric state code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Pending,
            1 | 2 | 6 | 9 => Self::Running,
            3 | 7 => Self::Aborted,
            4 | 8 => Self::Done,
            _ => Self::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted | Self::Done | Self::Error)
    }

    /// Combine line states: any error wins, then aborted, then running.
    fn aggregate(states: impl IntoIterator<Item = Self>) -> Self {
        let mut pending = false;
        let mut running = false;
        let mut aborted = false;
        let mut any = false;
        for state in states {
            any = true;
            match state {
                Self::Error => return Self::Error,
                Self::Aborted => aborted = true,
                Self::Running => running = true,
                Self::Pending => pending = true,
                Self::Done => {}
            }
        }
        if aborted {
            Self::Aborted
        } else if running {
            Self::Running
        } else if pending || !any {
            Self::Pending
        } else {
            Self::Done
        }
    }
}

/// Bounds for [`ApiClient::wait_for_task`].
#[derive(Debug, Clone)]
pub struct TaskWait {
    pub poll_interval: Duration,
    /// Give up after this many polls.
    pub max_polls: Option<u32>,
    /// Give up once this much time has passed since the first poll.
    pub deadline: Option<Duration>,
}

impl Default for TaskWait {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: None,
            deadline: Some(Duration::from_secs(600)),
        }
    }
}

/// The [`TaskWait`] bound that ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLimit {
    Polls(u32),
    Deadline { waited: Duration, polls: u32 },
}

impl fmt::Display for TaskLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polls(polls) => write!(f, "{polls} polls"),
            Self::Deadline { waited, polls } => {
                write!(f, "{}s ({polls} polls)", waited.as_secs())
            }
        }
    }
}

/// One device line of a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLine {
    pub name: String,
    pub state: TaskState,
    pub percent: u64,
    pub detail: String,
    /// Every history entry seen for this line, oldest first.
    pub history: Vec<String>,
}

/// Final view of a polled task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    /// Average progress over all lines.
    pub percent: u64,
    pub state: TaskState,
    pub lines: Vec<TaskLine>,
    /// History entries of all lines in the order they were first seen.
    pub messages: Vec<String>,
}

impl Task {
    pub fn is_finished(&self) -> bool {
        self.percent >= 100 || (!self.lines.is_empty() && self.state.is_terminal())
    }

    fn new(id: TaskId) -> Self {
        Self {
            id,
            percent: 0,
            state: TaskState::Pending,
            lines: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Merge one poll's `data` array. Lines are matched by position, and
    /// history entries beyond those already recorded are appended.
    fn update(&mut self, data: &[Value]) {
        for (index, raw) in data.iter().enumerate() {
            if index == self.lines.len() {
                self.lines.push(TaskLine {
                    name: String::new(),
                    state: TaskState::Pending,
                    percent: 0,
                    detail: String::new(),
                    history: Vec::new(),
                });
            }
            let Some(line) = self.lines.get_mut(index) else {
                continue;
            };

            line.name = str_field(raw, "name")
                .or_else(|| str_field(raw, "oid"))
                .unwrap_or_else(|| format!("line {index}"));
            line.state = TaskState::from_code(raw.get("state").and_then(Value::as_i64).unwrap_or(0));
            line.percent = percent_of(raw);
            line.detail = str_field(raw, "detail").unwrap_or_default();

            let history = raw
                .get("history")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for entry in history.iter().skip(line.history.len()) {
                let text = str_field(entry, "detail").unwrap_or_else(|| entry.to_string());
                self.messages.push(format!("{}: {text}", line.name));
                line.history.push(text);
            }
        }

        if !self.lines.is_empty() {
            let total: u64 = self.lines.iter().map(|l| l.percent).sum();
            self.percent = total / self.lines.len() as u64;
        }
        self.state = TaskState::aggregate(self.lines.iter().map(|l| l.state));
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_of(value: &Value) -> u64 {
    value
        .get("percent")
        .and_then(Value::as_f64)
        .map_or(0, |p| p.clamp(0.0, 100.0).round() as u64)
}

impl<K: JsonRpcKind> ApiClient<JsonRpcApi<K>> {
    /// Poll a task until it finishes or one of the `wait` bounds runs out.
    pub async fn wait_for_task(&mut self, task_id: TaskId, wait: &TaskWait) -> Result<Task, Error> {
        let started = Instant::now();
        let url = format!("/task/task/{task_id}/line");
        let mut task = Task::new(task_id);
        let mut polls = 0u32;

        // tokio rejects a zero period
        let mut interval = tokio::time::interval(wait.poll_interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let response = self.api(rpc("get", &url, None)).await?;
            polls += 1;

            let data = response
                .body
                .pointer("/result/0/data")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            task.update(data);
            debug!(task = %task_id, percent = task.percent, state = %task.state, "task progress");

            if task.is_finished() {
                info!(task = %task_id, state = %task.state, polls, "task finished");
                return Ok(task);
            }

            let waited = started.elapsed();
            let limit = if wait
                .deadline
                .is_some_and(|deadline| waited + wait.poll_interval > deadline)
            {
                Some(TaskLimit::Deadline { waited, polls })
            } else if wait.max_polls.is_some_and(|max| polls >= max) {
                Some(TaskLimit::Polls(polls))
            } else {
                None
            };
            if let Some(limit) = limit {
                return Err(Error::TaskTimeout {
                    task_id: task_id.get(),
                    limit,
                });
            }
        }
    }
}
