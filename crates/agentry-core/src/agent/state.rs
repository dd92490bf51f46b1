//! Run state machine.
//!
//! [`transition`] is a pure function from the current [`RunState`] and one
//! [`InternalEvent`] (produced by the executor) to the next state, the
//! external [`StreamRecord`]s to emit and the persistence [`Effect`]s to
//! apply. It knows nothing about streams, storage or async.
//!
//! ```text
//! idle -> chain_start -> model_turn -> model_ended -> (tool_running -> model_ended)*
//!                          ^                |
//!                          +----------------+  (another model turn)
//! model_turn | model_ended -> finished
//! any non-terminal        -> failed
//! ```
//!
//! The reduced path for tool-less agents starts directly with a model turn
//! from `idle`.

use serde_json::Value;

use agentry_types::event::{EventKind, StreamRecord};
use agentry_types::tool::{ToolCallRecord, ToolOutput};

use super::records::{format_retrieval_call, format_tool_call};

/// Events produced by the executor loop.
#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ChainStart,
    ModelStart,
    ModelStream(String),
    ModelEnd,
    ToolStart {
        name: String,
        input: Value,
    },
    ToolEnd {
        name: String,
        input: Value,
        output: ToolOutput,
    },
    ChainEnd {
        output: String,
    },
    Error {
        kind: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ChainStarted,
    ModelTurn,
    ModelEnded,
    ToolRunning,
    Finished,
    Failed,
}

/// Persistence the engine must perform before emitting the records of the
/// same transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PersistHuman,
    PersistAi {
        content: String,
        tool_calls: Vec<ToolCallRecord>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub phase: Phase,
    /// Set once the user message has been scheduled for persistence.
    pub human_persisted: bool,
    pub tool_calls: Vec<ToolCallRecord>,
    pub retrieval_calls: Vec<Value>,
    /// Number of model turns started so far.
    pub model_turns: u32,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            human_persisted: false,
            tool_calls: Vec::new(),
            retrieval_calls: Vec::new(),
            model_turns: 0,
        }
    }
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Finished | Phase::Failed)
    }
}

/// Output of one transition.
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub records: Vec<StreamRecord>,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn record(record: StreamRecord) -> Self {
        Self {
            records: vec![record],
            effects: Vec::new(),
        }
    }
}

/// Advance the run by one internal event.
///
/// Terminal states absorb every event. Events that are not valid in the
/// current phase leave the state unchanged and emit nothing.
pub fn transition(mut state: RunState, event: InternalEvent) -> (RunState, Transition) {
    if state.is_terminal() {
        return (state, Transition::default());
    }

    let out = match (state.phase, event) {
        (_, InternalEvent::Error { kind, message }) => {
            state.phase = Phase::Failed;
            Transition::record(StreamRecord::error(kind, message))
        }

        (Phase::Idle, InternalEvent::ChainStart) => {
            state.phase = Phase::ChainStarted;
            Transition::record(StreamRecord::new(EventKind::ChainStart).with_data("Agent"))
        }

        (Phase::Idle | Phase::ChainStarted | Phase::ModelEnded, InternalEvent::ModelStart) => {
            state.phase = Phase::ModelTurn;
            state.model_turns += 1;
            let mut effects = Vec::new();
            if !state.human_persisted {
                state.human_persisted = true;
                effects.push(Effect::PersistHuman);
            }
            Transition {
                records: vec![
                    StreamRecord::new(EventKind::ChatModelStart)
                        .with_tool_calls(state.tool_calls.clone()),
                ],
                effects,
            }
        }

        (Phase::ModelTurn, InternalEvent::ModelStream(text)) => {
            if text.is_empty() {
                Transition::default()
            } else {
                Transition::record(StreamRecord::new(EventKind::ChatModelStream).with_data(text))
            }
        }

        (Phase::ModelTurn, InternalEvent::ModelEnd) => {
            state.phase = Phase::ModelEnded;
            Transition::default()
        }

        (Phase::ModelEnded, InternalEvent::ToolStart { name, input }) => {
            state.phase = Phase::ToolRunning;
            Transition::record(
                StreamRecord::new(EventKind::ToolStart)
                    .with_data(format!("Starting tool: {name} with inputs: {input}")),
            )
        }

        (Phase::ToolRunning, InternalEvent::ToolEnd { name, input, output }) => {
            state.phase = Phase::ModelEnded;
            state.tool_calls.push(format_tool_call(&name, &input, &output));
            if let Some(call) = format_retrieval_call(&name, &input, &output) {
                state.retrieval_calls.push(call);
            }
            Transition::record(StreamRecord::new(EventKind::ToolEnd).with_data(name))
        }

        (Phase::ModelTurn | Phase::ModelEnded, InternalEvent::ChainEnd { output }) => {
            state.phase = Phase::Finished;
            Transition {
                records: vec![
                    StreamRecord::new(EventKind::ChainEnd)
                        .with_data(output.clone())
                        .with_tool_calls(state.tool_calls.clone())
                        .with_retrieval_calls(state.retrieval_calls.clone()),
                ],
                effects: vec![Effect::PersistAi {
                    content: output,
                    tool_calls: state.tool_calls.clone(),
                }],
            }
        }

        (phase, event) => {
            tracing::debug!(?phase, ?event, "ignoring event not valid in current phase");
            Transition::default()
        }
    };

    (state, out)
}
