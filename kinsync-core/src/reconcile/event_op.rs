use std::fmt;

use serde::Serialize;

use crate::event::{Event, EventPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    Update,
}

impl OpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            OpKind::Create => "+",
            OpKind::Update => "~",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One write the importer wants to make to the event store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EventOp {
    Create(Event),
    Update { id: String, patch: EventPatch },
}

impl EventOp {
    pub fn kind(&self) -> OpKind {
        match self {
            EventOp::Create(_) => OpKind::Create,
            EventOp::Update { .. } => OpKind::Update,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            EventOp::Create(event) => &event.id,
            EventOp::Update { id, .. } => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            EventOp::Create(event) => &event.title,
            EventOp::Update { patch, .. } => &patch.title,
        }
    }
}

impl fmt::Display for EventOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.title())
    }
}
