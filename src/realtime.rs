//! Change notifications fed by successful mutations.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub row: Row,
}

impl ChangeEvent {
    pub fn new(table: &str, kind: ChangeKind, row: Row) -> Self {
        Self {
            table: table.to_string(),
            kind,
            row,
        }
    }
}

pub(crate) struct Realtime {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Realtime {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn publish(&self, events: Vec<ChangeEvent>) {
        for event in events {
            // No subscribers is the common case.
            let _ = self.sender.send(event);
        }
    }

    fn receiver(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

/// Named subscription under construction.
pub struct Channel<'a> {
    realtime: &'a Realtime,
    name: String,
    table: Option<String>,
    kind: Option<ChangeKind>,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(realtime: &'a Realtime, name: &str) -> Self {
        Self {
            realtime,
            name: name.to_string(),
            table: None,
            kind: None,
        }
    }

    /// Only events for `table`; `kind` of `None` means every change.
    pub fn on(mut self, table: &str, kind: Option<ChangeKind>) -> Self {
        self.table = Some(crate::schema::canonical_table(table));
        self.kind = kind;
        self
    }

    pub fn subscribe(self) -> Subscription {
        debug!(channel = %self.name, table = ?self.table, "realtime subscribe");
        Subscription {
            name: self.name,
            table: self.table,
            kind: self.kind,
            receiver: self.realtime.receiver(),
        }
    }
}

pub struct Subscription {
    name: String,
    table: Option<String>,
    kind: Option<ChangeKind>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn wants(&self, event: &ChangeEvent) -> bool {
        self.table.as_ref().is_none_or(|t| *t == event.table)
            && self.kind.is_none_or(|k| k == event.kind)
    }

    /// Next matching event; `None` once the engine is gone. Events missed
    /// by a lagging subscriber are skipped.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.name, skipped, "realtime subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(channel = %self.name, skipped, "realtime subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
