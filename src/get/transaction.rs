//! Per-connection transaction state

use bytes::Bytes;

use crate::protocol::GetCommand;

/// An item handed to the client and not yet closed or aborted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRead {
    /// The GET that opened the read; abort resolves its queue from here
    pub command: GetCommand,

    /// The dequeued item
    pub value: Bytes,
}

/// At most one open read per connection
///
/// The command and value are stored together, so one can never be set
/// without the other. Dropping a transaction with a read open abandons the
/// item: it is not returned to its queue.
#[derive(Debug, Default)]
pub struct Transaction {
    current: Option<OpenRead>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&OpenRead> {
        self.current.as_ref()
    }

    /// Record a newly opened read
    ///
    /// Callers check `is_open` first; an existing read is replaced.
    pub(crate) fn open(&mut self, command: GetCommand, value: Bytes) {
        self.current = Some(OpenRead { command, value });
    }

    /// Clear the open read, returning it
    pub(crate) fn take(&mut self) -> Option<OpenRead> {
        self.current.take()
    }
}
