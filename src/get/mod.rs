//! GET Module
//!
//! The per-connection GET state machine.
//!
//! ## Sub-command dispatch
//! ```text
//!   ""/open ──► open-get ──(value, sub contains "open")──► Transaction::open
//!   close ────► close ─────(transaction open)────────────► open_reads -1, clear
//!   close/open► close, then open-get
//!   abort ────► requeue stored value on the stored queue ─► open_reads -1, clear
//!   peek ─────► read head item, no state change
//! ```
//!
//! Every successful dispatch ends with `END\r\n`. On error nothing more is
//! written and the error is returned to the connection for framing.

mod transaction;
mod wait;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::consumer::{Consumer, ConsumerResolver, StatsSink};
use crate::error::{BrokerError, Result};
use crate::protocol::{write_end, write_value, GetCommand, SubCommand};

pub use transaction::{OpenRead, Transaction};
pub use wait::dequeue_with_timeout;

/// Default pause between dequeue attempts for consumers that cannot signal
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handles GET for a single connection
pub struct GetHandler {
    /// Maps queue/group to consumer handles
    resolver: Arc<dyn ConsumerResolver>,

    /// Receives the process-wide GET count
    stats: Arc<dyn StatsSink>,

    /// The connection's open read, if any
    transaction: Transaction,

    poll_interval: Duration,
}

impl GetHandler {
    pub fn new(resolver: Arc<dyn ConsumerResolver>, stats: Arc<dyn StatsSink>) -> Self {
        Self {
            resolver,
            stats,
            transaction: Transaction::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the pause between dequeue attempts
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Parse and execute GET tokens, writing the reply to `out`
    pub fn handle_get<S: AsRef<str>, W: Write>(&mut self, tokens: &[S], out: &mut W) -> Result<()> {
        let cmd = GetCommand::parse(tokens);
        self.execute(&cmd, out)
    }

    /// Execute an already parsed GET
    pub fn execute<W: Write>(&mut self, cmd: &GetCommand, out: &mut W) -> Result<()> {
        match cmd.sub() {
            Some(SubCommand::Open) => self.open(cmd, out)?,
            Some(SubCommand::Close) => self.close(cmd)?,
            Some(SubCommand::CloseOpen) => {
                self.close(cmd)?;
                self.open(cmd, out)?;
            }
            Some(SubCommand::Abort) => self.abort()?,
            Some(SubCommand::Peek) => self.peek(cmd, out)?,
            None => return Err(BrokerError::InvalidCommand),
        }

        write_end(out)
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Drop any open read without returning it to its queue
    ///
    /// Called on connection teardown. The queue's open-read count is left
    /// as is: the item is gone, not closed.
    pub fn abandon(&mut self) -> Option<OpenRead> {
        self.transaction.take()
    }

    // =========================================================================
    // Sub-commands
    // =========================================================================

    fn open<W: Write>(&mut self, cmd: &GetCommand, out: &mut W) -> Result<()> {
        if self.transaction.is_open() {
            return Err(BrokerError::TransactionAlreadyOpen);
        }

        let consumer = self.resolve(cmd)?;

        let value = dequeue_with_timeout(consumer.as_ref(), cmd.timeout(), self.poll_interval);
        self.stats.incr_cmd_get();

        let Some(value) = value else {
            return Ok(());
        };

        if let Err(e) = write_value(out, &cmd.queue_name, &value) {
            // The client never saw the item; put it back for the next reader
            if let Err(requeue_err) = consumer.requeue(value) {
                tracing::warn!("{}: item lost after failed reply: {}", cmd, requeue_err);
            }
            return Err(e);
        }

        if cmd.opens_transaction() {
            tracing::trace!("Opened read on {} ({} bytes)", cmd.queue_name, value.len());
            self.transaction.open(cmd.clone(), value);
            consumer.stats().update_open_reads(1);
        }
        Ok(())
    }

    fn close(&mut self, cmd: &GetCommand) -> Result<()> {
        let consumer = self.resolve(cmd)?;

        if self.transaction.take().is_some() {
            consumer.stats().update_open_reads(-1);
        }
        Ok(())
    }

    /// Requeue the open read onto the queue it was opened from
    fn abort(&mut self) -> Result<()> {
        let Some(read) = self.transaction.current() else {
            return Ok(());
        };

        let consumer = self.resolve(&read.command)?;
        consumer
            .requeue(read.value.clone())
            .map_err(BrokerError::command)?;

        self.transaction.take();
        consumer.stats().update_open_reads(-1);
        Ok(())
    }

    fn peek<W: Write>(&mut self, cmd: &GetCommand, out: &mut W) -> Result<()> {
        let consumer = self.resolve(cmd)?;

        if let Some(value) = consumer.peek().filter(|v| !v.is_empty()) {
            write_value(out, &cmd.queue_name, &value)?;
        }

        self.stats.incr_cmd_get();
        Ok(())
    }

    fn resolve(&self, cmd: &GetCommand) -> Result<Arc<dyn Consumer>> {
        self.resolver
            .resolve(&cmd.queue_name, &cmd.consumer_group)
            .map_err(|e| {
                tracing::warn!("{}: {}", cmd, e);
                BrokerError::command(e)
            })
    }
}
