//! Protocol Module
//!
//! Defines the text wire protocol for client-server communication.
//!
//! ## GET Queue Specifier
//! ```text
//! <queue>[::<group>][/<sub-command>][/t=<millis>]
//! ```
//!
//! ### Sub-commands
//! - (none), `open`: dequeue, holding the item open for `open`
//! - `close`: release the open item
//! - `close/open`: release the open item, then open the next one
//! - `abort`: return the open item to its queue
//! - `peek`: read the head item without removing it
//!
//! The `t=` fragment may appear anywhere in the specifier and is stripped
//! before the rest is split.

mod command;
mod response;
mod codec;

pub use command::{GetCommand, Request, SubCommand, CONSUMER_GROUP_SEPARATOR};
pub use response::{write_end, write_error, write_stat, write_stored, write_value, write_version, END};
pub use codec::{read_reply, read_request, write_get, write_set, write_simple, Reply, MAX_LINE_LENGTH};
