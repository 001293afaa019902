//! Command definitions
//!
//! Represents requests from clients and the GET queue-specifier grammar.

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

/// Separates the queue name from the consumer group in a queue specifier
pub const CONSUMER_GROUP_SEPARATOR: &str = "::";

/// `t=<millis>` with an optional trailing slash
static TIMEOUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"t=(\d+)/?").expect("timeout pattern is valid"));

/// A `t=` segment whose value is not a digit run, e.g. `/t=abc`
static MALFORMED_TIMEOUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|/)t=[^/]*").expect("malformed timeout pattern is valid"));

/// GET sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCommand {
    /// `""` or `open`
    Open,
    Close,
    CloseOpen,
    Abort,
    Peek,
}

impl SubCommand {
    /// Map sub-command text onto a known sub-command
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "" | "open" => Some(SubCommand::Open),
            "close" => Some(SubCommand::Close),
            "close/open" => Some(SubCommand::CloseOpen),
            "abort" => Some(SubCommand::Abort),
            "peek" => Some(SubCommand::Peek),
            _ => None,
        }
    }
}

/// A parsed GET command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCommand {
    /// Verb as sent by the client
    pub name: String,

    /// Queue name with group and timeout fragments removed
    pub queue_name: String,

    /// Consumer group (empty = default group)
    pub consumer_group: String,

    /// Raw sub-command text, e.g. `close/open`
    pub sub_command: String,

    /// How long to wait for an item (milliseconds)
    pub timeout_ms: u64,
}

impl GetCommand {
    /// Parse GET tokens: `tokens[0]` is the verb, `tokens[1]` the queue specifier
    ///
    /// Never fails. A malformed timeout becomes 0 and missing pieces stay empty.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        let name = tokens.first().map(S::as_ref).unwrap_or_default();
        let mut spec = tokens
            .get(1)
            .map(|t| S::as_ref(t).to_string())
            .unwrap_or_default();

        let mut cmd = GetCommand {
            name: name.to_string(),
            ..Default::default()
        };

        if spec.contains("t=") {
            cmd.timeout_ms = TIMEOUT_PATTERN
                .captures(&spec)
                .and_then(|caps| caps.get(1))
                .and_then(|digits| digits.as_str().parse().ok())
                .unwrap_or(0);
            spec = TIMEOUT_PATTERN.replace_all(&spec, "").into_owned();
            // Anything left is a timeout we could not read; it counts as 0
            spec = MALFORMED_TIMEOUT_PATTERN.replace_all(&spec, "").into_owned();
        }

        match spec.split_once('/') {
            Some((queue, sub)) => {
                cmd.queue_name = queue.to_string();
                cmd.sub_command = sub.trim_matches('/').to_string();
            }
            None => cmd.queue_name = spec,
        }

        if cmd.queue_name.contains(CONSUMER_GROUP_SEPARATOR) {
            let mut pieces = cmd.queue_name.splitn(3, CONSUMER_GROUP_SEPARATOR);
            let queue = pieces.next().unwrap_or_default().to_string();
            cmd.consumer_group = pieces.next().unwrap_or_default().to_string();
            cmd.queue_name = queue;
        }

        cmd
    }

    /// Known sub-command, if the text names one
    pub fn sub(&self) -> Option<SubCommand> {
        SubCommand::from_text(&self.sub_command)
    }

    /// True if a successful get should hold the value open
    pub fn opens_transaction(&self) -> bool {
        self.sub_command.contains("open")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl fmt::Display for GetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.queue_name)?;
        if !self.consumer_group.is_empty() {
            write!(f, "{}{}", CONSUMER_GROUP_SEPARATOR, self.consumer_group)?;
        }
        if !self.sub_command.is_empty() {
            write!(f, "/{}", self.sub_command)?;
        }
        if self.timeout_ms > 0 {
            write!(f, "/t={}", self.timeout_ms)?;
        }
        Ok(())
    }
}

/// A request read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// GET with its raw whitespace-split tokens
    Get(Vec<String>),

    /// Enqueue a value
    Set { queue: String, data: Vec<u8> },

    /// Server statistics
    Stats,

    /// Server version
    Version,

    /// Close the connection
    Quit,

    /// Any verb the server does not handle
    Unknown(String),
}
