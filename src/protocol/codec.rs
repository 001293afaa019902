//! Protocol codec
//!
//! Line-oriented reading and writing for the text protocol.
//!
//! ## Wire Format
//!
//! ```text
//! GET <queue>[::<group>][/<sub-command>][/t=<millis>]\r\n
//! SET <queue> <flags> <exptime> <bytes>\r\n<data block>\r\n
//! STATS\r\n
//! VERSION\r\n
//! QUIT\r\n
//! ```
//!
//! Replies:
//! ```text
//! VALUE <queue> 0 <bytes>\r\n<data block>\r\nEND\r\n
//! STORED\r\n
//! STAT <name> <value>\r\n ... END\r\n
//! ERROR\r\n | CLIENT_ERROR <msg>\r\n | SERVER_ERROR <msg>\r\n
//! ```

use std::io::{BufRead, Read, Write};

use crate::error::{BrokerError, Result};
use super::Request;

/// Longest accepted command line (excluding data blocks)
pub const MAX_LINE_LENGTH: usize = 2048;

// =============================================================================
// Server side
// =============================================================================

/// Read one request from a stream
///
/// Blocks until a complete request is received. A clean EOF before any byte
/// of a new request surfaces as `UnexpectedEof`.
pub fn read_request<R: BufRead>(reader: &mut R, max_value_size: usize) -> Result<Request> {
    let line = read_line(reader)?;
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();

    let verb = match tokens.first() {
        Some(verb) => verb.to_ascii_lowercase(),
        None => return Ok(Request::Unknown(String::new())),
    };

    match verb.as_str() {
        "get" => {
            if tokens.len() < 2 {
                return Err(BrokerError::Protocol("GET requires a queue name".to_string()));
            }
            Ok(Request::Get(tokens.iter().map(|t| t.to_string()).collect()))
        }
        "set" => read_set(reader, &tokens, max_value_size),
        "stats" => Ok(Request::Stats),
        "version" => Ok(Request::Version),
        "quit" => Ok(Request::Quit),
        _ => Ok(Request::Unknown(tokens[0].to_string())),
    }
}

/// Read the data block that follows a SET header
fn read_set<R: BufRead>(reader: &mut R, tokens: &[&str], max_value_size: usize) -> Result<Request> {
    if tokens.len() < 5 {
        return Err(BrokerError::Protocol(
            "SET requires <queue> <flags> <exptime> <bytes>".to_string(),
        ));
    }

    let len: usize = tokens[4]
        .parse()
        .map_err(|_| BrokerError::Protocol(format!("invalid byte count: {}", tokens[4])))?;

    if len > max_value_size {
        return Err(BrokerError::Protocol(format!(
            "value too large: {} bytes (max {})",
            len, max_value_size
        )));
    }

    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data)?;
    if !data.ends_with(b"\r\n") {
        return Err(BrokerError::Protocol("bad data chunk".to_string()));
    }
    data.truncate(len);

    Ok(Request::Set {
        queue: tokens[1].to_string(),
        data,
    })
}

/// Read a line, stripping the trailing CRLF (or bare LF)
fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    if !buf.ends_with(b"\n") {
        if buf.len() > MAX_LINE_LENGTH {
            return Err(BrokerError::Protocol("line too long".to_string()));
        }
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }

    buf.pop();
    if buf.ends_with(b"\r") {
        buf.pop();
    }

    String::from_utf8(buf).map_err(|_| BrokerError::Protocol("command line is not UTF-8".to_string()))
}

// =============================================================================
// Client side
// =============================================================================

/// A reply read back by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Zero or more `VALUE` blocks terminated by `END`
    Values(Vec<(String, Vec<u8>)>),

    Stored,

    /// `STAT` lines terminated by `END`
    Stats(Vec<(String, String)>),

    Version(String),

    /// `ERROR`, `CLIENT_ERROR ...` or `SERVER_ERROR ...`, verbatim
    Error(String),
}

/// Write a GET for a queue specifier
pub fn write_get<W: Write>(writer: &mut W, spec: &str) -> Result<()> {
    write!(writer, "GET {}\r\n", spec)?;
    writer.flush()?;
    Ok(())
}

/// Write a SET enqueuing `data` onto `queue`
pub fn write_set<W: Write>(writer: &mut W, queue: &str, data: &[u8]) -> Result<()> {
    write!(writer, "SET {} 0 0 {}\r\n", queue, data.len())?;
    writer.write_all(data)?;
    writer.write_all(b"\r\n")?;
    writer.flush()?;
    Ok(())
}

/// Write a bare verb such as `STATS` or `VERSION`
pub fn write_simple<W: Write>(writer: &mut W, verb: &str) -> Result<()> {
    write!(writer, "{}\r\n", verb)?;
    writer.flush()?;
    Ok(())
}

/// Read one complete reply
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let mut values = Vec::new();
    let mut stats = Vec::new();

    loop {
        let line = read_line(reader)?;
        let mut parts = line.splitn(2, ' ');
        let head = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();

        match head {
            "END" => {
                if !stats.is_empty() {
                    return Ok(Reply::Stats(stats));
                }
                return Ok(Reply::Values(values));
            }
            "VALUE" => {
                let fields: Vec<&str> = rest.split_ascii_whitespace().collect();
                if fields.len() < 3 {
                    return Err(BrokerError::Protocol(format!("malformed VALUE line: {}", line)));
                }
                let len: usize = fields[2]
                    .parse()
                    .map_err(|_| BrokerError::Protocol(format!("malformed VALUE line: {}", line)))?;
                let mut data = vec![0u8; len + 2];
                reader.read_exact(&mut data)?;
                data.truncate(len);
                values.push((fields[0].to_string(), data));
            }
            "STAT" => {
                let (name, value) = rest.split_once(' ').unwrap_or((rest, ""));
                stats.push((name.to_string(), value.to_string()));
            }
            "STORED" => return Ok(Reply::Stored),
            "VERSION" => return Ok(Reply::Version(rest.to_string())),
            "ERROR" | "CLIENT_ERROR" | "SERVER_ERROR" => return Ok(Reply::Error(line.clone())),
            _ => {
                return Err(BrokerError::Protocol(format!("unexpected reply line: {}", line)));
            }
        }
    }
}
