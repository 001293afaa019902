//! Response framing
//!
//! Writes memcached-style reply lines. Callers own flushing.

use std::io::Write;

use crate::error::{BrokerError, Result};

/// Terminates every successful GET and STATS reply
pub const END: &[u8] = b"END\r\n";

/// Write a `VALUE <queue> 0 <len>` header followed by the data block
pub fn write_value<W: Write>(writer: &mut W, queue: &str, value: &[u8]) -> Result<()> {
    write!(writer, "VALUE {} 0 {}\r\n", queue, value.len())?;
    writer.write_all(value)?;
    writer.write_all(b"\r\n")?;
    Ok(())
}

pub fn write_end<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(END)?;
    Ok(())
}

pub fn write_stored<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(b"STORED\r\n")?;
    Ok(())
}

pub fn write_stat<W: Write>(writer: &mut W, name: &str, value: impl std::fmt::Display) -> Result<()> {
    write!(writer, "STAT {} {}\r\n", name, value)?;
    Ok(())
}

pub fn write_version<W: Write>(writer: &mut W, version: &str) -> Result<()> {
    write!(writer, "VERSION {}\r\n", version)?;
    Ok(())
}

/// Frame an error the way memcached clients expect
///
/// - unknown verbs and sub-commands: `ERROR`
/// - mistakes the client must correct: `CLIENT_ERROR <msg>`
/// - everything else: `SERVER_ERROR <msg>`
pub fn write_error<W: Write>(writer: &mut W, err: &BrokerError) -> Result<()> {
    match err {
        BrokerError::InvalidCommand => writer.write_all(b"ERROR\r\n")?,
        e if e.is_client_error() => write!(writer, "CLIENT_ERROR {}\r\n", e)?,
        e => write!(writer, "SERVER_ERROR {}\r\n", e)?,
    }
    Ok(())
}
