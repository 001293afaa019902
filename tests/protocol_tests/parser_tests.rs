//! Parser Tests
//!
//! Tests for the GET queue-specifier grammar and the request line codec.

use std::io::Cursor;

use queuekv::protocol::{read_reply, read_request, GetCommand, Reply, Request, SubCommand};
use queuekv::BrokerError;

// =============================================================================
// Helper Functions
// =============================================================================

fn parse(spec: &str) -> GetCommand {
    GetCommand::parse(&["GET", spec])
}

fn request(raw: &str) -> queuekv::Result<Request> {
    read_request(&mut Cursor::new(raw.as_bytes().to_vec()), 1024)
}

// =============================================================================
// Queue Specifier Tests
// =============================================================================

#[test]
fn test_parse_bare_queue() {
    let cmd = parse("jobs");
    assert_eq!(cmd.name, "GET");
    assert_eq!(cmd.queue_name, "jobs");
    assert_eq!(cmd.consumer_group, "");
    assert_eq!(cmd.sub_command, "");
    assert_eq!(cmd.timeout_ms, 0);
}

#[test]
fn test_parse_timeout() {
    let cmd = parse("foo/t=500");
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.timeout_ms, 500);
    assert_eq!(cmd.sub_command, "");
}

#[test]
fn test_parse_close_open() {
    let cmd = parse("foo/close/open");
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.sub_command, "close/open");
    assert_eq!(cmd.sub(), Some(SubCommand::CloseOpen));
}

#[test]
fn test_parse_consumer_group() {
    let cmd = parse("foo::groupA");
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.consumer_group, "groupA");
}

#[test]
fn test_parse_invalid_timeout_is_zero() {
    let cmd = parse("foo/t=abc");
    assert_eq!(cmd.timeout_ms, 0);
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.sub_command, "");
    assert_eq!(cmd.sub(), Some(SubCommand::Open));
}

#[test]
fn test_parse_invalid_timeout_keeps_sub_command() {
    let cmd = parse("foo/open/t=abc");
    assert_eq!(cmd.timeout_ms, 0);
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.sub_command, "open");

    let cmd = parse("foo/t=abc/close/open");
    assert_eq!(cmd.sub_command, "close/open");
}

#[test]
fn test_parse_t_equals_inside_queue_name_is_kept() {
    let cmd = parse("bt=x/peek");
    assert_eq!(cmd.queue_name, "bt=x");
    assert_eq!(cmd.sub_command, "peek");
    assert_eq!(cmd.timeout_ms, 0);
}

#[test]
fn test_parse_overflowing_timeout_is_zero() {
    let cmd = parse("foo/t=99999999999999999999999/open");
    assert_eq!(cmd.timeout_ms, 0);
    assert_eq!(cmd.sub_command, "open");
}

#[test]
fn test_parse_timeout_before_sub_command() {
    let cmd = parse("foo/t=250/open");
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.sub_command, "open");
    assert_eq!(cmd.timeout_ms, 250);
}

#[test]
fn test_parse_timeout_after_sub_command() {
    let cmd = parse("foo/close/open/t=10");
    assert_eq!(cmd.sub_command, "close/open");
    assert_eq!(cmd.timeout_ms, 10);
}

#[test]
fn test_parse_everything() {
    let cmd = parse("foo::workers/t=75/peek");
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.consumer_group, "workers");
    assert_eq!(cmd.sub_command, "peek");
    assert_eq!(cmd.timeout_ms, 75);
}

#[test]
fn test_parse_third_group_piece_discarded() {
    let cmd = parse("foo::a::b/open");
    assert_eq!(cmd.queue_name, "foo");
    assert_eq!(cmd.consumer_group, "a");
}

#[test]
fn test_parse_surrounding_slashes_trimmed() {
    let cmd = parse("foo//abort/");
    assert_eq!(cmd.sub_command, "abort");
}

#[test]
fn test_parse_unknown_sub_command_kept_verbatim() {
    let cmd = parse("foo/frobnicate");
    assert_eq!(cmd.sub_command, "frobnicate");
    assert_eq!(cmd.sub(), None);
}

#[test]
fn test_opens_transaction() {
    assert!(parse("foo/open").opens_transaction());
    assert!(parse("foo/close/open").opens_transaction());
    assert!(!parse("foo").opens_transaction());
    assert!(!parse("foo/peek").opens_transaction());
}

// =============================================================================
// Request Line Tests
// =============================================================================

#[test]
fn test_read_get_request() {
    let req = request("get jobs/open\r\n").unwrap();
    assert_eq!(req, Request::Get(vec!["get".to_string(), "jobs/open".to_string()]));
}

#[test]
fn test_read_get_without_queue() {
    assert!(matches!(request("GET\r\n"), Err(BrokerError::Protocol(_))));
}

#[test]
fn test_read_set_request() {
    let req = request("SET jobs 0 0 5\r\nhello\r\n").unwrap();
    assert_eq!(
        req,
        Request::Set {
            queue: "jobs".to_string(),
            data: b"hello".to_vec()
        }
    );
}

#[test]
fn test_read_set_binary_data() {
    let req = request("set jobs 0 0 4\r\na\r\nb\r\n").unwrap();
    assert_eq!(
        req,
        Request::Set {
            queue: "jobs".to_string(),
            data: b"a\r\nb".to_vec()
        }
    );
}

#[test]
fn test_read_set_bad_chunk() {
    assert!(matches!(
        request("SET jobs 0 0 2\r\nhello\r\n"),
        Err(BrokerError::Protocol(_))
    ));
}

#[test]
fn test_read_set_too_large() {
    assert!(matches!(
        request("SET jobs 0 0 4096\r\n"),
        Err(BrokerError::Protocol(_))
    ));
}

#[test]
fn test_read_simple_verbs() {
    assert_eq!(request("stats\r\n").unwrap(), Request::Stats);
    assert_eq!(request("VERSION\n").unwrap(), Request::Version);
    assert_eq!(request("quit\r\n").unwrap(), Request::Quit);
    assert_eq!(request("flush_all\r\n").unwrap(), Request::Unknown("flush_all".to_string()));
}

#[test]
fn test_read_eof() {
    match request("") {
        Err(BrokerError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected EOF, got {:?}", other),
    }
}

#[test]
fn test_read_line_too_long() {
    let raw = format!("GET {}\r\n", "x".repeat(4096));
    assert!(matches!(request(&raw), Err(BrokerError::Protocol(_))));
}

// =============================================================================
// Reply Tests
// =============================================================================

#[test]
fn test_read_value_reply() {
    let raw = b"VALUE jobs 0 5\r\nhello\r\nEND\r\n".to_vec();
    let reply = read_reply(&mut Cursor::new(raw)).unwrap();
    assert_eq!(reply, Reply::Values(vec![("jobs".to_string(), b"hello".to_vec())]));
}

#[test]
fn test_read_empty_reply() {
    let reply = read_reply(&mut Cursor::new(b"END\r\n".to_vec())).unwrap();
    assert_eq!(reply, Reply::Values(vec![]));
}

#[test]
fn test_read_error_reply() {
    let raw = b"CLIENT_ERROR close current item first\r\n".to_vec();
    let reply = read_reply(&mut Cursor::new(raw)).unwrap();
    assert_eq!(reply, Reply::Error("CLIENT_ERROR close current item first".to_string()));
}
