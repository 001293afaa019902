//! Server Tests
//!
//! End-to-end tests over TCP against a running server.

use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use queuekv::network::{Server, ShutdownHandle};
use queuekv::protocol::{read_reply, write_get, write_set, write_simple, Reply};
use queuekv::{Config, QueueStore, ServerStats};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    store: Arc<QueueStore>,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        let config = Config::builder()
            .listen_addr("127.0.0.1:0")
            .max_connections(8)
            .poll_interval_ms(10)
            .build();
        let store = Arc::new(QueueStore::new(&config));
        let stats = Arc::new(ServerStats::new());

        let mut server = Server::new(config, Arc::clone(&store), stats);
        let addr = server.bind().unwrap();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            store,
            shutdown,
            thread: Some(thread),
        }
    }

    fn client(&self) -> Client {
        Client::connect(self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        Self {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: BufWriter::new(stream),
        }
    }

    fn get(&mut self, spec: &str) -> Reply {
        write_get(&mut self.writer, spec).unwrap();
        read_reply(&mut self.reader).unwrap()
    }

    fn set(&mut self, queue: &str, value: &[u8]) -> Reply {
        write_set(&mut self.writer, queue, value).unwrap();
        read_reply(&mut self.reader).unwrap()
    }

    fn send_raw(&mut self, raw: &[u8]) -> Reply {
        self.writer.write_all(raw).unwrap();
        self.writer.flush().unwrap();
        read_reply(&mut self.reader).unwrap()
    }
}

fn value(queue: &str, data: &[u8]) -> Reply {
    Reply::Values(vec![(queue.to_string(), data.to_vec())])
}

fn empty() -> Reply {
    Reply::Values(vec![])
}

// =============================================================================
// Protocol Tests
// =============================================================================

#[test]
fn test_set_then_get() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.set("jobs", b"hello"), Reply::Stored);
    assert_eq!(client.get("jobs"), value("jobs", b"hello"));
    assert_eq!(client.get("jobs"), empty());
}

#[test]
fn test_open_close_scenario() {
    let server = TestServer::start();
    let mut client = server.client();
    client.set("q", b"A");
    client.set("q", b"B");

    assert_eq!(client.get("q/open"), value("q", b"A"));
    assert_eq!(server.store.queue("q").unwrap().stats().open_reads(), 1);

    assert_eq!(client.get("q/close"), empty());
    assert_eq!(server.store.queue("q").unwrap().stats().open_reads(), 0);

    assert_eq!(client.get("q/open"), value("q", b"B"));
}

#[test]
fn test_second_open_is_client_error() {
    let server = TestServer::start();
    let mut client = server.client();
    client.set("q", b"A");
    client.set("q", b"B");
    client.get("q/open");

    assert_eq!(
        client.get("q/open"),
        Reply::Error("CLIENT_ERROR close current item first".to_string())
    );

    // The connection keeps working and still holds A
    client.get("q/abort");
    assert_eq!(client.get("q/open"), value("q", b"A"));
}

#[test]
fn test_invalid_sub_command_is_error() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.get("q/bogus"), Reply::Error("ERROR".to_string()));
}

#[test]
fn test_unknown_verb_is_error() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.send_raw(b"flush_all\r\n"), Reply::Error("ERROR".to_string()));
    assert_eq!(client.set("q", b"still alive"), Reply::Stored);
}

#[test]
fn test_timeout_on_empty_queue_returns_end() {
    let server = TestServer::start();
    let mut client = server.client();

    let start = Instant::now();
    assert_eq!(client.get("q/t=100"), empty());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_blocked_get_receives_item_from_other_client() {
    let server = TestServer::start();
    let addr = server.addr;

    let waiter = thread::spawn(move || {
        let mut client = Client::connect(addr);
        let start = Instant::now();
        let reply = client.get("q/open/t=5000");
        (reply, start.elapsed())
    });

    thread::sleep(Duration::from_millis(100));
    let mut producer = server.client();
    assert_eq!(producer.set("q", b"ping"), Reply::Stored);

    let (reply, elapsed) = waiter.join().unwrap();
    assert_eq!(reply, value("q", b"ping"));
    assert!(elapsed < Duration::from_secs(3));
}

#[test]
fn test_disconnect_abandons_open_read() {
    let server = TestServer::start();
    let mut first = server.client();
    first.set("q", b"A");
    first.set("q", b"B");
    assert_eq!(first.get("q/open"), value("q", b"A"));
    drop(first);

    // A is gone for good, not returned to the queue
    let mut second = server.client();
    assert_eq!(second.get("q/open"), value("q", b"B"));
    assert_eq!(second.get("q/peek"), empty());
}

#[test]
fn test_stats_report_gets_and_open_reads() {
    let server = TestServer::start();
    let mut client = server.client();
    client.set("q", b"A");
    client.get("q/open");
    client.get("q/peek");

    write_simple(&mut client.writer, "STATS").unwrap();
    let stats = match read_reply(&mut client.reader).unwrap() {
        Reply::Stats(stats) => stats,
        other => panic!("expected stats, got {:?}", other),
    };

    let stat = |name: &str| {
        stats
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    assert_eq!(stat("cmd_get"), "2");
    assert_eq!(stat("cmd_set"), "1");
    assert_eq!(stat("queue_q_open_reads"), "1");
    assert_eq!(stat("queue_q_items"), "0");
}

#[test]
fn test_version() {
    let server = TestServer::start();
    let mut client = server.client();

    assert_eq!(client.send_raw(b"VERSION\r\n"), Reply::Version(queuekv::VERSION.to_string()));
}
