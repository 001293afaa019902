//! QueueKV CLI Client
//!
//! Command-line interface for interacting with QueueKV.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use queuekv::protocol::{read_reply, write_get, write_set, write_simple, Reply};

/// QueueKV CLI
#[derive(Parser, Debug)]
#[command(name = "queuekv-cli")]
#[command(about = "CLI for the QueueKV queue broker")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:22133")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dequeue from a queue, e.g. `jobs/t=500` or `jobs::workers/peek`
    Get {
        /// Queue specifier
        spec: String,
    },

    /// Enqueue a value
    Set {
        /// The queue to append to
        queue: String,

        /// The value to enqueue
        value: String,
    },

    /// Show server statistics
    Stats,

    /// Show the server version
    Version,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(Reply::Error(line)) => {
            eprintln!("{}", line);
            ExitCode::FAILURE
        }
        Ok(reply) => {
            print_reply(reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> queuekv::Result<Reply> {
    let stream = TcpStream::connect(&args.server)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    match &args.command {
        Commands::Get { spec } => write_get(&mut writer, spec)?,
        Commands::Set { queue, value } => write_set(&mut writer, queue, value.as_bytes())?,
        Commands::Stats => write_simple(&mut writer, "STATS")?,
        Commands::Version => write_simple(&mut writer, "VERSION")?,
    }

    read_reply(&mut reader)
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Values(values) if values.is_empty() => println!("(empty)"),
        Reply::Values(values) => {
            for (_, data) in values {
                println!("{}", String::from_utf8_lossy(&data));
            }
        }
        Reply::Stored => println!("STORED"),
        Reply::Stats(stats) => {
            for (name, value) in stats {
                println!("{:<28} {}", name, value);
            }
        }
        Reply::Version(version) => println!("{}", version),
        Reply::Error(line) => eprintln!("{}", line),
    }
}
