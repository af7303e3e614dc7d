//! LedgerKV CLI Client
//!
//! Command-line interface for interacting with a LedgerKV server.

use std::io::BufReader;
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ledgerkv::protocol::{read_reply, write_request, Reply};

/// LedgerKV CLI
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-cli")]
#[command(about = "CLI for the LedgerKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9888")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(Reply::Ok) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Ok(Reply::Value(value)) => {
            println!("{}", String::from_utf8_lossy(&value));
            ExitCode::SUCCESS
        }
        Ok(Reply::Error(message)) => {
            eprintln!("(error) {}", message);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}: {}", args.server, e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> ledgerkv::Result<Reply> {
    let stream = TcpStream::connect(&args.server)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    match &args.command {
        Commands::Get { key } => write_request(&mut writer, &[&b"GET"[..], key.as_bytes()])?,
        Commands::Set { key, value } => {
            write_request(&mut writer, &[&b"SET"[..], key.as_bytes(), value.as_bytes()])?
        }
    }

    read_reply(&mut reader)
}
