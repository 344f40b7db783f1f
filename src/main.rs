//! rc2 client core command line.
//!
//! # Architecture Overview
//!
//! ```text
//!     engine socket ──▶ net::docker ──▶ net::dispatcher ──▶ http::framer ──▶ callback
//!                                          (reader task)     (bytes → messages)
//!
//!     notebook file ──▶ document::front_matter ──▶ document::parser ──▶ document::store
//!                                                                  ──▶ Document (content, highlight)
//! ```
//!
//! # Commands
//! - `parse <FILE>`: print the chunk outline of a notebook as JSON
//! - `stream <PATH>`: send a request to the engine and print the response stream

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use rc2_client_core::config::loader::load_config;
use rc2_client_core::config::ClientConfig;
use rc2_client_core::document::{Document, RangeType};
use rc2_client_core::http::StreamMessage;
use rc2_client_core::lifecycle::signals::cancel_on_interrupt;
use rc2_client_core::net::docker::{connect_unix, send_request};
use rc2_client_core::net::{DispatchOptions, DockerRequest, ResponseDispatcher, StreamState};
use rc2_client_core::observability::logging;

#[derive(Parser)]
#[command(name = "rc2-core")]
#[command(about = "Engine response streaming and notebook parsing", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunk outline of a notebook document
    Parse {
        file: PathBuf,
    },
    /// Stream an engine API response
    Stream {
        /// Request path, e.g. /events or /containers/ID/logs?stdout=1&follow=1
        path: String,

        /// Engine socket (overrides configuration)
        #[arg(short, long)]
        socket: Option<String>,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Response body is multiplexed stdout/stderr
        #[arg(long)]
        hijack: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    logging::init(&config.observability);

    match cli.command {
        Commands::Parse { file } => {
            let source = std::fs::read_to_string(&file)?;
            let document = Document::parse(&source)?;
            tracing::info!(file = %file.display(), chunks = document.len(), "Document parsed");
            println!("{}", serde_json::to_string_pretty(&outline(&document)?)?);
        }
        Commands::Stream {
            path,
            socket,
            method,
            hijack,
        } => {
            let socket = socket.unwrap_or_else(|| config.stream.socket_path.clone());
            let mut request = DockerRequest::new(method, path);
            if hijack {
                request = request.hijack();
            }

            let mut stream = connect_unix(&socket).await?;
            send_request(&mut stream, &request).await?;

            let options = DispatchOptions::from_config(&config.stream).hijacked(request.is_hijacked());
            let handle = ResponseDispatcher::new(stream, options).start(print_message);
            let interrupt = tokio::spawn(cancel_on_interrupt(handle.cancel_token()));

            let state = handle.join().await;
            interrupt.abort();
            tracing::info!(?state, "Stream ended");
            if state == StreamState::Cancelled {
                std::process::exit(130);
            }
        }
    }

    Ok(())
}

fn print_message(message: StreamMessage) {
    let mut stdout = std::io::stdout().lock();
    let result = match &message {
        StreamMessage::Headers(head) => {
            eprintln!("HTTP {} {}", head.status, head.reason);
            Ok(())
        }
        StreamMessage::Json(values) => values
            .iter()
            .try_for_each(|value| writeln!(stdout, "{}", value)),
        StreamMessage::Data(bytes) => stdout.write_all(bytes),
        StreamMessage::Complete => Ok(()),
        StreamMessage::Error(err) => {
            eprintln!("error: {}", err);
            Ok(())
        }
    };
    if let Err(e) = result.and_then(|_| stdout.flush()) {
        tracing::warn!(error = %e, "Failed to write to stdout");
    }
}

fn outline(document: &Document) -> Result<Value, Box<dyn std::error::Error>> {
    let mut chunks = Vec::new();
    for chunk in document.chunks() {
        let mut children = Vec::new();
        for child in document.children(chunk.id)? {
            let outer = document.absolute_range(child.id, RangeType::Outer)?;
            let content = document.content(child.id, RangeType::Inner)?;
            children.push(json!({
                "kind": child.kind,
                "sequence": child.sequence_number,
                "outer": outer,
                "content": content,
            }));
        }
        chunks.push(json!({
            "kind": chunk.kind,
            "sequence": chunk.sequence_number,
            "outer": chunk.outer,
            "inner": chunk.inner,
            "engine": chunk.engine,
            "name": chunk.name,
            "arguments": chunk.arguments,
            "children": children,
        }));
    }

    Ok(json!({
        "front_matter": document.front_matter().map(|f| f.content.clone()),
        "chunks": chunks,
    }))
}
