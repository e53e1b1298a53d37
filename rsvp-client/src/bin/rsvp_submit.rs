//! rsvp-submit - send one RSVP from the command line
//!
//! Reads a guest list (JSON array of guest objects), queues the given images,
//! assigns them to guests in order, and submits everything to the server.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use rsvp_client::{IncomingFile, RsvpClient, Session};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rsvp-submit")]
#[command(about = "Submit an RSVP with passport images")]
#[command(version)]
struct Args {
    /// Server root URL
    #[arg(short, long, env = "RSVP_SERVER_URL", default_value = "http://localhost:3001")]
    server: String,

    /// Main contact email
    #[arg(short, long)]
    email: String,

    /// JSON file holding the guest array
    #[arg(short, long)]
    guests: PathBuf,

    /// Passport images; the n-th image is assigned to the n-th guest
    images: Vec<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let raw = tokio::fs::read_to_string(&args.guests)
        .await
        .with_context(|| format!("Failed to read {}", args.guests.display()))?;
    let guests = rsvp_common::api::decode_guests(&raw)
        .with_context(|| format!("Invalid guest list in {}", args.guests.display()))?;
    if args.images.len() > guests.len() {
        bail!("{} images for {} guests", args.images.len(), guests.len());
    }

    let session = Session::default();
    session.set_main_email(&args.email).await;
    for guest in guests {
        session.add_guest(guest).await;
    }

    let mut files = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(IncomingFile::new(file_name, None, bytes));
    }

    let ids = session.enqueue(files).await?.finished().await;
    for (guest_index, id) in ids.into_iter().enumerate() {
        let name = session.assign(id, guest_index).await?;
        info!("Guest {} <- {}", guest_index + 1, name);
    }

    let client = RsvpClient::new(&args.server)?;
    match session.submit(&client).await {
        Ok(response) => {
            println!("Submitted {} guest(s), {} image(s)", response.guests, response.images);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            if e.is_transport() {
                eprintln!("The server at {} could not be reached; run again to retry.", client.endpoint());
            }
            Err(e.into())
        }
    }
}
