//! Chat relay server and command-line client.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use chat_relay::client::RelayClient;
use chat_relay::config::{AppConfig, Cli, Command};
use chat_relay::session::Conversation;
use chat_relay::{server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env-backed flags
    let _ = dotenv();

    telemetry::init();

    let cli = Cli::parse();

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = AppConfig::from_cli(&cli)?;
            server::start_server(Arc::new(config)).await
        }
        Command::Ask { message, relay_url } => ask(&relay_url, &message).await,
    }
}

/// Stream one reply from a running relay to stdout.
async fn ask(relay_url: &str, message: &str) -> anyhow::Result<()> {
    let client = RelayClient::new(relay_url);
    let conversation = Conversation::default();
    let mut out = FragmentWriter::new(std::io::stdout());

    let reply = client
        .send(&conversation, message, |fragment| out.write(fragment))
        .await?;

    out.finish()?;
    if reply.is_streaming {
        tracing::warn!(name: "client.stream.unterminated", "Stream ended without [DONE]");
    }
    Ok(())
}

/// Writes fragments as they arrive. The first write error stops output and
/// is returned from [`FragmentWriter::finish`].
struct FragmentWriter<W> {
    out: W,
    error: Option<std::io::Error>,
}

impl<W: Write> FragmentWriter<W> {
    fn new(out: W) -> Self {
        Self { out, error: None }
    }

    fn write(&mut self, fragment: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = write!(self.out, "{fragment}").and_then(|()| self.out.flush()) {
            self.error = Some(e);
        }
    }

    fn finish(mut self) -> std::io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        writeln!(self.out)?;
        Ok(self.out)
    }
}
