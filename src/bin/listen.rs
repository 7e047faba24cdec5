//! Relay Listener Binary
//!
//! Connects to a relay server, answers pings and prints every notification
//! it receives. Reconnects with backoff until stopped or out of attempts.

use std::thread;
use std::time::Duration;

use clap::Parser;
use relaylink::config::RetryPolicy;
use relaylink::network::{Supervisor, SupervisorOutcome};
use relaylink::protocol::{Message, NotificationPayload};
use relaylink::session::MessageHandler;
use relaylink::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// Relay notification listener
#[derive(Parser, Debug)]
#[command(name = "relay-listen")]
#[command(about = "Listen for notifications relayed from a device")]
#[command(version)]
struct Args {
    /// Relay server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    server: String,

    /// Device name announced in conn and pong
    #[arg(short, long, default_value = "Notification-Listener")]
    device_name: String,

    /// Opaque auth token sent in conn
    #[arg(short, long, default_value = "")]
    auth_token: String,

    /// Capabilities to declare (repeatable)
    #[arg(long = "supports", default_values_t = vec!["notification".to_string()])]
    supports: Vec<String>,

    /// Read poll interval in milliseconds
    #[arg(long, default_value = "5000")]
    read_timeout_ms: u64,

    /// Give up after this many consecutive failed attempts
    #[arg(short = 'n', long)]
    max_attempts: Option<u32>,

    /// Maximum reconnect backoff in seconds
    #[arg(long, default_value = "60")]
    max_backoff_secs: u64,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    json: bool,
}

/// Prints notifications to stdout
struct Printer {
    json: bool,
}

impl MessageHandler for Printer {
    fn on_notification(&mut self, message: &Message, notification: &NotificationPayload) {
        if self.json {
            match message.to_bytes() {
                Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
                Err(e) => tracing::warn!("Cannot render notification: {}", e),
            }
            return;
        }

        println!("NOTIFICATION:");
        println!("   App: {}", or_unknown(&notification.app));
        println!("   Title: {}", notification.title);
        println!("   Body: {}", notification.body);
        println!("   Package: {}", notification.package);
        println!("   Can Reply: {}", notification.can_reply);
        if !notification.actions.is_empty() {
            println!("   Actions: {} available", notification.actions.len());
        }
        println!();
    }

    fn on_unknown(&mut self, message: &Message) {
        println!("Received {} message", message.kind());
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() {
        "Unknown"
    } else {
        s
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relaylink=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("relay-listen v{}", relaylink::VERSION);
    tracing::info!("Server address: {}", args.server);

    let retry = RetryPolicy {
        max_attempts: args.max_attempts,
        max_backoff: Duration::from_secs(args.max_backoff_secs.max(1)),
        ..RetryPolicy::default()
    };

    // Build config from args
    let config = Config::builder()
        .server_addr(&args.server)
        .device_name(&args.device_name)
        .auth_token(&args.auth_token)
        .supports(args.supports.clone())
        .read_timeout_ms(args.read_timeout_ms)
        .retry(retry)
        .build();

    let supervisor = match Supervisor::new(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let Some(secs) = args.duration_secs {
        let stop = supervisor.stop_signal();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            tracing::info!("Duration elapsed, stopping");
            stop.stop();
        });
    }

    let mut printer = Printer { json: args.json };
    match supervisor.run(&mut printer) {
        Ok(SupervisorOutcome::Stopped) => tracing::info!("Listener stopped"),
        Ok(SupervisorOutcome::AttemptsExhausted { attempts, last_error }) => {
            tracing::error!(
                "Gave up after {} attempts: {}",
                attempts,
                last_error.as_deref().unwrap_or("unknown error")
            );
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
