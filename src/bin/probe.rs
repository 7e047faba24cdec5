//! Relay Probe Binary
//!
//! One-shot protocol checks against a live relay server. Exits 0 on PASS.

use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use relaylink::network::{Connection, FrameSender, SessionEnd, StopSignal};
use relaylink::protocol::{Message, NotificationPayload};
use relaylink::session::MessageHandler;
use relaylink::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// Relay protocol probe
#[derive(Parser, Debug)]
#[command(name = "relay-probe")]
#[command(about = "Probe a relay server's conn/ack, ping and notification protocol")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    server: String,

    /// Device name announced in conn and pong
    #[arg(short, long, default_value = "Test-Client")]
    device_name: String,

    /// Opaque auth token sent in conn
    #[arg(short, long, default_value = "test-token-123")]
    auth_token: String,

    /// How long to wait for the ack (milliseconds)
    #[arg(long, default_value = "10000")]
    handshake_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handshake, then answer pings for a while
    Conn {
        /// Seconds to keep listening after the ack
        #[arg(long, default_value = "120")]
        listen_secs: u64,
    },

    /// Wait for a notification with actions and trigger one
    Action {
        /// Seconds to wait for a notification
        #[arg(long, default_value = "10")]
        wait_secs: u64,

        /// Action key to trigger (defaults to the first offered)
        #[arg(short, long)]
        key: Option<String>,
    },
}

/// Logs everything it sees
struct Observer;

impl MessageHandler for Observer {
    fn on_notification(&mut self, _message: &Message, notification: &NotificationPayload) {
        println!("Received notification {} from {}", notification.id, notification.app);
    }

    fn on_unknown(&mut self, message: &Message) {
        println!("Received {} message", message.kind());
    }
}

/// Triggers an action on the first matching notification, then stops
struct ActionTrigger {
    sender: FrameSender<std::net::TcpStream>,
    stop: StopSignal,
    key: Option<String>,
    triggered: bool,
}

impl MessageHandler for ActionTrigger {
    fn on_notification(&mut self, _message: &Message, notification: &NotificationPayload) {
        if self.triggered {
            return;
        }

        let entry = match &self.key {
            Some(key) => notification.action(key),
            None => notification.actions.first(),
        };
        let Some(entry) = entry else {
            println!("Notification {} has no matching action", notification.id);
            return;
        };

        match self.sender.send_action(notification.trigger(entry)) {
            Ok(()) => {
                println!("Triggered {} ({}) on {}", entry.key, entry.kind, notification.id);
                self.triggered = true;
                self.stop.stop();
            }
            Err(e) => tracing::error!("Failed to send action: {}", e),
        }
    }
}

fn stop_after(stop: StopSignal, secs: u64) {
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(secs));
        stop.stop();
    });
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let config = Config::builder()
        .server_addr(&args.server)
        .device_name(&args.device_name)
        .auth_token(&args.auth_token)
        .handshake_timeout_ms(args.handshake_timeout_ms)
        .read_timeout_ms(1000)
        .build();

    let mut connection = match Connection::connect(&config) {
        Ok(c) => c,
        Err(e) => {
            println!("FAIL: cannot connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let passed = match args.command {
        Commands::Conn { listen_secs } => {
            stop_after(connection.stop_signal(), listen_secs);
            match connection.run(&mut Observer) {
                Ok(summary) => {
                    println!(
                        "Accepted (ref {}); {} pings answered, ended by {}",
                        summary.ref_id.as_deref().unwrap_or("-"),
                        summary.pings_answered,
                        match summary.end {
                            SessionEnd::Stopped => "timer",
                            SessionEnd::PeerClosed => "server",
                        }
                    );
                    true
                }
                Err(e) => {
                    println!("FAIL: {}", e);
                    false
                }
            }
        }
        Commands::Action { wait_secs, key } => {
            let stop = connection.stop_signal();
            stop_after(stop.clone(), wait_secs);
            let mut trigger = ActionTrigger {
                sender: connection.sender(),
                stop,
                key,
                triggered: false,
            };
            match connection.run(&mut trigger) {
                Ok(_) if trigger.triggered => true,
                Ok(_) => {
                    println!("FAIL: no actionable notification received");
                    false
                }
                Err(e) => {
                    println!("FAIL: {}", e);
                    false
                }
            }
        }
    };

    if passed {
        println!("PASS");
    } else {
        std::process::exit(1);
    }
}
