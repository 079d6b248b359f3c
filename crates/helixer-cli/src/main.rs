//! # Helixer CLI
//!
//! Command-line utilities for encoding events, inspecting topics and
//! checking broker connectivity.

use anyhow::{Context, Result};
use helixer_core::StateChangedEvent;
use helixer_proto::{encode_message, TopicScheme};
use helixer_transport::{Credentials, MqttTransport, TransportConfig};
use std::env;
use std::io::Read;
use std::time::Duration;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "encode" => {
            if args.len() < 3 {
                eprintln!("Usage: helixer encode <event.json|->");
                std::process::exit(1);
            }
            encode_event(&args[2])?;
        }
        "topic" => {
            if args.len() < 4 {
                eprintln!("Usage: helixer topic <base_path> <entity_id>");
                std::process::exit(1);
            }
            let scheme = TopicScheme::new(&args[2]);
            println!("{}", scheme.ddata(&args[3]));
        }
        "check" => {
            if args.len() < 4 {
                eprintln!("Usage: helixer check <host> <port>");
                std::process::exit(1);
            }
            let port: u16 = args[3]
                .parse()
                .with_context(|| format!("Invalid port: {}", args[3]))?;
            check_broker(&args[2], port)?;
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn encode_event(source: &str) -> Result<()> {
    let input = if source == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        input
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {source}"))?
    };

    let event = StateChangedEvent::from_json(&input).context("Failed to parse event")?;
    let entity_id = event.entity_id.clone();

    let Some(change) = event.into_change() else {
        eprintln!("{entity_id}: no new state, nothing to encode");
        return Ok(());
    };

    let Some(message) = change.encode() else {
        eprintln!("{entity_id}: unchanged, nothing to encode");
        return Ok(());
    };

    let payload = encode_message(&message);
    println!(
        "{}",
        serde_json::to_string_pretty(&message).context("Failed to render message")?
    );
    let hex: String = payload.iter().map(|b| format!("{b:02x}")).collect();
    eprintln!("payload ({} bytes): {hex}", payload.len());

    Ok(())
}

fn check_broker(host: &str, port: u16) -> Result<()> {
    let credentials = Credentials::from_env().context("Invalid broker credentials")?;
    if credentials.certificates.is_some() {
        println!("using TLS with the configured CA certificate");
    }

    let config = TransportConfig {
        connect_timeout: Duration::from_secs(10),
        auto_reconnect: false,
        ..TransportConfig::default()
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let transport = MqttTransport::new(config);
        match transport.connect(host, port, credentials).await {
            Ok(()) => {
                transport.disconnect().await;
                println!("ok: connected to {host}:{port}");
                Ok(())
            }
            Err(e) => {
                println!("{}: {e}", e.class());
                std::process::exit(2);
            }
        }
    })
}

fn print_help() {
    println!(
        r#"Helixer CLI

USAGE:
    helixer <COMMAND> [OPTIONS]

COMMANDS:
    encode <event.json|->        Encode a state-changed event into metrics
    topic <base_path> <entity>   Print the DDATA topic for an entity
    check <host> <port>          Test broker connectivity and credentials
    help                         Show this help message

ENVIRONMENT (used by `check`):
    HELIXER_USERNAME, HELIXER_PASSWORD   Broker credentials
    HELIXER_CA_CERT[_FILE]               CA certificate (PEM text or path); enables TLS
    HELIXER_CLIENT_CERT[_FILE]           Client certificate for mutual TLS
    HELIXER_CLIENT_KEY[_FILE]            Client private key for mutual TLS

EXAMPLES:
    helixer topic plant/line-1 sensor.speed
    echo '{{"entity_id":"sensor.speed","new_state":{{"state":"42","last_updated":"2024-01-01T00:00:00Z"}}}}' | helixer encode -
    helixer check broker.local 1883
    HELIXER_CA_CERT_FILE=ca.crt helixer check broker.local 8883
"#
    );
}
