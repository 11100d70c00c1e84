use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use cfnmkr_api::Function;
use cfnmkr_core::{Event, IdCodec, IdKind, Invocation, Response, Status, Tag};
use cfnmkr_mackerel::{apikey, Client, MackerelApi, MockMackerel, StaticKey};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cfnmkrctl", version, about = "Mackerel custom resources for CloudFormation")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one custom resource event and print the response document
    Handle {
        /// Event JSON file, or "-" for stdin
        event: String,
        /// API key (default: CFNMKR_API_KEY, then MACKEREL_APIKEY)
        #[arg(long = "api-key", env = "CFNMKR_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// API base URL
        #[arg(long = "base-url", env = "CFNMKR_BASE_URL")]
        base_url: Option<String>,
        /// Upper bound of one API call
        #[arg(long = "timeout-secs", env = "CFNMKR_HTTP_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,
        /// Deadline of the whole invocation
        #[arg(long = "deadline-ms")]
        deadline_ms: Option<u64>,
        /// Answer from an in-memory Mackerel for this organization; nothing is sent
        #[arg(long = "dry-run", value_name = "ORG")]
        dry_run: Option<String>,
    },
    /// Build or parse physical ids
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },
    /// Encode or decode AWS integration tag lists
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },
}

#[derive(Subcommand, Debug)]
enum IdCommands {
    /// Physical id of an entity, e.g. `id build my-org role web app`
    Build {
        org: String,
        #[arg(value_parser = parse_kind)]
        kind: IdKind,
        #[arg(required = true)]
        tail: Vec<String>,
    },
    /// Check an id against org and kind and print its tail
    Parse {
        org: String,
        #[arg(value_parser = parse_kind)]
        kind: IdKind,
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TagCommands {
    /// Encode `name=value` pairs
    Encode {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Decode an encoded tag list
    Decode { list: String },
}

fn parse_kind(s: &str) -> Result<IdKind, String> {
    IdKind::parse(s).ok_or_else(|| {
        let known: Vec<&str> = IdKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown kind {:?}; one of {}", s, known.join(", "))
    })
}

fn init_tracing() {
    let env = std::env::var("CFNMKR_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("CFNMKR_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid CFNMKR_METRICS_ADDR; expected host:port");
        }
    }
}

fn read_event(path: &str) -> Result<Event> {
    let raw = if path == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("read event from stdin")?;
        s
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read event {}", path))?
    };
    let mut event: Event = serde_json::from_str(&raw).context("decode event")?;
    if event.request_id.is_empty() {
        event.request_id = uuid::Uuid::new_v4().to_string();
    }
    Ok(event)
}

fn build_client(api_key: Option<String>, base_url: Option<String>, timeout_secs: Option<u64>) -> Result<Client> {
    let mut client = match api_key {
        Some(k) => Client::new(StaticKey(k)),
        None => Client::new(apikey::from_env()),
    }
    .context("build mackerel client")?;
    if let Some(base) = base_url {
        client = client.with_base_url(&base).with_context(|| format!("invalid base url {}", base))?;
    }
    if let Some(secs) = timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }
    Ok(client)
}

fn print_response(output: Output, resp: &Response) -> Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(resp)?),
        Output::Human => {
            let status = match resp.status {
                Status::Success => "SUCCESS",
                Status::Failed => "FAILED",
            };
            println!("{} {}", status, resp.physical_resource_id);
            if !resp.reason.is_empty() {
                println!("  reason: {}", resp.reason);
            }
            for (k, v) in &resp.data {
                println!("  {} = {}", k, v);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ParsedId<'a> {
    org: &'a str,
    kind: &'a str,
    tail: Vec<&'a str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Handle { event, api_key, base_url, timeout_secs, deadline_ms, dry_run } => {
            let event = read_event(&event)?;
            let mock = dry_run.map(|org| Arc::new(MockMackerel::new(&org)));
            let client: Arc<dyn MackerelApi> = match &mock {
                Some(m) => m.clone() as Arc<dyn MackerelApi>,
                None => Arc::new(build_client(api_key, base_url, timeout_secs)?),
            };
            let inv = match deadline_ms {
                Some(ms) => Invocation::with_timeout(Duration::from_millis(ms)),
                None => Invocation::new(),
            };
            let on_signal = inv.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("interrupted; cancelling invocation");
                    on_signal.cancel();
                }
            });

            info!(resource_type = %event.resource_type, request = %event.request_type, request_id = %event.request_id, dry_run = mock.is_some(), "handle invoked");
            let t0 = Instant::now();
            let function = Function::with_client(client);
            let result = function.handle(&inv, &event).await;
            info!(ok = result.is_ok(), took_ms = %t0.elapsed().as_millis(), "handle finished");
            print_response(cli.output, &result.response(&event))?;
            if let Some(m) = mock {
                for r in m.requests() {
                    eprintln!("dry-run: {} {:?} {}", r.op, r.args, r.body.map(|b| b.to_string()).unwrap_or_default());
                }
            }
            if !result.is_ok() {
                std::process::exit(1);
            }
        }
        Commands::Id { command: IdCommands::Build { org, kind, tail } } => {
            let tail: Vec<&str> = tail.iter().map(|s| s.as_str()).collect();
            let id = IdCodec::new(org).build(kind, &tail);
            match cli.output {
                Output::Human => println!("{}", id),
                Output::Json => println!("{}", serde_json::to_string_pretty(&id)?),
            }
        }
        Commands::Id { command: IdCommands::Parse { org, kind, id } } => {
            let codec = IdCodec::new(org.as_str());
            let tail = codec.parse(&id, kind)?;
            match cli.output {
                Output::Human => println!("{}", tail.join(" ")),
                Output::Json => println!("{}", serde_json::to_string_pretty(&ParsedId { org: &org, kind: kind.as_str(), tail })?),
            }
        }
        Commands::Tags { command: TagCommands::Encode { pairs } } => {
            let tags = pairs
                .iter()
                .map(|p| p.split_once('=').map(|(n, v)| Tag::new(n, v)).ok_or_else(|| anyhow!("expected name=value, got {:?}", p)))
                .collect::<Result<Vec<_>>>()?;
            let list = cfnmkr_core::tags::encode(&tags);
            match cli.output {
                Output::Human => println!("{}", list),
                Output::Json => println!("{}", serde_json::to_string_pretty(&list)?),
            }
        }
        Commands::Tags { command: TagCommands::Decode { list } } => {
            let tags = cfnmkr_core::tags::decode(&list)?;
            match cli.output {
                Output::Human => {
                    for t in &tags {
                        println!("{}={}", t.name, t.value);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
            }
        }
    }
    Ok(())
}
