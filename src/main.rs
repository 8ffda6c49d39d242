//! Bypass simulator (v1)
//!
//! A deterministic target for exercising access-control bypass and WAF
//! evasion tooling, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 BYPASS SIMULATOR                  │
//!                      │                                                   │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌────────────┐ │
//!   ───────────────────┼─▶│  http   │──▶│    engine    │──▶│  security  │ │
//!                      │  │ server  │   │  evaluator   │   │ canonical, │ │
//!                      │  └─────────┘   └──────┬───────┘   │ blocklist, │ │
//!                      │                       │           │ headers    │ │
//!                      │                       ▼           └────────────┘ │
//!   Client Response    │  ┌─────────┐   ┌──────────────┐                  │
//!   ◀──────────────────┼──│response │◀──│   Decision   │                  │
//!                      │  │composer │   └──────────────┘                  │
//!                      │  └─────────┘                                     │
//!                      │                                                   │
//!                      │  config · observability · lifecycle               │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use clap::{Parser, Subcommand};

use bypass_sim::config::{load_config, validation::validate_config, ConfigError, SimulatorConfig};
use bypass_sim::engine::{DecisionEngine, RuleSet, SimRequest};
use bypass_sim::http::HttpServer;
use bypass_sim::lifecycle::{signals, Shutdown};
use bypass_sim::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "bypass-sim")]
#[command(version, about = "Access-control bypass and WAF simulator", long_about = None)]
struct Cli {
    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulator (default)
    Serve {
        /// Override listener.bind_address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Validate the configuration and compile the rule set
    Check,
    /// Evaluate a single request offline and print the decision as JSON
    Decide {
        /// Request target, path and optional query
        #[arg(short, long)]
        path: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Header as 'Name: value'; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(short, long)]
        body: Option<String>,
    },
    /// List the effective blocklist
    Rules,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = read_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.listener.bind_address = bind;
                validate_config(&config).map_err(ConfigError::Validation)?;
            }
            serve(config).await?;
        }
        Commands::Check => {
            let rules = RuleSet::from_config(&config)?;
            println!("configuration ok");
            println!("  listener:  {}", config.listener.bind_address);
            println!("  resources: {}", rules.resources().len());
            for resource in rules.resources() {
                println!("    {} (unlock: {:?})", resource.path(), resource.unlock());
            }
            println!(
                "  blocklist: {} rules, {} enabled, waf {}",
                rules.blocklist().rules().len(),
                rules.blocklist().enabled_count(),
                if rules.waf_enabled() { "on" } else { "off" }
            );
        }
        Commands::Decide {
            path,
            method,
            headers,
            body,
        } => {
            let engine = DecisionEngine::new(Arc::new(RuleSet::from_config(&config)?));
            let request = build_request(&path, &method, &headers, body)?;
            let decision = engine.decide_fail_closed(&request);
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Rules => {
            let rules = RuleSet::from_config(&config)?;
            for rule in rules.blocklist().rules() {
                let state = if rule.enabled() { "enabled" } else { "disabled" };
                println!("{:<20} {:<9} {}", rule.label(), state, rule.pattern());
            }
        }
    }

    Ok(())
}

fn read_config(path: Option<&std::path::Path>) -> Result<SimulatorConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = SimulatorConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

async fn serve(config: SimulatorConfig) -> Result<(), Box<dyn Error>> {
    logging::init(&config.observability)?;
    tracing::info!("bypass-sim v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config)?;
    let loaded = server.config();
    tracing::info!(
        bind_address = %loaded.listener.bind_address,
        resources = loaded.resources.len(),
        waf_enabled = loaded.waf.enabled,
        custom_rules = loaded.waf.rules.len(),
        "Configuration loaded"
    );

    let listener = server.bind().await?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_request(
    target: &str,
    method: &str,
    headers: &[String],
    body: Option<String>,
) -> Result<SimRequest, Box<dyn Error>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
    let mut request = SimRequest::new(method, target);

    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header '{header}' is not in 'Name: value' form"))?;
        request.headers.insert(name.trim(), value.trim());
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }

    Ok(request)
}
