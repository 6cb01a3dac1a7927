//! `readiness` - run structured assessments from the command line
//!
//! Reads documentation from a file or stdin, runs one flow against the
//! configured generative service and prints the result as JSON on stdout.
//! Logs go to stderr.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use readiness_core::flows::{
    grant_pipeline, plan_roadmap, roadmap_pipeline, trl_lexicon, trl_pipeline, EconomicsFlow, EconomicsInput,
    RoadmapInput,
};
use async_trait::async_trait;
use readiness_core::{Assessment, GenerationRequest, GenerativeService, ReadinessConfig, ServiceError};
use readiness_service::GeminiService;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

fn input_arg() -> Arg {
    Arg::new("input")
        .long("input")
        .short('i')
        .value_parser(value_parser!(PathBuf))
        .help("Documentation file (reads stdin when omitted)")
}

fn cli() -> Command {
    Command::new("readiness")
        .version(readiness_core::VERSION)
        .about("Structured readiness assessments over technical documentation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the invocation report alongside the mapping"),
        )
        .subcommand(
            Command::new("trl")
                .about("TRL breakdown of detected components")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("grant")
                .about("Extract grant details")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("roadmap")
                .about("Plan R&D roadmap phases")
                .arg(input_arg())
                .arg(Arg::new("scale").long("scale").help("Production scale, e.g. \"pilot scale\""))
                .arg(Arg::new("cost").long("cost").help("Estimated cost per unit"))
                .arg(Arg::new("revenue").long("revenue").help("Estimated revenue per unit")),
        )
        .subcommand(
            Command::new("economics")
                .about("Simulate unit economics")
                .arg(
                    Arg::new("scale")
                        .long("scale")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Production scale in units"),
                )
                .arg(
                    Arg::new("cost")
                        .long("cost")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Cost per unit"),
                )
                .arg(
                    Arg::new("revenue")
                        .long("revenue")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Revenue per unit"),
                ),
        )
        .subcommand(Command::new("lexicon").about("Print the TRL component lexicon"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit<R: Serialize>(assessment: &Assessment<R>, with_report: bool) -> Result<()> {
    if with_report {
        print_json(assessment)
    } else {
        print_json(&assessment.mapping)
    }
}

/// Stand-in for runs that detect nothing and so never reach the model
#[derive(Debug)]
struct Offline;

#[async_trait]
impl GenerativeService for Offline {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ServiceError> {
        Err(ServiceError::NotConfigured("no generative service for this run".to_string()))
    }
}

/// The HTTP service when the run will call the model, [`Offline`] otherwise
fn service_with<F>(config: &ReadinessConfig, needed: bool, lookup: F) -> Result<Arc<dyn GenerativeService>>
where
    F: Fn(&str) -> Option<String>,
{
    if !needed {
        tracing::debug!("nothing to assess; generative service not configured");
        return Ok(Arc::new(Offline));
    }
    let service = GeminiService::from_config_with(config, lookup).context("configuring generative service")?;
    Ok(Arc::new(service))
}

fn service(config: &ReadinessConfig, needed: bool) -> Result<Arc<dyn GenerativeService>> {
    service_with(config, needed, |name| std::env::var(name).ok())
}

fn load_config(path: Option<&Path>) -> Result<ReadinessConfig> {
    ReadinessConfig::load(path).context("loading configuration")
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let with_report = matches.get_flag("report");
    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);

    match matches.subcommand() {
        Some(("lexicon", _)) => print_json(&trl_lexicon().terms()),
        Some(("trl", args)) => {
            let config = load_config(config_path)?;
            let text = read_input(args.get_one("input")).await?;
            let needed = !trl_lexicon().detect(&text).is_empty();
            let pipeline = trl_pipeline(service(&config, needed)?, &config)?;
            emit(&pipeline.run_with_report(&text).await, with_report)
        }
        Some(("grant", args)) => {
            let config = load_config(config_path)?;
            let text = read_input(args.get_one("input")).await?;
            let needed = !text.trim().is_empty();
            let pipeline = grant_pipeline(service(&config, needed)?, &config)?;
            emit(&pipeline.run_with_report(&text).await, with_report)
        }
        Some(("roadmap", args)) => {
            let config = load_config(config_path)?;
            let mut input = RoadmapInput::new(read_input(args.get_one("input")).await?);
            input.production_scale = args.get_one::<String>("scale").cloned();
            input.cost_per_unit = args.get_one::<String>("cost").cloned();
            input.revenue_per_unit = args.get_one::<String>("revenue").cloned();
            let needed = !input.render().is_empty();
            let pipeline = roadmap_pipeline(service(&config, needed)?, &config)?;
            emit(&plan_roadmap(&pipeline, &input).await, with_report)
        }
        Some(("economics", args)) => {
            let config = load_config(config_path)?;
            let number = |name: &str| args.get_one::<f64>(name).copied().unwrap_or_default();
            let input = EconomicsInput::new(number("scale"), number("cost"), number("revenue"))?;
            let flow = EconomicsFlow::new(service(&config, true)?, &config)?;
            emit(&flow.simulate(input).await, with_report)
        }
        Some((other, _)) => anyhow::bail!("unknown command {other}"),
        None => anyhow::bail!("no command given"),
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    if let Err(error) = run(&matches).await {
        tracing::error!(error = %format!("{error:#}"), "command failed");
        std::process::exit(1);
    }
}
