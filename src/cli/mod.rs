//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::http::{ApiClient, ApiTransport, Method};
use crate::schema::ResponseSchema;
use crate::testing::{preview, EndpointCall, RunReport, ScenarioRunner, ScenarioState, Suite};

/// Options of the `run` command
#[derive(Debug, Default)]
pub struct RunOptions {
    pub base_url: Option<String>,
    pub suites: Vec<Suite>,
    pub config: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub tolerance: Option<f64>,
}

/// Options of the `call` command, as typed on the command line
#[derive(Debug, Default)]
pub struct CallOptions {
    pub method: String,
    pub path: String,
    pub body: Option<String>,
    pub schema: Option<String>,
    pub expect: Vec<u16>,
    pub base_url: Option<String>,
    pub config: Option<PathBuf>,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            base_url,
            suite,
            config,
            report,
            tolerance,
            verbose: _,
        } => {
            let opts = RunOptions {
                base_url,
                suites: suite,
                config,
                report,
                tolerance,
            };
            run(opts).await
        }

        Commands::Call {
            method,
            path,
            body,
            schema,
            expect,
            base_url,
            config,
            verbose: _,
        } => {
            let opts = CallOptions {
                method,
                path,
                body,
                schema,
                expect,
                base_url,
                config,
            };
            call(opts).await
        }

        Commands::Schemas { name, json } => match name {
            Some(name) => {
                let schema: ResponseSchema = name.parse()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&schema.definition())?);
                } else {
                    print_schema(schema);
                }
                Ok(())
            }
            None => {
                if json {
                    let catalog: serde_json::Map<String, serde_json::Value> = ResponseSchema::all()
                        .into_iter()
                        .map(|schema| (schema.name(), schema.definition()))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&catalog)?);
                } else {
                    println!("Schemas:");
                    for schema in ResponseSchema::all() {
                        print_schema(schema);
                    }
                }
                Ok(())
            }
        },
    }
}

/// Resolve configuration, then run the selected suites
///
/// Only configuration problems are errors; failed steps are reported and the
/// run still succeeds.
pub async fn run(opts: RunOptions) -> Result<()> {
    let config = resolve_config(&opts)?;
    let api_key = config.api_key()?;

    let suites = if opts.suites.is_empty() {
        Suite::DEFAULT.to_vec()
    } else {
        opts.suites.clone()
    };
    debug!(base_url = %config.target.base_url, ?suites, "Resolved run configuration");

    let client = ApiClient::from_config(&config.target, Some(api_key.as_str()))?;
    println!("Target: {}", client.base_url().dimmed());

    let report = ScenarioRunner::new(&client, config.expectations.clone())
        .run(&suites)
        .await;

    print_summary(&report);

    if let Some(path) = &opts.report {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Issue one request and print its status, body and schema check
///
/// Like `run`, an unexpected status or schema violation is output, not an error.
pub async fn call(opts: CallOptions) -> Result<()> {
    let call = build_call(&opts)?;
    let config = resolve_config(&RunOptions {
        base_url: opts.base_url.clone(),
        config: opts.config.clone(),
        ..Default::default()
    })?;
    let api_key = config.api_key()?;
    let client = ApiClient::from_config(&config.target, Some(api_key.as_str()))?;

    let response = client
        .request(&call.path, call.method, call.body.as_ref(), &call.expected)
        .await;
    let status = response.status;
    let label = call.label();

    if !call.expected.contains(&status) {
        println!("{} {}: Unexpected status code {status}", "✗".red(), label);
        return Ok(());
    }
    println!("{} {}: Status code {status} as expected", "✓".green(), label);
    if let Some(body) = &response.body {
        println!("{}", serde_json::to_string_pretty(body)?);
    }

    if let Some(schema) = call.schema.filter(|_| response.is_success()) {
        let report = schema.validate(response.body.as_ref())?;
        if report.is_valid() {
            println!("{} matches {}", "✓".green(), schema.name());
        } else {
            let body_preview = preview(response.body.as_ref());
            println!(
                "{} {}: {}: {body_preview}",
                "✗".red(),
                schema.name(),
                report.errors.join("; ")
            );
        }
    }
    Ok(())
}

/// Turn the typed-in method, body and schema into a call
pub fn build_call(opts: &CallOptions) -> Result<EndpointCall> {
    let method: Method = opts.method.parse()?;
    let body: Option<serde_json::Value> = opts
        .body
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    let mut call = EndpointCall::new(method, opts.path.clone(), body);
    if let Some(name) = &opts.schema {
        call = call.schema(name.parse()?);
    }
    if !opts.expect.is_empty() {
        call = call.expect(opts.expect.iter().copied());
    }
    debug!(label = %call.label(), expected = ?call.expected, "Built single call");
    Ok(call)
}

/// Load the config file and apply command-line overrides
pub fn resolve_config(opts: &RunOptions) -> Result<Config> {
    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(base_url) = &opts.base_url {
        config.target.base_url = base_url.clone();
    }
    if let Some(tolerance) = opts.tolerance {
        config.expectations.tolerance = tolerance;
    }
    config.validate()?;
    Ok(config)
}

fn print_schema(schema: ResponseSchema) {
    let definition = schema.definition();
    let kind = definition["type"].as_str().unwrap_or("?");
    let required = definition["required"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    if required.is_empty() {
        println!("  {:<22} {}", schema.name(), kind.dimmed());
    } else {
        println!(
            "  {:<22} {} {}",
            schema.name(),
            kind.dimmed(),
            format!("[{required}]").dimmed()
        );
    }
}

fn print_summary(report: &RunReport) {
    for scenario in &report.scenarios {
        if let ScenarioState::Aborted { reason } = &scenario.state {
            println!(
                "{} {} aborted: {}",
                "✗".red(),
                scenario.suite.as_str().bold(),
                reason
            );
        }
    }

    let tally = report.tally();
    let line = format!(
        "{} passed, {} failed, {} skipped ({} steps)",
        tally.passed,
        tally.failed,
        tally.skipped,
        tally.total()
    );
    if tally.failed == 0 {
        println!("\n{} {}\n", "✓".green().bold(), line.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), line.red().bold());
    }
}
