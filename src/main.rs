mod cli;
mod config;
mod output;

use clap::Parser;
use cli::{Cli, Commands, InitArgs, RunArgs};
use config::{load_config, merge_config};
use output::{LatencySummary, print_progress, print_requests, print_summary, write_json};
use std::time::{Duration, Instant};
use stressburst::Engine;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32, String> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_burst(&args).await,
        Commands::Init(args) => run_init(&args),
    }
}

fn run_init(args: &InitArgs) -> Result<i32, String> {
    use std::fs;

    if args.output.exists() && !args.force {
        return Err(format!(
            "File '{}' already exists. Use --force to overwrite.",
            args.output.display()
        ));
    }

    let url = args.url.as_deref().unwrap_or("http://localhost:8080/health");

    let config = format!(
        r#"# stressburst configuration

[target]
url = "{url}"
method = "GET"          # GET or POST
timeout = "30s"
connect_timeout = "10s"
# insecure = false

# JSON body sent with POST (Content-Type: application/json)
# body = '{{"key": "value"}}'

[load]
concurrency = 5         # simultaneous requests, 1-10000
# flush_interval = "200ms"

# Values may reference environment variables, optionally with a fallback:
# url = "http://${{API_HOST:-localhost}}:8080/health"
"#,
        url = url
    );

    fs::write(&args.output, config).map_err(|e| format!("Failed to write config file: {}", e))?;

    eprintln!("Created config file: {}", args.output.display());
    eprintln!("\nRun with: stressburst run -f {}", args.output.display());

    Ok(0)
}

async fn run_burst(args: &RunArgs) -> Result<i32, String> {
    let toml_config = if let Some(ref path) = args.config {
        Some(load_config(path)?)
    } else {
        None
    };

    let config = merge_config(args, toml_config)?;

    let engine = Engine::new(config.engine.clone());
    engine
        .start(&config.url, config.concurrency, config.method, &config.body)
        .map_err(|e| e.to_string())?;

    if !args.quiet {
        eprintln!(
            "Bursting {} x {} {} (Ctrl+C to stop)",
            config.concurrency, config.method, config.url
        );
    }

    let started = Instant::now();
    let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
    let stop_after = async {
        match args.stop_after {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop_after);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let finished = engine.wait();
    tokio::pin!(finished);

    let mut stop_requested = false;
    let final_state = loop {
        tokio::select! {
            state = &mut finished => break state,

            _ = &mut ctrl_c, if !stop_requested => {
                stop_requested = true;
                engine.stop().await;
            }

            _ = &mut stop_after, if !stop_requested => {
                stop_requested = true;
                tracing::info!("Stop deadline reached");
                engine.stop().await;
            }

            _ = progress.tick(), if !args.quiet => {
                print_progress(&engine.metrics(), started.elapsed());
            }
        }
    };

    if !args.quiet {
        print_progress(&engine.metrics(), started.elapsed());
        eprintln!();
    }

    let metrics = engine.metrics();
    let logs = engine.logs();

    if !args.quiet {
        print_requests(&logs, args.show_body);
    }
    print_summary(&metrics, final_state, LatencySummary::from_logs(&logs).as_ref());

    if let Some(path) = &args.output {
        write_json(&metrics, final_state, &logs, &config, path)
            .map_err(|e| format!("Failed to write JSON: {}", e))?;
        if !args.quiet {
            eprintln!("Results written to {}", path.display());
        }
    }

    Ok(0)
}
