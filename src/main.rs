use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Duration;

use afore_monitor::api::{ServerConfig, run_http_server};
use afore_monitor::core::{FixedDelay, Inputs, UniformDraws};
use afore_monitor::terminal::run_in_terminal;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "afore-monitor",
    version,
    about = "Month-by-month simulation of an AFORE individual account balance"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the browser dashboard
    Serve(ServeArgs),
    /// Animate a single run in the terminal
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(
        long,
        default_value_t = 1000,
        help = "Delay between animated months in milliseconds"
    )]
    pace_ms: u64,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, default_value_t = 12, help = "Simulation length in months (1-36)")]
    months: u32,
    #[arg(long, default_value_t = 0.0, help = "Initial account balance in MXN")]
    initial_balance: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Return reference line in percent (0-5)"
    )]
    return_threshold: f64,
    #[arg(
        long,
        default_value_t = 3000.0,
        help = "Contribution reference line in MXN (0-10000)"
    )]
    contribution_threshold: f64,
    #[arg(long, help = "Seed for reproducible draws; random when omitted")]
    seed: Option<u64>,
    #[arg(
        long,
        default_value_t = 1000,
        help = "Delay between animated months in milliseconds"
    )]
    pace_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Serve(args) => {
            let config = ServerConfig {
                host: args.host,
                port: args.port,
                pace: Duration::from_millis(args.pace_ms),
            };
            if let Err(e) = run_http_server(config).await {
                eprintln!("Server error: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Command::Run(args) => run_command(args).await,
    }
}

async fn run_command(args: RunArgs) -> ExitCode {
    let inputs = Inputs {
        horizon_months: args.months,
        initial_balance: args.initial_balance,
        return_threshold_pct: args.return_threshold,
        contribution_threshold: args.contribution_threshold,
        seed: args.seed,
    };
    let inputs = match inputs.validate() {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Invalid input: {e}");
            return ExitCode::from(2);
        }
    };

    let draws = UniformDraws::for_inputs(&inputs);
    let pacer = FixedDelay(Duration::from_millis(args.pace_ms));
    match run_in_terminal(inputs, Local::now().date_naive(), draws, pacer).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Simulation stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
