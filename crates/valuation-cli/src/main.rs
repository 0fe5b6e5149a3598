mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::sensitivity::SensitivityArgs;
use commands::valuation::{CapmArgs, FullArgs, QuickArgs, WaccArgs};

/// Decimal-precision company valuation by discounted cash flow
#[derive(Parser)]
#[command(
    name = "dcfv",
    version,
    about = "Decimal-precision company valuation by discounted cash flow",
    long_about = "Projects income statements and balance sheets from per-year \
                  assumption arrays, derives free cash flow to firm, and values \
                  the company with a Gordon-growth terminal value. All arithmetic \
                  is exact decimal. Supports WACC, CAPM, quick driver-based \
                  valuations, and sensitivity sweeps."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full valuation pipeline (DRE, balance sheet, FCFF, DCF)
    Full(FullArgs),
    /// Driver-based quick valuation for a headline enterprise value
    Quick(QuickArgs),
    /// Calculate Weighted Average Cost of Capital from market values
    Wacc(WaccArgs),
    /// Cost of equity via CAPM
    Capm(CapmArgs),
    /// Sweep WACC or perpetual growth across the full pipeline
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Full(args) => commands::valuation::run_full(args),
        Commands::Quick(args) => commands::valuation::run_quick(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Capm(args) => commands::valuation::run_capm(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Version => {
            println!("dcfv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
