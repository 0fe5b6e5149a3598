use clap::Args;
use serde_json::Value;

use valuation_core::engine::FullValuationInput;
use valuation_core::sensitivity::{self, SweepRange, SweepVariable};

use crate::input;

/// Arguments for sensitivity sweeps over the full valuation pipeline
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON file with the base valuation input (or pipe via stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// First sweep variable in format name:min:max:step
    /// (names: wacc, growth; e.g. "wacc:0.08:0.14:0.01")
    #[arg(long)]
    pub var1: String,

    /// Second sweep variable (optional, produces a 2D grid)
    #[arg(long)]
    pub var2: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base: FullValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("provide --input or pipe the base valuation JSON via stdin".into());
    };

    let (variable_1, range_1) = parse_sweep(&args.var1)?;
    let values_1 = range_1.sweep_values()?;

    match args.var2 {
        Some(ref spec) => {
            let (variable_2, range_2) = parse_sweep(spec)?;
            let values_2 = range_2.sweep_values()?;
            let result =
                sensitivity::bivariate(&base, variable_1, &values_1, variable_2, &values_2)?;
            Ok(serde_json::to_value(result)?)
        }
        None => {
            let result = sensitivity::univariate(&base, variable_1, &values_1)?;
            Ok(serde_json::to_value(result)?)
        }
    }
}

fn parse_sweep(spec: &str) -> Result<(SweepVariable, SweepRange), Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("Sweep variable must be name:min:max:step, got '{spec}'").into());
    }

    let variable = match parts[0].to_lowercase().as_str() {
        "wacc" => SweepVariable::Wacc,
        "growth" | "g" => SweepVariable::PerpetualGrowthRate,
        other => {
            return Err(format!(
                "Unknown sweep variable '{other}'. Available variables: wacc, growth"
            )
            .into())
        }
    };
    let range = SweepRange {
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    };
    Ok((variable, range))
}
