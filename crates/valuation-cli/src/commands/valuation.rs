use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use valuation_core::engine::{self, FullValuationInput, QuickValuationInput};
use valuation_core::types::Currency;
use valuation_core::valuation::wacc::{self, WaccInput};

use crate::input;

/// Arguments for the full valuation pipeline
#[derive(Args)]
pub struct FullArgs {
    /// Path to JSON input file (or pipe the JSON via stdin)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for quick driver-based valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct QuickArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Base-year net revenue
    #[arg(long)]
    pub base_revenue: Option<Decimal>,

    /// Comma-separated revenue growth rates, one per projection year
    /// (e.g. "0.10,0.08,0.06")
    #[arg(long)]
    pub growth: Option<String>,

    /// EBIT as a share of revenue
    #[arg(long)]
    pub operating_margin: Option<Decimal>,

    /// Tax rate applied to EBIT
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Discount rate
    #[arg(long)]
    pub wacc: Option<Decimal>,

    /// Perpetual growth rate for the terminal value
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Depreciation as a share of revenue
    #[arg(long, default_value = "0")]
    pub depreciation_to_revenue: Decimal,

    /// CAPEX as a share of revenue
    #[arg(long, default_value = "0")]
    pub capex_to_revenue: Decimal,

    /// Net working capital as a share of revenue
    #[arg(long, default_value = "0")]
    pub working_capital_to_revenue: Decimal,

    /// Net debt for the per-share bridge
    #[arg(long)]
    pub net_debt: Option<Decimal>,

    /// Shares outstanding for the per-share bridge
    #[arg(long)]
    pub shares: Option<Decimal>,
}

/// Arguments for WACC calculation
#[derive(Args)]
pub struct WaccArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cost of equity (e.g. 0.15 for 15%)
    #[arg(long)]
    pub cost_of_equity: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,

    /// Market value of equity
    #[arg(long)]
    pub equity_value: Option<Decimal>,

    /// Market value of debt
    #[arg(long)]
    pub debt_value: Option<Decimal>,

    /// Marginal corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,
}

/// Arguments for CAPM cost of equity
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CapmArgs {
    /// Risk-free rate (e.g. 0.04 for 4%)
    #[arg(long)]
    pub risk_free: Decimal,

    /// Levered beta
    #[arg(long)]
    pub beta: Decimal,

    /// Market risk premium
    #[arg(long)]
    pub market_premium: Decimal,
}

#[derive(Serialize)]
struct CapmOutput {
    cost_of_equity: Decimal,
    risk_free_rate: Decimal,
    beta: Decimal,
    market_risk_premium: Decimal,
}

pub fn run_full(args: FullArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let full_input: FullValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("provide --input or pipe the valuation JSON via stdin".into());
    };

    let result = engine::execute(&full_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_quick(args: QuickArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let quick_input: QuickValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        QuickValuationInput {
            currency: Currency::default(),
            base_revenue: args
                .base_revenue
                .ok_or("--base-revenue is required (or provide --input)")?,
            revenue_growth_rates: parse_rate_list(
                args.growth
                    .as_deref()
                    .ok_or("--growth is required (or provide --input)")?,
            )?,
            operating_margin: args
                .operating_margin
                .ok_or("--operating-margin is required (or provide --input)")?,
            depreciation_to_revenue: args.depreciation_to_revenue,
            capex_to_revenue: args.capex_to_revenue,
            working_capital_to_revenue: args.working_capital_to_revenue,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            wacc: args.wacc.ok_or("--wacc is required (or provide --input)")?,
            wacc_input: None,
            perpetual_growth_rate: args
                .terminal_growth
                .ok_or("--terminal-growth is required (or provide --input)")?,
            net_debt: args.net_debt,
            shares_outstanding: args.shares,
        }
    };

    let result = engine::execute_quick(&quick_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input: WaccInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        WaccInput {
            cost_of_equity: args
                .cost_of_equity
                .ok_or("--cost-of-equity is required (or provide --input)")?,
            cost_of_debt: args
                .cost_of_debt
                .ok_or("--cost-of-debt is required (or provide --input)")?,
            equity_value: args
                .equity_value
                .ok_or("--equity-value is required (or provide --input)")?,
            debt_value: args
                .debt_value
                .ok_or("--debt-value is required (or provide --input)")?,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
        }
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_capm(args: CapmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    match wacc::capm(args.risk_free, args.beta, args.market_premium) {
        Some(cost_of_equity) => Ok(serde_json::to_value(CapmOutput {
            cost_of_equity,
            risk_free_rate: args.risk_free,
            beta: args.beta,
            market_risk_premium: args.market_premium,
        })?),
        None => Err(format!(
            "CAPM is undefined for a negative risk-free rate (got {})",
            args.risk_free
        )
        .into()),
    }
}

fn parse_rate_list(spec: &str) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    spec.split(',')
        .map(|part| {
            let trimmed = part.trim();
            trimmed
                .parse::<Decimal>()
                .map_err(|e| format!("Invalid rate '{trimmed}': {e}").into())
        })
        .collect()
}
