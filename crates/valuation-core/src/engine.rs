use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::fcff::{self, FcffYear};
use crate::statements::balance::{self, BalanceProjectionRates, BalanceSheetBase, BalanceSheetYear};
use crate::statements::income::{
    self, IncomeProjectionRates, IncomeStatementBase, IncomeStatementYear,
};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::valuation::dcf::{self, ValuationOutput};
use crate::valuation::wacc::{calculate_wacc, WaccInput};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Complete input bundle for a full company valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullValuationInput {
    /// Reporting currency (descriptive only)
    #[serde(default)]
    pub currency: Currency,
    /// Base-year income statement
    pub income_base: IncomeStatementBase,
    /// Per-year income-statement assumptions
    pub income_rates: IncomeProjectionRates,
    /// Base-year balance sheet
    pub balance_base: BalanceSheetBase,
    /// Per-year balance-sheet assumptions
    pub balance_rates: BalanceProjectionRates,
    /// Discount rate used as-is unless `wacc_input` is present
    pub wacc: Rate,
    /// Optional capital-structure components; when present the WACC is
    /// recomputed from them and `wacc` is ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wacc_input: Option<WaccInput>,
    /// Perpetual growth rate for the terminal value
    pub perpetual_growth_rate: Rate,
    /// Projection horizon in years; must match the revenue-growth series
    pub projection_years: u32,
}

/// Everything the pipeline produces, in pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullValuationOutput {
    pub income_statements: Vec<IncomeStatementYear>,
    pub balance_sheets: Vec<BalanceSheetYear>,
    pub fcff: Vec<FcffYear>,
    pub valuation: ValuationOutput,
    pub wacc_used: Rate,
}

/// Reduced driver-based input for callers that only need a headline
/// enterprise value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickValuationInput {
    #[serde(default)]
    pub currency: Currency,
    /// Base-year net revenue
    pub base_revenue: Money,
    /// Revenue growth per projection year (length sets the horizon)
    pub revenue_growth_rates: Vec<Rate>,
    /// EBIT as a share of revenue
    pub operating_margin: Rate,
    /// D&A as a share of revenue
    pub depreciation_to_revenue: Rate,
    /// CAPEX as a share of revenue
    pub capex_to_revenue: Rate,
    /// Net working capital as a share of revenue
    pub working_capital_to_revenue: Rate,
    /// Tax rate applied to EBIT
    pub tax_rate: Rate,
    pub wacc: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wacc_input: Option<WaccInput>,
    pub perpetual_growth_rate: Rate,
    /// Total debt net of cash, for the per-share bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickValuationOutput {
    pub enterprise_value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_share: Option<Money>,
    pub pv_of_fcff: Money,
    pub pv_of_terminal: Money,
    pub terminal_value_pct: Rate,
    pub wacc_used: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full valuation pipeline: DRE projection, balance-sheet projection,
/// FCFF derivation, DCF valuation.
///
/// Component failures propagate unchanged; component warnings are merged into
/// the envelope under a stage prefix.
pub fn execute(
    input: &FullValuationInput,
) -> ValuationResult<ComputationOutput<FullValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.projection_years == 0 {
        return Err(ValuationError::InvalidInput {
            field: "projection_years".to_string(),
            reason: "Projection horizon must be at least one year".to_string(),
        });
    }
    let growth_years = input.income_rates.revenue_growth.len();
    if growth_years != input.projection_years as usize {
        return Err(ValuationError::InvalidInput {
            field: "income_rates.revenue_growth".to_string(),
            reason: format!(
                "{} growth rates supplied for a {}-year horizon",
                growth_years, input.projection_years
            ),
        });
    }

    let wacc_used = resolve_wacc(input.wacc, input.wacc_input.as_ref(), &mut warnings)?;

    let income = income::project_all(&input.income_base, &input.income_rates)?;
    merge_warnings(&mut warnings, "DRE", &income.warnings);

    let balance = balance::project_all(&input.balance_base, &income.result, &input.balance_rates)?;
    merge_warnings(&mut warnings, "BS", &balance.warnings);

    let flows = fcff::derive_all(&income.result, &balance.result)?;
    merge_warnings(&mut warnings, "FCFF", &flows.warnings);

    let valuation =
        dcf::calculate_valuation(&flows.result, wacc_used, input.perpetual_growth_rate)?;
    merge_warnings(&mut warnings, "DCF", &valuation.warnings);

    let output = FullValuationOutput {
        income_statements: income.result,
        balance_sheets: balance.result,
        fcff: flows.result,
        valuation: valuation.result,
        wacc_used,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Integrated DCF Valuation (DRE, Balance Sheet, FCFF, Gordon Growth)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Headline valuation from driver ratios alone: the FCFF stream is built
/// directly (NOPAT + D&A - CAPEX - change in NWC per year) and closed with
/// the same terminal-value machinery as the full pipeline.
pub fn execute_quick(
    input: &QuickValuationInput,
) -> ValuationResult<ComputationOutput<QuickValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_quick_input(input)?;

    let wacc_used = resolve_wacc(input.wacc, input.wacc_input.as_ref(), &mut warnings)?;

    let mut flows = Vec::with_capacity(input.revenue_growth_rates.len());
    let mut prior_revenue = input.base_revenue;
    let mut prior_nwc = input.base_revenue * input.working_capital_to_revenue;
    for (idx, growth) in input.revenue_growth_rates.iter().enumerate() {
        let year = (idx + 1) as u32;
        let revenue = prior_revenue * (Decimal::ONE + growth);
        let ebit = revenue * input.operating_margin;
        let taxes_on_ebit = ebit * input.tax_rate;
        let nopat = ebit - taxes_on_ebit;
        let depreciation = revenue * input.depreciation_to_revenue;
        let capex = revenue * input.capex_to_revenue;
        let nwc = revenue * input.working_capital_to_revenue;
        let working_capital_change = nwc - prior_nwc;
        let fcff = nopat + depreciation - capex - working_capital_change;

        flows.push(FcffYear {
            year,
            ebit,
            taxes_on_ebit,
            nopat,
            depreciation,
            capex,
            working_capital_change,
            fcff,
        });
        prior_revenue = revenue;
        prior_nwc = nwc;
    }

    let valuation = dcf::calculate_valuation(&flows, wacc_used, input.perpetual_growth_rate)?;
    merge_warnings(&mut warnings, "DCF", &valuation.warnings);
    let valuation = valuation.result;

    let (equity_value, price_per_share) = match (input.net_debt, input.shares_outstanding) {
        (Some(net_debt), Some(shares)) => {
            let priced = dcf::share_price(valuation.enterprise_value, net_debt, shares)?;
            (Some(priced.equity_value), Some(priced.price_per_share))
        }
        (None, None) => (None, None),
        _ => {
            warnings.push(
                "Both net_debt and shares_outstanding are required for a per-share price; skipping the bridge"
                    .to_string(),
            );
            (None, None)
        }
    };

    let output = QuickValuationOutput {
        enterprise_value: valuation.enterprise_value,
        equity_value,
        price_per_share,
        pv_of_fcff: valuation.pv_of_fcff,
        pv_of_terminal: valuation.terminal_value_present,
        terminal_value_pct: valuation.terminal_value_pct,
        wacc_used,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Driver-Based Quick DCF Valuation",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// A component override beats the direct rate; its warnings ride along.
fn resolve_wacc(
    direct: Rate,
    components: Option<&WaccInput>,
    warnings: &mut Vec<String>,
) -> ValuationResult<Rate> {
    match components {
        Some(components) => {
            let computed = calculate_wacc(components)?;
            merge_warnings(warnings, "WACC", &computed.warnings);
            Ok(computed.result.wacc)
        }
        None => Ok(direct),
    }
}

fn merge_warnings(into: &mut Vec<String>, stage: &str, from: &[String]) {
    for warning in from {
        into.push(format!("[{stage}] {warning}"));
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_quick_input(input: &QuickValuationInput) -> ValuationResult<()> {
    if input.revenue_growth_rates.is_empty() {
        return Err(ValuationError::InsufficientData(
            "Quick valuation requires at least one revenue growth rate".to_string(),
        ));
    }
    if input.base_revenue <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "base_revenue".to_string(),
            reason: format!("Value must be positive, got {}", input.base_revenue),
        });
    }

    validate_rate("operating_margin", input.operating_margin)?;
    validate_rate("depreciation_to_revenue", input.depreciation_to_revenue)?;
    validate_rate("capex_to_revenue", input.capex_to_revenue)?;
    validate_rate("working_capital_to_revenue", input.working_capital_to_revenue)?;
    validate_rate("tax_rate", input.tax_rate)?;

    Ok(())
}

fn validate_rate(field: &str, value: Rate) -> ValuationResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValuationError::InvalidInput {
            field: field.to_string(),
            reason: format!("Rate must be between 0 and 1, got {value}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
