use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::fcff::FcffYear;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One explicit-period flow with its discounting detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountedFlow {
    pub year: u32,
    pub fcff: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
}

/// Enterprise valuation of a projected FCFF stream. Equity value equals
/// enterprise value at this layer; debt netting happens in `share_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationOutput {
    pub flows: Vec<DiscountedFlow>,
    pub pv_of_fcff: Money,
    pub terminal_value: Money,
    pub terminal_value_present: Money,
    pub terminal_value_pct: Rate,
    pub enterprise_value: Money,
    pub equity_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePriceOutput {
    pub equity_value: Money,
    pub price_per_share: Money,
}

/// Terminal value above this share of enterprise value triggers a warning.
const TV_DOMINANCE_THRESHOLD: Decimal = dec!(0.75);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discount an FCFF stream and close it with a Gordon-growth terminal value.
///
/// Each flow is discounted by its own year number, not its position in the
/// series. The terminal value grows the final flow one year and capitalizes
/// it at `wacc - g`, discounted at the final year's factor.
pub fn calculate_valuation(
    fcff_series: &[FcffYear],
    wacc: Rate,
    perpetual_growth: Rate,
) -> ValuationResult<ComputationOutput<ValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inputs(fcff_series, wacc, perpetual_growth)?;

    let mut flows = Vec::with_capacity(fcff_series.len());
    let mut pv_of_fcff = Decimal::ZERO;
    for flow in fcff_series {
        let discount_factor = discount_factor(wacc, flow.year)?;
        let present_value = flow.fcff * discount_factor;
        pv_of_fcff += present_value;
        flows.push(DiscountedFlow {
            year: flow.year,
            fcff: flow.fcff,
            discount_factor,
            present_value,
        });
    }

    let last = fcff_series.last().ok_or_else(|| {
        ValuationError::InsufficientData("Valuation requires at least one FCFF record".to_string())
    })?;
    let last_factor = discount_factor(wacc, last.year)?;

    let terminal_value =
        last.fcff * (Decimal::ONE + perpetual_growth) / (wacc - perpetual_growth);
    let terminal_value_present = terminal_value * last_factor;
    let enterprise_value = pv_of_fcff + terminal_value_present;

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        terminal_value_present / enterprise_value
    };

    if last.fcff < Decimal::ZERO {
        warnings.push(format!(
            "Final-year FCFF is negative ({}); the terminal value is negative",
            last.fcff
        ));
    }
    if terminal_value_pct > TV_DOMINANCE_THRESHOLD {
        warnings.push(format!(
            "Terminal value carries {terminal_value_pct} of enterprise value; the result is dominated by the perpetuity assumptions"
        ));
    }

    let output = ValuationOutput {
        flows,
        pv_of_fcff,
        terminal_value,
        terminal_value_present,
        terminal_value_pct,
        enterprise_value,
        equity_value: enterprise_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "DCF Enterprise Valuation with Gordon Growth Terminal Value",
        &serde_json::json!({
            "wacc": wacc,
            "perpetual_growth": perpetual_growth,
            "explicit_years": fcff_series.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Bridge enterprise value to a per-share price: net off debt, divide by the
/// share count.
pub fn share_price(
    enterprise_value: Money,
    net_debt: Money,
    shares_outstanding: Decimal,
) -> ValuationResult<SharePriceOutput> {
    if shares_outstanding <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "shares_outstanding".to_string(),
            reason: format!("Value must be positive, got {shares_outstanding}"),
        });
    }

    let equity_value = enterprise_value - net_debt;
    Ok(SharePriceOutput {
        equity_value,
        price_per_share: equity_value / shares_outstanding,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn discount_factor(wacc: Rate, year: u32) -> ValuationResult<Decimal> {
    let compounded = (Decimal::ONE + wacc)
        .checked_powu(year as u64)
        .ok_or_else(|| ValuationError::NumericOverflow {
            context: format!("discount factor for year {year}"),
        })?;
    Ok(Decimal::ONE / compounded)
}

fn validate_inputs(
    fcff_series: &[FcffYear],
    wacc: Rate,
    perpetual_growth: Rate,
) -> ValuationResult<()> {
    if fcff_series.is_empty() {
        return Err(ValuationError::InsufficientData(
            "Valuation requires at least one FCFF record".to_string(),
        ));
    }
    if wacc <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "wacc".to_string(),
            reason: format!("Rate must be positive, got {wacc}"),
        });
    }
    if perpetual_growth < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "perpetual_growth_rate".to_string(),
            reason: format!("Rate must be non-negative, got {perpetual_growth}"),
        });
    }
    if perpetual_growth >= wacc {
        return Err(ValuationError::FinancialImpossibility(format!(
            "Perpetual growth ({perpetual_growth}) must be below WACC ({wacc}) for a finite terminal value"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
