use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs for the weighted average cost of capital. Weights are derived from
/// the market values of equity and debt, not taken directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccInput {
    /// Cost of equity (Ke)
    pub cost_of_equity: Rate,
    /// Pre-tax cost of debt (Kd)
    pub cost_of_debt: Rate,
    /// Market value of equity
    pub equity_value: Money,
    /// Market value of debt
    pub debt_value: Money,
    /// Corporate tax rate applied to the debt shield
    pub tax_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    pub cost_of_debt: Rate,
    pub after_tax_cost_of_debt: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// WACC = We*Ke + Wd*Kd*(1 - tax), with We and Wd derived from the capital
/// structure. The result always lies between the after-tax cost of debt and
/// the cost of equity.
pub fn calculate_wacc(input: &WaccInput) -> ValuationResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let total_capital = input.equity_value + input.debt_value;
    if total_capital.is_zero() {
        return Err(ValuationError::DivisionByZero {
            context: "WACC capital-structure weights (equity + debt = 0)".to_string(),
        });
    }

    let equity_weight = input.equity_value / total_capital;
    let debt_weight = input.debt_value / total_capital;
    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);
    let wacc = equity_weight * input.cost_of_equity + debt_weight * after_tax_cost_of_debt;

    if wacc > dec!(0.20) {
        warnings.push(format!("WACC above 20% ({wacc}); check the cost inputs"));
    }
    if debt_weight > dec!(0.80) {
        warnings.push(format!(
            "Capital structure is more than 80% debt (debt weight {debt_weight})"
        ));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity: input.cost_of_equity,
        cost_of_debt: input.cost_of_debt,
        after_tax_cost_of_debt,
        equity_weight,
        debt_weight,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Weighted Average Cost of Capital (market-value weights)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Cost of equity under CAPM: Ke = rf + beta * market risk premium.
///
/// Returns `None` when the risk-free rate is negative; the caller decides how
/// to surface the undefined case. Beta is unrestricted: negative or above 1
/// are both meaningful.
pub fn capm(risk_free: Rate, beta: Decimal, market_risk_premium: Rate) -> Option<Rate> {
    if risk_free < Decimal::ZERO {
        return None;
    }
    Some(risk_free + beta * market_risk_premium)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &WaccInput) -> ValuationResult<()> {
    if input.cost_of_equity < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "cost_of_equity".to_string(),
            reason: format!("Rate must be non-negative, got {}", input.cost_of_equity),
        });
    }
    if input.cost_of_debt < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "cost_of_debt".to_string(),
            reason: format!("Rate must be non-negative, got {}", input.cost_of_debt),
        });
    }
    if input.equity_value < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "equity_value".to_string(),
            reason: format!("Value must be non-negative, got {}", input.equity_value),
        });
    }
    if input.debt_value < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "debt_value".to_string(),
            reason: format!("Value must be non-negative, got {}", input.debt_value),
        });
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(ValuationError::InvalidInput {
            field: "tax_rate".to_string(),
            reason: format!("Rate must be between 0 and 1, got {}", input.tax_rate),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
