use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::engine::{self, FullValuationInput};
use crate::error::ValuationError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on generated sweep points, per axis.
const MAX_SWEEP_POINTS: usize = 10_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The scalar top-level inputs a sweep may vary. A closed enum: there is no
/// string-keyed access into the input struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepVariable {
    Wacc,
    PerpetualGrowthRate,
}

impl SweepVariable {
    /// Write the swept value into a cloned input. Sweeping the WACC also
    /// clears any component override, so the swept value is the one used.
    fn apply(&self, input: &mut FullValuationInput, value: Decimal) {
        match self {
            SweepVariable::Wacc => {
                input.wacc = value;
                input.wacc_input = None;
            }
            SweepVariable::PerpetualGrowthRate => {
                input.perpetual_growth_rate = value;
            }
        }
    }
}

impl fmt::Display for SweepVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepVariable::Wacc => write!(f, "WACC"),
            SweepVariable::PerpetualGrowthRate => write!(f, "perpetual growth"),
        }
    }
}

/// Inclusive value range for one sweep axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRange {
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

impl SweepRange {
    /// Expand the range into concrete sweep points: min, min + step, ...,
    /// up to and including max when the step lands on it exactly.
    pub fn sweep_values(&self) -> ValuationResult<Vec<Decimal>> {
        if self.step <= Decimal::ZERO {
            return Err(ValuationError::InvalidInput {
                field: "step".to_string(),
                reason: format!("Step must be positive, got {}", self.step),
            });
        }
        if self.min > self.max {
            return Err(ValuationError::InvalidInput {
                field: "min".to_string(),
                reason: format!("Range minimum {} exceeds maximum {}", self.min, self.max),
            });
        }

        let mut values = Vec::new();
        let mut value = self.min;
        while value <= self.max {
            if values.len() == MAX_SWEEP_POINTS {
                return Err(ValuationError::InvalidInput {
                    field: "step".to_string(),
                    reason: format!(
                        "Range produces more than {MAX_SWEEP_POINTS} points; widen the step"
                    ),
                });
            }
            values.push(value);
            value += self.step;
        }
        Ok(values)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnivariateSensitivity {
    pub variable: SweepVariable,
    pub values: Vec<Decimal>,
    pub enterprise_values: Vec<Money>,
}

/// Row-major cross-term grid: `grid[i][j]` holds the enterprise value with
/// `variable_1 = values_1[i]` and `variable_2 = values_2[j]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BivariateSensitivity {
    pub variable_1: SweepVariable,
    pub variable_2: SweepVariable,
    pub values_1: Vec<Decimal>,
    pub values_2: Vec<Decimal>,
    pub grid: Vec<Vec<Money>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Re-run the full valuation once per value, collecting enterprise values.
///
/// The first failing run aborts the whole sweep with that run's error.
/// Per-point warnings are not forwarded; run the point directly through the
/// engine to inspect them.
pub fn univariate(
    input: &FullValuationInput,
    variable: SweepVariable,
    values: &[Decimal],
) -> ValuationResult<ComputationOutput<UnivariateSensitivity>> {
    let start = Instant::now();

    if values.is_empty() {
        return Err(ValuationError::InsufficientData(
            "Sensitivity sweep requires at least one value".to_string(),
        ));
    }

    let mut enterprise_values = Vec::with_capacity(values.len());
    for value in values {
        let mut point = input.clone();
        variable.apply(&mut point, *value);
        let outcome = engine::execute(&point)?;
        enterprise_values.push(outcome.result.valuation.enterprise_value);
    }

    let output = UnivariateSensitivity {
        variable,
        values: values.to_vec(),
        enterprise_values,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Univariate DCF Sensitivity Sweep",
        &serde_json::json!({ "base": input, "variable": variable, "values": values }),
        Vec::new(),
        elapsed,
        output,
    ))
}

/// Sweep two variables against each other, one full pipeline run per grid
/// cell. Both setters apply to the same clone, so sweeping one variable on
/// both axes leaves the second axis's value in effect.
pub fn bivariate(
    input: &FullValuationInput,
    variable_1: SweepVariable,
    values_1: &[Decimal],
    variable_2: SweepVariable,
    values_2: &[Decimal],
) -> ValuationResult<ComputationOutput<BivariateSensitivity>> {
    let start = Instant::now();

    if values_1.is_empty() || values_2.is_empty() {
        return Err(ValuationError::InsufficientData(
            "Sensitivity sweep requires at least one value per axis".to_string(),
        ));
    }

    let mut grid = Vec::with_capacity(values_1.len());
    for value_1 in values_1 {
        let mut row = Vec::with_capacity(values_2.len());
        for value_2 in values_2 {
            let mut point = input.clone();
            variable_1.apply(&mut point, *value_1);
            variable_2.apply(&mut point, *value_2);
            let outcome = engine::execute(&point)?;
            row.push(outcome.result.valuation.enterprise_value);
        }
        grid.push(row);
    }

    let output = BivariateSensitivity {
        variable_1,
        variable_2,
        values_1: values_1.to_vec(),
        values_2: values_2.to_vec(),
        grid,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Bivariate DCF Sensitivity Sweep",
        &serde_json::json!({
            "base": input,
            "variable_1": variable_1,
            "values_1": values_1,
            "variable_2": variable_2,
            "values_2": values_2,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::balance::{
        BalanceProjectionRates, BalanceSheetBase, CurrentAssets, CurrentLiabilities,
        EquityAccounts, LongTermAssets, LongTermLiabilities,
    };
    use crate::statements::income::{IncomeProjectionRates, IncomeStatementBase};
    use crate::types::Currency;
    use crate::valuation::wacc::WaccInput;
    use rust_decimal_macros::dec;

    fn sample_input() -> FullValuationInput {
        FullValuationInput {
            currency: Currency::BRL,
            income_base: IncomeStatementBase {
                gross_revenue: dec!(1_000_000),
                deductions: Decimal::ZERO,
                cogs: dec!(400_000),
                operating_expenses: dec!(300_000),
                financial_expenses: dec!(50_000),
                income_tax_rate: dec!(0.30),
                dividends: Decimal::ZERO,
            },
            income_rates: IncomeProjectionRates {
                revenue_growth: vec![dec!(0.10); 3],
                deduction_rates: vec![Decimal::ZERO; 3],
                cogs_rates: vec![dec!(0.40); 3],
                operating_expense_rates: vec![dec!(0.30); 3],
                financial_expense_rates: vec![dec!(0.05); 3],
                tax_rates: vec![dec!(0.30); 3],
                dividend_payout_rates: vec![Decimal::ZERO; 3],
            },
            balance_base: BalanceSheetBase {
                current_assets: CurrentAssets {
                    cash: dec!(100_000),
                    financial_investments: dec!(50_000),
                    receivables: dec!(150_000),
                    inventory: dec!(120_000),
                    other_credits: dec!(30_000),
                },
                long_term_assets: LongTermAssets {
                    investments: dec!(50_000),
                    ppe_gross: dec!(800_000),
                    accumulated_depreciation: dec!(200_000),
                    intangibles: dec!(50_000),
                },
                current_liabilities: CurrentLiabilities {
                    suppliers: dec!(90_000),
                    taxes_payable: dec!(40_000),
                    payroll_obligations: dec!(30_000),
                    short_term_loans: dec!(60_000),
                    other_obligations: dec!(20_000),
                },
                long_term_liabilities: LongTermLiabilities {
                    long_term_loans: dec!(310_000),
                },
                equity: EquityAccounts {
                    capital: dec!(500_000),
                    retained_earnings: dec!(100_000),
                },
            },
            balance_rates: BalanceProjectionRates {
                depreciation_rates: vec![dec!(0.10); 3],
                capex_to_revenue: vec![dec!(0.06); 3],
                financial_investment_returns: vec![dec!(0.08); 3],
                days_cash: vec![dec!(18); 3],
                days_receivables: vec![dec!(36); 3],
                days_inventory: vec![dec!(54); 3],
                days_other_credits: vec![dec!(9); 3],
                days_suppliers: vec![dec!(45); 3],
                days_taxes_payable: vec![dec!(12); 3],
                days_payroll: vec![dec!(24); 3],
                days_other_obligations: vec![dec!(12); 3],
                short_term_loan_growth: vec![dec!(0.05); 3],
                long_term_loan_growth: vec![dec!(0.05); 3],
                loan_interest_rates: vec![dec!(0.10); 3],
            },
            wacc: dec!(0.15),
            wacc_input: None,
            perpetual_growth_rate: dec!(0.03),
            projection_years: 3,
        }
    }

    #[test]
    fn test_sweep_values_inclusive_of_max() {
        let range = SweepRange {
            min: dec!(0.08),
            max: dec!(0.14),
            step: dec!(0.02),
        };
        assert_eq!(
            range.sweep_values().unwrap(),
            vec![dec!(0.08), dec!(0.10), dec!(0.12), dec!(0.14)]
        );
    }

    #[test]
    fn test_sweep_values_stops_below_max() {
        let range = SweepRange {
            min: dec!(0.08),
            max: dec!(0.13),
            step: dec!(0.02),
        };
        assert_eq!(
            range.sweep_values().unwrap(),
            vec![dec!(0.08), dec!(0.10), dec!(0.12)]
        );
    }

    #[test]
    fn test_sweep_values_zero_step_fails() {
        let range = SweepRange {
            min: dec!(0.08),
            max: dec!(0.14),
            step: Decimal::ZERO,
        };
        assert!(matches!(
            range.sweep_values(),
            Err(ValuationError::InvalidInput { field, .. }) if field == "step"
        ));
    }

    #[test]
    fn test_sweep_values_inverted_range_fails() {
        let range = SweepRange {
            min: dec!(0.14),
            max: dec!(0.08),
            step: dec!(0.02),
        };
        assert!(matches!(
            range.sweep_values(),
            Err(ValuationError::InvalidInput { field, .. }) if field == "min"
        ));
    }

    #[test]
    fn test_sweep_values_point_cap() {
        let range = SweepRange {
            min: Decimal::ZERO,
            max: Decimal::ONE,
            step: dec!(0.00001),
        };
        assert!(matches!(
            range.sweep_values(),
            Err(ValuationError::InvalidInput { field, .. }) if field == "step"
        ));
    }

    #[test]
    fn test_univariate_lengths_match() {
        let values = [dec!(0.10), dec!(0.12), dec!(0.15)];
        let output = univariate(&sample_input(), SweepVariable::Wacc, &values).unwrap();
        let result = output.result;

        assert_eq!(result.variable, SweepVariable::Wacc);
        assert_eq!(result.values, values.to_vec());
        assert_eq!(result.enterprise_values.len(), values.len());
    }

    #[test]
    fn test_ev_decreases_with_rising_wacc() {
        let values = [dec!(0.10), dec!(0.12), dec!(0.15)];
        let result = univariate(&sample_input(), SweepVariable::Wacc, &values)
            .unwrap()
            .result;

        for pair in result.enterprise_values.windows(2) {
            assert!(
                pair[0] > pair[1],
                "enterprise value should fall as WACC rises: {:?}",
                result.enterprise_values
            );
        }
    }

    #[test]
    fn test_ev_increases_with_rising_growth() {
        let values = [dec!(0.01), dec!(0.02), dec!(0.03)];
        let result = univariate(&sample_input(), SweepVariable::PerpetualGrowthRate, &values)
            .unwrap()
            .result;

        for pair in result.enterprise_values.windows(2) {
            assert!(
                pair[0] < pair[1],
                "enterprise value should rise with perpetual growth: {:?}",
                result.enterprise_values
            );
        }
    }

    #[test]
    fn test_univariate_empty_values_fails() {
        let result = univariate(&sample_input(), SweepVariable::Wacc, &[]);
        assert!(matches!(result, Err(ValuationError::InsufficientData(_))));
    }

    #[test]
    fn test_failing_point_aborts_sweep() {
        let values = [dec!(0.10), Decimal::ZERO, dec!(0.15)];
        let result = univariate(&sample_input(), SweepVariable::Wacc, &values);

        assert!(matches!(
            result,
            Err(ValuationError::InvalidInput { field, .. }) if field == "wacc"
        ));
    }

    #[test]
    fn test_wacc_sweep_overrides_component_input() {
        let mut input = sample_input();
        input.wacc_input = Some(WaccInput {
            cost_of_equity: dec!(0.15),
            cost_of_debt: dec!(0.12),
            equity_value: dec!(650_000),
            debt_value: dec!(350_000),
            tax_rate: dec!(0.34),
        });

        let swept = univariate(&input, SweepVariable::Wacc, &[dec!(0.20)])
            .unwrap()
            .result;

        let mut direct = sample_input();
        direct.wacc = dec!(0.20);
        let expected = engine::execute(&direct)
            .unwrap()
            .result
            .valuation
            .enterprise_value;

        assert_eq!(swept.enterprise_values[0], expected);
    }

    #[test]
    fn test_bivariate_grid_shape() {
        let wacc_values = [dec!(0.10), dec!(0.12), dec!(0.15)];
        let growth_values = [dec!(0.02), dec!(0.03)];
        let result = bivariate(
            &sample_input(),
            SweepVariable::Wacc,
            &wacc_values,
            SweepVariable::PerpetualGrowthRate,
            &growth_values,
        )
        .unwrap()
        .result;

        assert_eq!(result.grid.len(), 3);
        for row in &result.grid {
            assert_eq!(row.len(), 2);
        }
    }

    #[test]
    fn test_bivariate_cell_matches_direct_run() {
        let wacc_values = [dec!(0.10), dec!(0.12)];
        let growth_values = [dec!(0.02), dec!(0.03)];
        let result = bivariate(
            &sample_input(),
            SweepVariable::Wacc,
            &wacc_values,
            SweepVariable::PerpetualGrowthRate,
            &growth_values,
        )
        .unwrap()
        .result;

        let mut direct = sample_input();
        direct.wacc = dec!(0.12);
        direct.perpetual_growth_rate = dec!(0.02);
        let expected = engine::execute(&direct)
            .unwrap()
            .result
            .valuation
            .enterprise_value;

        assert_eq!(result.grid[1][0], expected);
    }

    #[test]
    fn test_bivariate_same_variable_second_wins() {
        let result = bivariate(
            &sample_input(),
            SweepVariable::PerpetualGrowthRate,
            &[dec!(0.01)],
            SweepVariable::PerpetualGrowthRate,
            &[dec!(0.04)],
        )
        .unwrap()
        .result;

        let mut direct = sample_input();
        direct.perpetual_growth_rate = dec!(0.04);
        let expected = engine::execute(&direct)
            .unwrap()
            .result
            .valuation
            .enterprise_value;

        assert_eq!(result.grid[0][0], expected);
    }

    #[test]
    fn test_bivariate_empty_axis_fails() {
        let result = bivariate(
            &sample_input(),
            SweepVariable::Wacc,
            &[dec!(0.10)],
            SweepVariable::PerpetualGrowthRate,
            &[],
        );
        assert!(matches!(result, Err(ValuationError::InsufficientData(_))));
    }
}
