use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::statements::income::IncomeStatementYear;
use crate::types::{assumption, with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// 360-day commercial year used for all average-term conversions.
const DAYS_IN_YEAR: Decimal = dec!(360);

/// Asset-schedule drift beyond this share of the balancing total is surfaced
/// as a warning.
const DRIFT_WARNING_PCT: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Current-asset lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAssets {
    pub cash: Money,
    pub financial_investments: Money,
    pub receivables: Money,
    pub inventory: Money,
    pub other_credits: Money,
}

impl CurrentAssets {
    pub fn total(&self) -> Money {
        self.cash + self.financial_investments + self.receivables + self.inventory
            + self.other_credits
    }
}

/// Long-term (non-current) asset lines. PP&E is tracked gross with its own
/// accumulated-depreciation account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermAssets {
    pub investments: Money,
    pub ppe_gross: Money,
    pub accumulated_depreciation: Money,
    pub intangibles: Money,
}

/// Current-liability lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentLiabilities {
    pub suppliers: Money,
    pub taxes_payable: Money,
    pub payroll_obligations: Money,
    pub short_term_loans: Money,
    pub other_obligations: Money,
}

impl CurrentLiabilities {
    pub fn total(&self) -> Money {
        self.suppliers
            + self.taxes_payable
            + self.payroll_obligations
            + self.short_term_loans
            + self.other_obligations
    }
}

/// Long-term liability lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermLiabilities {
    pub long_term_loans: Money,
}

/// Equity accounts. Retained earnings may be negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityAccounts {
    pub capital: Money,
    pub retained_earnings: Money,
}

impl EquityAccounts {
    pub fn total(&self) -> Money {
        self.capital + self.retained_earnings
    }
}

/// Base-year balance sheet as reported. The external validation layer
/// guarantees the accounting identity holds here before projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetBase {
    pub current_assets: CurrentAssets,
    pub long_term_assets: LongTermAssets,
    pub current_liabilities: CurrentLiabilities,
    pub long_term_liabilities: LongTermLiabilities,
    pub equity: EquityAccounts,
}

/// Per-year balance-sheet assumptions. Working-capital lines are driven by
/// average terms in days over a 360-day commercial year; loans by growth
/// rates; financial investments by a return rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceProjectionRates {
    /// Depreciation charge as a share of prior gross PP&E
    pub depreciation_rates: Vec<Rate>,
    /// CAPEX as a share of the year's net revenue
    pub capex_to_revenue: Vec<Rate>,
    /// Return earned on the financial-investment balance
    pub financial_investment_returns: Vec<Rate>,
    /// Days of revenue held as operating cash
    pub days_cash: Vec<Decimal>,
    /// Days of revenue outstanding as receivables
    pub days_receivables: Vec<Decimal>,
    /// Days of COGS held as inventory
    pub days_inventory: Vec<Decimal>,
    /// Days of revenue tied up in other short-term credits
    pub days_other_credits: Vec<Decimal>,
    /// Days of COGS owed to suppliers
    pub days_suppliers: Vec<Decimal>,
    /// Days of revenue owed as taxes payable
    pub days_taxes_payable: Vec<Decimal>,
    /// Days of operating expenses owed as payroll obligations
    pub days_payroll: Vec<Decimal>,
    /// Days of operating expenses owed as other obligations
    pub days_other_obligations: Vec<Decimal>,
    /// Growth of the short-term loan balance (new borrowings net of repayment)
    pub short_term_loan_growth: Vec<Rate>,
    /// Growth of the long-term loan balance
    pub long_term_loan_growth: Vec<Rate>,
    /// Interest rate accruing on the prior loan balances (reported only)
    pub loan_interest_rates: Vec<Rate>,
}

/// One calculated balance-sheet year. Year 0 is the base year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetYear {
    pub year: u32,
    pub current_assets: CurrentAssets,
    pub long_term_assets: LongTermAssets,
    pub current_liabilities: CurrentLiabilities,
    pub long_term_liabilities: LongTermLiabilities,
    pub equity: EquityAccounts,
    pub ppe_net: Money,
    pub depreciation: Money,
    pub capex: Money,
    pub interest_on_loans: Money,
    pub working_capital: Money,
    pub working_capital_change: Money,
    pub total_current_assets: Money,
    pub total_current_liabilities: Money,
    pub total_assets: Money,
    pub total_liabilities: Money,
}

impl BalanceSheetYear {
    /// Sum of the asset schedule as reported line by line. The balancing
    /// total is carried separately in `total_assets`.
    pub fn asset_schedule_total(&self) -> Money {
        self.total_current_assets
            + self.long_term_assets.investments
            + self.ppe_net
            + self.long_term_assets.intangibles
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assemble the base-year record from reported balances. No depreciation,
/// CAPEX or interest is attributed to the base year.
pub fn base_year(base: &BalanceSheetBase) -> BalanceSheetYear {
    let total_current_assets = base.current_assets.total();
    let total_current_liabilities = base.current_liabilities.total();
    let ppe_net = base.long_term_assets.ppe_gross - base.long_term_assets.accumulated_depreciation;
    let total_liabilities = total_current_liabilities
        + base.long_term_liabilities.long_term_loans
        + base.equity.total();

    BalanceSheetYear {
        year: 0,
        current_assets: base.current_assets.clone(),
        long_term_assets: base.long_term_assets.clone(),
        current_liabilities: base.current_liabilities.clone(),
        long_term_liabilities: base.long_term_liabilities.clone(),
        equity: base.equity.clone(),
        ppe_net,
        depreciation: Decimal::ZERO,
        capex: Decimal::ZERO,
        interest_on_loans: Decimal::ZERO,
        working_capital: total_current_assets - total_current_liabilities,
        working_capital_change: Decimal::ZERO,
        total_current_assets,
        total_current_liabilities,
        total_assets: total_liabilities,
        total_liabilities,
    }
}

/// Project one balance-sheet year from the prior sheet and the paired income
/// year.
///
/// `year` is 1-based; assumption series are read at `year - 1`. The sheet
/// balances from the liabilities side: `total_assets` mirrors current
/// liabilities + long-term liabilities + equity and is never summed from the
/// asset schedule.
pub fn project_year(
    previous: &BalanceSheetYear,
    income_year: &IncomeStatementYear,
    rates: &BalanceProjectionRates,
    year: u32,
) -> ValuationResult<BalanceSheetYear> {
    let revenue = income_year.revenue;
    let cogs = income_year.cogs;
    let opex = income_year.operating_expenses;

    let dep_rate = assumption(&rates.depreciation_rates, "depreciation_rates", year)?;
    let capex_ratio = assumption(&rates.capex_to_revenue, "capex_to_revenue", year)?;
    let fin_return = assumption(
        &rates.financial_investment_returns,
        "financial_investment_returns",
        year,
    )?;
    let days_cash = assumption(&rates.days_cash, "days_cash", year)?;
    let days_receivables = assumption(&rates.days_receivables, "days_receivables", year)?;
    let days_inventory = assumption(&rates.days_inventory, "days_inventory", year)?;
    let days_other_credits = assumption(&rates.days_other_credits, "days_other_credits", year)?;
    let days_suppliers = assumption(&rates.days_suppliers, "days_suppliers", year)?;
    let days_taxes_payable = assumption(&rates.days_taxes_payable, "days_taxes_payable", year)?;
    let days_payroll = assumption(&rates.days_payroll, "days_payroll", year)?;
    let days_other_obligations = assumption(
        &rates.days_other_obligations,
        "days_other_obligations",
        year,
    )?;
    let st_growth = assumption(&rates.short_term_loan_growth, "short_term_loan_growth", year)?;
    let lt_growth = assumption(&rates.long_term_loan_growth, "long_term_loan_growth", year)?;
    let loan_rate = assumption(&rates.loan_interest_rates, "loan_interest_rates", year)?;

    // Working-capital lines from average terms
    let current_assets = CurrentAssets {
        cash: revenue * days_cash / DAYS_IN_YEAR,
        financial_investments: previous.current_assets.financial_investments
            * (Decimal::ONE + fin_return),
        receivables: revenue * days_receivables / DAYS_IN_YEAR,
        inventory: cogs * days_inventory / DAYS_IN_YEAR,
        other_credits: revenue * days_other_credits / DAYS_IN_YEAR,
    };

    // PP&E roll-forward: depreciation on prior gross, CAPEX from revenue
    let depreciation = previous.long_term_assets.ppe_gross * dep_rate;
    let capex = revenue * capex_ratio;
    let long_term_assets = LongTermAssets {
        investments: previous.long_term_assets.investments,
        ppe_gross: previous.long_term_assets.ppe_gross + capex,
        accumulated_depreciation: previous.long_term_assets.accumulated_depreciation
            + depreciation,
        intangibles: previous.long_term_assets.intangibles,
    };
    let ppe_net = long_term_assets.ppe_gross - long_term_assets.accumulated_depreciation;

    let prior_loans = previous.current_liabilities.short_term_loans
        + previous.long_term_liabilities.long_term_loans;
    let current_liabilities = CurrentLiabilities {
        suppliers: cogs * days_suppliers / DAYS_IN_YEAR,
        taxes_payable: revenue * days_taxes_payable / DAYS_IN_YEAR,
        payroll_obligations: opex * days_payroll / DAYS_IN_YEAR,
        short_term_loans: previous.current_liabilities.short_term_loans
            * (Decimal::ONE + st_growth),
        other_obligations: opex * days_other_obligations / DAYS_IN_YEAR,
    };
    let long_term_liabilities = LongTermLiabilities {
        long_term_loans: previous.long_term_liabilities.long_term_loans
            * (Decimal::ONE + lt_growth),
    };
    let interest_on_loans = prior_loans * loan_rate;

    // Equity accumulates the paired year's net income
    let equity = EquityAccounts {
        capital: previous.equity.capital,
        retained_earnings: previous.equity.retained_earnings + income_year.net_income,
    };

    let total_current_assets = current_assets.total();
    let total_current_liabilities = current_liabilities.total();
    // Balances from the liabilities side by construction
    let total_liabilities =
        total_current_liabilities + long_term_liabilities.long_term_loans + equity.total();
    let working_capital = total_current_assets - total_current_liabilities;
    let working_capital_change = working_capital - previous.working_capital;

    Ok(BalanceSheetYear {
        year,
        current_assets,
        long_term_assets,
        current_liabilities,
        long_term_liabilities,
        equity,
        ppe_net,
        depreciation,
        capex,
        interest_on_loans,
        working_capital,
        working_capital_change,
        total_current_assets,
        total_current_liabilities,
        total_assets: total_liabilities,
        total_liabilities,
    })
}

/// Project one balance sheet per income-statement record: year 0 from the
/// base sheet, later years each from the prior sheet and the matching income
/// year.
pub fn project_all(
    base: &BalanceSheetBase,
    income_statements: &[IncomeStatementYear],
    rates: &BalanceProjectionRates,
) -> ValuationResult<ComputationOutput<Vec<BalanceSheetYear>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if income_statements.is_empty() {
        return Err(ValuationError::InsufficientData(
            "Balance projection requires at least one income-statement record".to_string(),
        ));
    }

    let mut sheets = Vec::with_capacity(income_statements.len());
    let mut previous = base_year(base);
    check_drift(&previous, &mut warnings);
    sheets.push(previous.clone());

    for income_year in income_statements.iter().skip(1) {
        let current = project_year(&previous, income_year, rates, income_year.year)?;
        check_drift(&current, &mut warnings);
        previous = current.clone();
        sheets.push(current);
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Days-Based Balance Sheet Projection (360-day commercial year)",
        &serde_json::json!({ "base": base, "rates": rates }),
        warnings,
        elapsed,
        sheets,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Day-count working capital moves the asset side independently of the
/// balancing total; surface the tension when it grows past the threshold.
fn check_drift(sheet: &BalanceSheetYear, warnings: &mut Vec<String>) {
    let schedule = sheet.asset_schedule_total();
    let balancing = sheet.total_assets;
    let drift = (schedule - balancing).abs();

    let out_of_tolerance = if balancing.is_zero() {
        !drift.is_zero()
    } else {
        drift / balancing.abs() > DRIFT_WARNING_PCT
    };
    if out_of_tolerance {
        warnings.push(format!(
            "Year {}: asset schedule ({schedule}) drifts from the balancing total ({balancing}); review working-capital day assumptions",
            sheet.year
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::income::{self, IncomeProjectionRates, IncomeStatementBase};
    use rust_decimal_macros::dec;

    fn sample_base() -> BalanceSheetBase {
        BalanceSheetBase {
            current_assets: CurrentAssets {
                cash: dec!(500_000),
                financial_investments: dec!(300_000),
                receivables: dec!(1_000_000),
                inventory: dec!(600_000),
                other_credits: dec!(100_000),
            },
            long_term_assets: LongTermAssets {
                investments: dec!(200_000),
                ppe_gross: dec!(4_000_000),
                accumulated_depreciation: dec!(1_000_000),
                intangibles: dec!(300_000),
            },
            current_liabilities: CurrentLiabilities {
                suppliers: dec!(700_000),
                taxes_payable: dec!(300_000),
                payroll_obligations: dec!(200_000),
                short_term_loans: dec!(400_000),
                other_obligations: dec!(100_000),
            },
            long_term_liabilities: LongTermLiabilities {
                long_term_loans: dec!(1_300_000),
            },
            equity: EquityAccounts {
                capital: dec!(2_500_000),
                retained_earnings: dec!(500_000),
            },
        }
    }

    fn sample_rates() -> BalanceProjectionRates {
        BalanceProjectionRates {
            depreciation_rates: vec![dec!(0.10); 5],
            capex_to_revenue: vec![dec!(0.08); 5],
            financial_investment_returns: vec![dec!(0.10); 5],
            days_cash: vec![dec!(15); 5],
            days_receivables: vec![dec!(30); 5],
            days_inventory: vec![dec!(45); 5],
            days_other_credits: vec![dec!(3); 5],
            days_suppliers: vec![dec!(36); 5],
            days_taxes_payable: vec![dec!(9); 5],
            days_payroll: vec![dec!(12); 5],
            days_other_obligations: vec![dec!(6); 5],
            short_term_loan_growth: vec![dec!(0.05); 5],
            long_term_loan_growth: vec![dec!(0.10); 5],
            loan_interest_rates: vec![dec!(0.12); 5],
        }
    }

    fn sample_income() -> Vec<IncomeStatementYear> {
        let base = IncomeStatementBase {
            gross_revenue: dec!(10_000_000),
            deductions: Decimal::ZERO,
            cogs: dec!(3_000_000),
            operating_expenses: dec!(5_000_000),
            financial_expenses: dec!(200_000),
            income_tax_rate: dec!(0.34),
            dividends: Decimal::ZERO,
        };
        let rates = IncomeProjectionRates {
            revenue_growth: vec![dec!(0.20), dec!(0.18), dec!(0.15), dec!(0.12), dec!(0.10)],
            deduction_rates: vec![Decimal::ZERO; 5],
            cogs_rates: vec![dec!(0.30); 5],
            operating_expense_rates: vec![dec!(0.45); 5],
            financial_expense_rates: vec![dec!(0.015); 5],
            tax_rates: vec![dec!(0.34); 5],
            dividend_payout_rates: vec![dec!(0.25); 5],
        };
        income::project_all(&base, &rates).unwrap().result
    }

    #[test]
    fn test_base_year_derived_fields() {
        let base = base_year(&sample_base());

        assert_eq!(base.year, 0);
        assert_eq!(base.total_current_assets, dec!(2_500_000));
        assert_eq!(base.total_current_liabilities, dec!(1_700_000));
        assert_eq!(base.working_capital, dec!(800_000));
        assert_eq!(base.ppe_net, dec!(3_000_000));
        assert_eq!(base.total_assets, dec!(6_000_000));
        assert_eq!(base.total_liabilities, dec!(6_000_000));
        assert_eq!(base.depreciation, Decimal::ZERO);
        assert_eq!(base.capex, Decimal::ZERO);
    }

    #[test]
    fn test_base_year_asset_schedule_matches_balancing_total() {
        let base = base_year(&sample_base());
        assert_eq!(base.asset_schedule_total(), dec!(6_000_000));
    }

    #[test]
    fn test_year_one_working_capital_lines() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();
        let y1 = &output.result[1];

        assert_eq!(y1.current_assets.cash, dec!(500_000));
        assert_eq!(y1.current_assets.receivables, dec!(1_000_000));
        assert_eq!(y1.current_assets.inventory, dec!(450_000));
        assert_eq!(y1.current_assets.other_credits, dec!(100_000));
        assert_eq!(y1.current_liabilities.suppliers, dec!(360_000));
        assert_eq!(y1.current_liabilities.taxes_payable, dec!(300_000));
        assert_eq!(y1.current_liabilities.payroll_obligations, dec!(180_000));
        assert_eq!(y1.current_liabilities.other_obligations, dec!(90_000));
    }

    #[test]
    fn test_year_one_ppe_roll_forward() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();
        let y1 = &output.result[1];

        assert_eq!(y1.depreciation, dec!(400_000));
        assert_eq!(y1.capex, dec!(960_000));
        assert_eq!(y1.long_term_assets.ppe_gross, dec!(4_960_000));
        assert_eq!(y1.long_term_assets.accumulated_depreciation, dec!(1_400_000));
        assert_eq!(y1.ppe_net, dec!(3_560_000));
    }

    #[test]
    fn test_year_one_loans_and_financial_investments() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();
        let y1 = &output.result[1];

        assert_eq!(y1.current_liabilities.short_term_loans, dec!(420_000));
        assert_eq!(y1.long_term_liabilities.long_term_loans, dec!(1_430_000));
        assert_eq!(y1.interest_on_loans, dec!(204_000));
        assert_eq!(y1.current_assets.financial_investments, dec!(330_000));
    }

    #[test]
    fn test_year_one_equity_accumulates_net_income() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();
        let y1 = &output.result[1];

        assert_eq!(y1.equity.capital, dec!(2_500_000));
        assert_eq!(y1.equity.retained_earnings, dec!(2_361_200));
        assert_eq!(y1.equity.total(), dec!(4_861_200));
    }

    #[test]
    fn test_year_one_totals_and_working_capital() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();
        let y1 = &output.result[1];

        assert_eq!(y1.total_current_assets, dec!(2_380_000));
        assert_eq!(y1.total_current_liabilities, dec!(1_350_000));
        assert_eq!(y1.working_capital, dec!(1_030_000));
        assert_eq!(y1.working_capital_change, dec!(230_000));
        assert_eq!(y1.total_liabilities, dec!(7_641_200));
        assert_eq!(y1.total_assets, dec!(7_641_200));
    }

    #[test]
    fn test_identity_holds_every_year() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();

        for sheet in &output.result {
            let liabilities_side = sheet.total_current_liabilities
                + sheet.long_term_liabilities.long_term_loans
                + sheet.equity.total();
            assert_eq!(
                sheet.total_assets, liabilities_side,
                "year {} out of balance",
                sheet.year
            );
        }
    }

    #[test]
    fn test_drift_warning_surfaces() {
        let output = project_all(&sample_base(), &sample_income(), &sample_rates()).unwrap();

        assert!(
            output.warnings.iter().any(|w| w.contains("drifts")),
            "expected an asset-schedule drift warning, got {:?}",
            output.warnings
        );
    }

    #[test]
    fn test_empty_income_series_fails() {
        let result = project_all(&sample_base(), &[], &sample_rates());
        assert!(matches!(result, Err(ValuationError::InsufficientData(_))));
    }

    #[test]
    fn test_short_assumption_series_fails() {
        let mut rates = sample_rates();
        rates.days_cash = vec![dec!(15)];
        let result = project_all(&sample_base(), &sample_income(), &rates);

        match result {
            Err(ValuationError::MissingAssumption { field, year }) => {
                assert_eq!(field, "days_cash");
                assert_eq!(year, 2);
            }
            other => panic!("expected MissingAssumption, got {other:?}"),
        }
    }
}
