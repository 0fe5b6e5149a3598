use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::types::{assumption, with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Base-year income statement (DRE) as reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementBase {
    /// Gross revenue before sales taxes and returns
    pub gross_revenue: Money,
    /// Sales taxes and returns deducted from gross revenue
    pub deductions: Money,
    /// Cost of goods sold (CMV)
    pub cogs: Money,
    /// Operating expenses (selling, general, administrative)
    pub operating_expenses: Money,
    /// Net financial expenses
    pub financial_expenses: Money,
    /// Effective IR/CSLL rate for the base year. Signed: a negative rate
    /// models a tax credit.
    pub income_tax_rate: Rate,
    /// Dividends declared in the base year
    pub dividends: Money,
}

/// Per-year projection assumptions. Each series is indexed by projection
/// year (entry 0 drives year 1); the revenue-growth series determines the
/// horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeProjectionRates {
    /// Gross-revenue growth per year
    pub revenue_growth: Vec<Rate>,
    /// Deductions as a share of gross revenue
    pub deduction_rates: Vec<Rate>,
    /// COGS as a share of net revenue
    pub cogs_rates: Vec<Rate>,
    /// Operating expenses as a share of net revenue
    pub operating_expense_rates: Vec<Rate>,
    /// Financial expenses as a share of net revenue
    pub financial_expense_rates: Vec<Rate>,
    /// Effective IR/CSLL rate per year (signed, as in the base year)
    pub tax_rates: Vec<Rate>,
    /// Dividend payout as a share of positive net income
    pub dividend_payout_rates: Vec<Rate>,
}

/// One calculated income-statement year. Year 0 is the base year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementYear {
    pub year: u32,
    pub gross_revenue: Money,
    pub deductions: Money,
    pub revenue: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub operating_expenses: Money,
    pub ebit: Money,
    pub financial_expenses: Money,
    pub pre_tax_income: Money,
    pub taxes: Money,
    pub net_income: Money,
    pub dividends: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assemble the base-year record from reported figures.
///
/// Pure waterfall: net revenue, gross profit, EBIT, pre-tax income, taxes at
/// the base effective rate, net income. Dividends are taken as reported.
pub fn base_year(base: &IncomeStatementBase) -> IncomeStatementYear {
    let revenue = base.gross_revenue - base.deductions;
    let gross_profit = revenue - base.cogs;
    let ebit = gross_profit - base.operating_expenses;
    let pre_tax_income = ebit - base.financial_expenses;
    let taxes = pre_tax_income * base.income_tax_rate;
    let net_income = pre_tax_income - taxes;

    IncomeStatementYear {
        year: 0,
        gross_revenue: base.gross_revenue,
        deductions: base.deductions,
        revenue,
        cogs: base.cogs,
        gross_profit,
        operating_expenses: base.operating_expenses,
        ebit,
        financial_expenses: base.financial_expenses,
        pre_tax_income,
        taxes,
        net_income,
        dividends: base.dividends,
    }
}

/// Project a single year from the previous record and that year's rates.
///
/// `year` is 1-based; rate series are read at `year - 1`. Fails with
/// `MissingAssumption` when any series has no entry for the year. A negative
/// pre-tax income combined with a positive tax rate yields negative taxes (a
/// credit); nothing clamps it. Dividends floor at zero on a loss year.
pub fn project_year(
    previous: &IncomeStatementYear,
    rates: &IncomeProjectionRates,
    year: u32,
) -> ValuationResult<IncomeStatementYear> {
    let growth = assumption(&rates.revenue_growth, "revenue_growth", year)?;
    let deduction_rate = assumption(&rates.deduction_rates, "deduction_rates", year)?;
    let cogs_rate = assumption(&rates.cogs_rates, "cogs_rates", year)?;
    let opex_rate = assumption(
        &rates.operating_expense_rates,
        "operating_expense_rates",
        year,
    )?;
    let financial_rate = assumption(
        &rates.financial_expense_rates,
        "financial_expense_rates",
        year,
    )?;
    let tax_rate = assumption(&rates.tax_rates, "tax_rates", year)?;
    let payout = assumption(&rates.dividend_payout_rates, "dividend_payout_rates", year)?;

    let gross_revenue = previous.gross_revenue * (Decimal::ONE + growth);
    let deductions = gross_revenue * deduction_rate;
    let revenue = gross_revenue - deductions;
    let cogs = revenue * cogs_rate;
    let gross_profit = revenue - cogs;
    let operating_expenses = revenue * opex_rate;
    let ebit = gross_profit - operating_expenses;
    let financial_expenses = revenue * financial_rate;
    let pre_tax_income = ebit - financial_expenses;
    let taxes = pre_tax_income * tax_rate;
    let net_income = pre_tax_income - taxes;
    let dividends = if net_income > Decimal::ZERO {
        net_income * payout
    } else {
        Decimal::ZERO
    };

    Ok(IncomeStatementYear {
        year,
        gross_revenue,
        deductions,
        revenue,
        cogs,
        gross_profit,
        operating_expenses,
        ebit,
        financial_expenses,
        pre_tax_income,
        taxes,
        net_income,
        dividends,
    })
}

/// Project the full DRE horizon: the base year plus one record per entry in
/// the revenue-growth series.
pub fn project_all(
    base: &IncomeStatementBase,
    rates: &IncomeProjectionRates,
) -> ValuationResult<ComputationOutput<Vec<IncomeStatementYear>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if rates.revenue_growth.is_empty() {
        return Err(ValuationError::InsufficientData(
            "Projection requires at least one revenue growth rate".to_string(),
        ));
    }

    let n_years = rates.revenue_growth.len() as u32;
    let mut statements = Vec::with_capacity(n_years as usize + 1);
    let mut previous = base_year(base);
    statements.push(previous.clone());

    for year in 1..=n_years {
        let current = project_year(&previous, rates, year)?;
        if current.net_income < Decimal::ZERO {
            warnings.push(format!(
                "Year {year}: projected net income is negative ({})",
                current.net_income
            ));
        }
        previous = current.clone();
        statements.push(current);
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Rate-Driven Income Statement (DRE) Projection",
        &serde_json::json!({ "base": base, "rates": rates }),
        warnings,
        elapsed,
        statements,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
