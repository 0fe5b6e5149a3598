use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::statements::balance::BalanceSheetYear;
use crate::statements::income::IncomeStatementYear;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

/// Free cash flow to firm for a single projection year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcffYear {
    pub year: u32,
    pub ebit: Money,
    pub taxes_on_ebit: Money,
    pub nopat: Money,
    pub depreciation: Money,
    pub capex: Money,
    pub working_capital_change: Money,
    pub fcff: Money,
}

/// Derive one year's FCFF from the paired income year and the two bracketing
/// balance sheets.
///
/// Taxes on EBIT use the year's implied rate (taxes over pre-tax income, zero
/// when pre-tax income is zero). CAPEX is recovered from the net PP&E
/// roll-forward rather than read off the balance sheet; the two agree
/// whenever the sheets come from this engine's own projection.
pub fn derive_year(
    income_year: &IncomeStatementYear,
    balance_year: &BalanceSheetYear,
    balance_previous: &BalanceSheetYear,
) -> FcffYear {
    let implied_tax_rate: Rate = if income_year.pre_tax_income.is_zero() {
        Decimal::ZERO
    } else {
        income_year.taxes / income_year.pre_tax_income
    };

    let taxes_on_ebit = income_year.ebit * implied_tax_rate;
    let nopat = income_year.ebit - taxes_on_ebit;

    let depreciation = balance_year.depreciation;
    let capex = balance_year.ppe_net - balance_previous.ppe_net + depreciation;

    let working_capital_change =
        net_working_capital(balance_year) - net_working_capital(balance_previous);

    let fcff = nopat + depreciation - capex - working_capital_change;

    FcffYear {
        year: income_year.year,
        ebit: income_year.ebit,
        taxes_on_ebit,
        nopat,
        depreciation,
        capex,
        working_capital_change,
        fcff,
    }
}

/// Derive the FCFF series for a projected company: one record per year from
/// year 1 on (the base year brackets the first flow but yields none itself).
pub fn derive_all(
    income_statements: &[IncomeStatementYear],
    balance_sheets: &[BalanceSheetYear],
) -> ValuationResult<ComputationOutput<Vec<FcffYear>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if income_statements.len() != balance_sheets.len() {
        return Err(ValuationError::InvalidInput {
            field: "balance_sheets".to_string(),
            reason: format!(
                "Length {} does not match income-statement length {}",
                balance_sheets.len(),
                income_statements.len()
            ),
        });
    }
    if income_statements.len() < 2 {
        return Err(ValuationError::InsufficientData(
            "FCFF derivation requires the base year plus at least one projection year".to_string(),
        ));
    }

    let mut series = Vec::with_capacity(income_statements.len() - 1);
    for i in 1..income_statements.len() {
        let flow = derive_year(
            &income_statements[i],
            &balance_sheets[i],
            &balance_sheets[i - 1],
        );
        if flow.capex != balance_sheets[i].capex {
            warnings.push(format!(
                "Year {}: CAPEX recovered from the PP&E roll ({}) differs from the balance sheet's CAPEX ({})",
                flow.year, flow.capex, balance_sheets[i].capex
            ));
        }
        if flow.fcff < Decimal::ZERO {
            warnings.push(format!("Year {}: negative FCFF ({})", flow.year, flow.fcff));
        }
        series.push(flow);
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCFF from NOPAT with PP&E Roll-Forward CAPEX Recovery",
        &serde_json::json!({
            "income_years": income_statements.len(),
            "balance_years": balance_sheets.len(),
        }),
        warnings,
        elapsed,
        series,
    ))
}

/// Net working-capital requirement: receivables plus inventory, net of
/// supplier payables.
fn net_working_capital(sheet: &BalanceSheetYear) -> Money {
    sheet.current_assets.receivables + sheet.current_assets.inventory
        - sheet.current_liabilities.suppliers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::balance::{
        CurrentAssets, CurrentLiabilities, EquityAccounts, LongTermAssets, LongTermLiabilities,
    };
    use rust_decimal_macros::dec;

    fn income_rec(
        year: u32,
        ebit: Decimal,
        pre_tax: Decimal,
        taxes: Decimal,
    ) -> IncomeStatementYear {
        IncomeStatementYear {
            year,
            gross_revenue: Decimal::ZERO,
            deductions: Decimal::ZERO,
            revenue: Decimal::ZERO,
            cogs: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            operating_expenses: Decimal::ZERO,
            ebit,
            financial_expenses: Decimal::ZERO,
            pre_tax_income: pre_tax,
            taxes,
            net_income: pre_tax - taxes,
            dividends: Decimal::ZERO,
        }
    }

    fn balance_rec(
        year: u32,
        ppe_net: Decimal,
        depreciation: Decimal,
        capex: Decimal,
        receivables: Decimal,
        inventory: Decimal,
        suppliers: Decimal,
    ) -> BalanceSheetYear {
        BalanceSheetYear {
            year,
            current_assets: CurrentAssets {
                cash: Decimal::ZERO,
                financial_investments: Decimal::ZERO,
                receivables,
                inventory,
                other_credits: Decimal::ZERO,
            },
            long_term_assets: LongTermAssets {
                investments: Decimal::ZERO,
                ppe_gross: ppe_net,
                accumulated_depreciation: Decimal::ZERO,
                intangibles: Decimal::ZERO,
            },
            current_liabilities: CurrentLiabilities {
                suppliers,
                taxes_payable: Decimal::ZERO,
                payroll_obligations: Decimal::ZERO,
                short_term_loans: Decimal::ZERO,
                other_obligations: Decimal::ZERO,
            },
            long_term_liabilities: LongTermLiabilities {
                long_term_loans: Decimal::ZERO,
            },
            equity: EquityAccounts {
                capital: Decimal::ZERO,
                retained_earnings: Decimal::ZERO,
            },
            ppe_net,
            depreciation,
            capex,
            interest_on_loans: Decimal::ZERO,
            working_capital: Decimal::ZERO,
            working_capital_change: Decimal::ZERO,
            total_current_assets: Decimal::ZERO,
            total_current_liabilities: Decimal::ZERO,
            total_assets: Decimal::ZERO,
            total_liabilities: Decimal::ZERO,
        }
    }

    fn bare_balance(
        year: u32,
        ppe_net: Decimal,
        depreciation: Decimal,
        capex: Decimal,
    ) -> BalanceSheetYear {
        balance_rec(
            year,
            ppe_net,
            depreciation,
            capex,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        )
    }

    #[test]
    fn test_single_year_decomposition() {
        let income = income_rec(1, dec!(1_000), dec!(900), dec!(306));
        let prev = balance_rec(
            0,
            dec!(5_000),
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(800),
            dec!(400),
            dec!(600),
        );
        let cur = balance_rec(
            1,
            dec!(5_400),
            dec!(300),
            dec!(700),
            dec!(900),
            dec!(450),
            dec!(650),
        );

        let flow = derive_year(&income, &cur, &prev);

        assert_eq!(flow.taxes_on_ebit, dec!(340));
        assert_eq!(flow.nopat, dec!(660));
        assert_eq!(flow.capex, dec!(700));
        assert_eq!(flow.working_capital_change, dec!(100));
        assert_eq!(flow.fcff, dec!(160));
    }

    #[test]
    fn test_zero_pre_tax_income_implies_zero_tax_rate() {
        let income = income_rec(1, dec!(500), Decimal::ZERO, dec!(50));
        let prev = bare_balance(0, dec!(1_000), Decimal::ZERO, Decimal::ZERO);
        let cur = bare_balance(1, dec!(1_000), Decimal::ZERO, Decimal::ZERO);

        let flow = derive_year(&income, &cur, &prev);

        assert_eq!(flow.taxes_on_ebit, Decimal::ZERO);
        assert_eq!(flow.nopat, dec!(500));
    }

    #[test]
    fn test_length_one_series_fails() {
        let income = vec![income_rec(0, dec!(100), dec!(100), dec!(34))];
        let balance = vec![bare_balance(0, dec!(1_000), Decimal::ZERO, Decimal::ZERO)];

        let result = derive_all(&income, &balance);
        assert!(matches!(result, Err(ValuationError::InsufficientData(_))));
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let income = vec![
            income_rec(0, dec!(100), dec!(100), dec!(34)),
            income_rec(1, dec!(110), dec!(110), dec!(37.4)),
        ];
        let balance = vec![bare_balance(0, dec!(1_000), Decimal::ZERO, Decimal::ZERO)];

        let result = derive_all(&income, &balance);
        assert!(matches!(result, Err(ValuationError::InvalidInput { .. })));
    }

    #[test]
    fn test_series_starts_at_year_one() {
        let income = vec![
            income_rec(0, dec!(100), dec!(100), dec!(34)),
            income_rec(1, dec!(110), dec!(110), dec!(37.4)),
            income_rec(2, dec!(121), dec!(121), dec!(41.14)),
        ];
        let balance = vec![
            bare_balance(0, dec!(1_000), Decimal::ZERO, Decimal::ZERO),
            bare_balance(1, dec!(1_000), dec!(50), dec!(50)),
            bare_balance(2, dec!(1_000), dec!(50), dec!(50)),
        ];

        let output = derive_all(&income, &balance).unwrap();

        assert_eq!(output.result.len(), 2);
        assert_eq!(output.result[0].year, 1);
        assert_eq!(output.result[1].year, 2);
    }

    #[test]
    fn test_fcff_identity_holds() {
        let income = vec![
            income_rec(0, dec!(100), dec!(90), dec!(30.6)),
            income_rec(1, dec!(120), dec!(108), dec!(36.72)),
        ];
        let balance = vec![
            balance_rec(
                0,
                dec!(1_000),
                Decimal::ZERO,
                Decimal::ZERO,
                dec!(80),
                dec!(40),
                dec!(60),
            ),
            balance_rec(1, dec!(1_040), dec!(60), dec!(100), dec!(90), dec!(45), dec!(65)),
        ];

        let output = derive_all(&income, &balance).unwrap();
        for flow in &output.result {
            assert_eq!(
                flow.fcff,
                flow.nopat + flow.depreciation - flow.capex - flow.working_capital_change
            );
        }
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    }

    #[test]
    fn test_negative_fcff_warns() {
        let income = vec![
            income_rec(0, dec!(100), dec!(90), dec!(30.6)),
            income_rec(1, dec!(100), dec!(90), dec!(30.6)),
        ];
        let balance = vec![
            bare_balance(0, dec!(1_000), Decimal::ZERO, Decimal::ZERO),
            bare_balance(1, dec!(1_500), dec!(100), dec!(600)),
        ];

        let output = derive_all(&income, &balance).unwrap();

        assert!(output.result[0].fcff < Decimal::ZERO);
        assert!(output.warnings.iter().any(|w| w.contains("negative FCFF")));
    }
}
