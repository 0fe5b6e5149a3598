//! Financial-statement projectors: the income statement (DRE) drives the
//! balance sheet year by year.

pub mod balance;
pub mod income;
