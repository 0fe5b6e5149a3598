//! Cost of capital and enterprise valuation.

pub mod dcf;
pub mod wacc;
