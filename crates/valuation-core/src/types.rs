use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Reporting currency of a valuation. Purely descriptive; the engine never
/// converts between currencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    BRL,
    USD,
    EUR,
    Other(String),
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Fetch one year's value from a per-year assumption series.
///
/// `year` is the 1-based projection year the caller is building; the series
/// is indexed at `year - 1`.
pub(crate) fn assumption(
    series: &[Decimal],
    field: &str,
    year: u32,
) -> Result<Decimal, ValuationError> {
    (year as usize)
        .checked_sub(1)
        .and_then(|idx| series.get(idx))
        .copied()
        .ok_or_else(|| ValuationError::MissingAssumption {
            field: field.to_string(),
            year,
        })
}
