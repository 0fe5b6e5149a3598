use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn execute_valuation(input_json: String) -> NapiResult<String> {
    let input: valuation_core::engine::FullValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation_core::engine::execute(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn quick_valuation(input_json: String) -> NapiResult<String> {
    let input: valuation_core::engine::QuickValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation_core::engine::execute_quick(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn wacc(input_json: String) -> NapiResult<String> {
    let input: valuation_core::valuation::wacc::WaccInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation_core::valuation::wacc::calculate_wacc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct UnivariateSweepInput {
    #[serde(flatten)]
    input: valuation_core::engine::FullValuationInput,
    variable: valuation_core::sensitivity::SweepVariable,
    range: valuation_core::sensitivity::SweepRange,
}

#[napi]
pub fn sensitivity_univariate(input_json: String) -> NapiResult<String> {
    let sweep: UnivariateSweepInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let values = sweep.range.sweep_values().map_err(to_napi_error)?;
    let output = valuation_core::sensitivity::univariate(&sweep.input, sweep.variable, &values)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct BivariateSweepInput {
    #[serde(flatten)]
    input: valuation_core::engine::FullValuationInput,
    variable_1: valuation_core::sensitivity::SweepVariable,
    range_1: valuation_core::sensitivity::SweepRange,
    variable_2: valuation_core::sensitivity::SweepVariable,
    range_2: valuation_core::sensitivity::SweepRange,
}

#[napi]
pub fn sensitivity_bivariate(input_json: String) -> NapiResult<String> {
    let sweep: BivariateSweepInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let values_1 = sweep.range_1.sweep_values().map_err(to_napi_error)?;
    let values_2 = sweep.range_2.sweep_values().map_err(to_napi_error)?;
    let output = valuation_core::sensitivity::bivariate(
        &sweep.input,
        sweep.variable_1,
        &values_1,
        sweep.variable_2,
        &values_2,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[napi]
pub fn engine_version() -> String {
    valuation_core::VERSION.to_string()
}
