use serde_json::Value;

/// Headline keys, printed one per line when present.
const HEADLINE_KEYS: [&str; 5] = [
    "enterprise_value",
    "equity_value",
    "price_per_share",
    "wacc",
    "wacc_used",
];

/// Print just the headline values from the output.
///
/// Looks for the well-known valuation keys at the top of the result and
/// inside a nested `valuation` section, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result {
        let mut printed = false;
        for key in &HEADLINE_KEYS {
            if let Some(val) = lookup(map, key) {
                if !val.is_null() {
                    println!("{}: {}", key, format_minimal(val));
                    printed = true;
                }
            }
        }
        if printed {
            return;
        }

        // CAPM output has no valuation keys
        if let Some(val) = map.get("cost_of_equity") {
            println!("cost_of_equity: {}", format_minimal(val));
            return;
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result));
}

/// Check the result itself, then its nested `valuation` section.
fn lookup<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.get("valuation")
            .and_then(Value::as_object)
            .and_then(|v| v.get(key))
    })
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
