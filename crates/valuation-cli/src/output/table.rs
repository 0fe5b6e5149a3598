use serde_json::Value;
use tabled::{Table, builder::Builder};

/// Render the output envelope as tables: scalar fields as field/value rows,
/// year arrays as one row per record, sensitivity grids as a matrix.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_warnings(map);
                print_methodology(map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => print_record_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Object(map) if map.contains_key("grid") => print_grid(map),
        Value::Object(map) if map.contains_key("enterprise_values") => print_sweep(map),
        Value::Object(map) => {
            let scalars: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(_, v)| !v.is_object() && !is_record_array(v))
                .collect();
            if !scalars.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in &scalars {
                    builder.push_record(vec![key.to_string(), format_value(val)]);
                }
                println!("{}", Table::from(builder));
            }

            for (key, val) in map {
                if is_record_array(val) {
                    println!("\n{}:", key);
                    print_record_table(val.as_array().map(Vec::as_slice).unwrap_or_default());
                } else if val.is_object() {
                    println!("\n{}:", key);
                    print_result(val);
                }
            }
        }
        Value::Array(arr) => print_record_table(arr),
        other => println!("{}", other),
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record(vec![key.to_string(), format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_record_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn print_sweep(map: &serde_json::Map<String, Value>) {
    let variable = map
        .get("variable")
        .and_then(Value::as_str)
        .unwrap_or("value");
    let values = map
        .get("values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let enterprise_values = map
        .get("enterprise_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut builder = Builder::default();
    builder.push_record(vec![variable.to_string(), "enterprise_value".to_string()]);
    for (value, ev) in values.iter().zip(enterprise_values.iter()) {
        builder.push_record(vec![format_value(value), format_value(ev)]);
    }
    println!("{}", Table::from(builder));
}

fn print_grid(map: &serde_json::Map<String, Value>) {
    let variable_1 = map
        .get("variable_1")
        .and_then(Value::as_str)
        .unwrap_or("variable_1");
    let variable_2 = map
        .get("variable_2")
        .and_then(Value::as_str)
        .unwrap_or("variable_2");
    let values_1 = map
        .get("values_1")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let values_2 = map
        .get("values_2")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let grid = map
        .get("grid")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut builder = Builder::default();
    let mut header = vec![format!("{} \\ {}", variable_1, variable_2)];
    header.extend(values_2.iter().map(format_value));
    builder.push_record(header);

    for (i, row) in grid.iter().enumerate() {
        let mut record = vec![values_1.get(i).map(format_value).unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_value));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_warnings(envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }
}

fn print_methodology(envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// An array whose elements are objects renders as a row-per-record table.
fn is_record_array(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|arr| arr.first())
        .map(Value::is_object)
        .unwrap_or(false)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
