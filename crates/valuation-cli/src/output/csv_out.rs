use serde_json::Value;
use std::io;

/// Write output as CSV to stdout. Composite results (statement arrays,
/// sensitivity grids) flatten to one section per table; records vary in
/// width, so the writer runs in flexible mode.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                write_result(&mut wtr, result);
            } else {
                write_flat_object(&mut wtr, map);
            }
        }
        Value::Array(arr) => {
            write_record_rows(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_result(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Value) {
    match result {
        Value::Object(map) if map.contains_key("grid") => write_grid(wtr, map),
        Value::Object(map) if map.contains_key("enterprise_values") => write_sweep(wtr, map),
        Value::Object(map) => {
            let scalars: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(_, v)| !v.is_object() && !is_record_array(v))
                .collect();
            if !scalars.is_empty() {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in &scalars {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }

            for (key, val) in map {
                if let Some(arr) = val.as_array() {
                    if is_record_array(val) {
                        let _ = wtr.write_record([key.as_str()]);
                        write_record_rows(wtr, arr);
                    }
                } else if val.is_object() {
                    let _ = wtr.write_record([key.as_str()]);
                    write_result(wtr, val);
                }
            }
        }
        Value::Array(arr) => write_record_rows(wtr, arr),
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }
}

fn write_flat_object(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    map: &serde_json::Map<String, Value>,
) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_record_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn write_sweep(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &serde_json::Map<String, Value>) {
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

    let _ = wtr.write_record([variable, "enterprise_value"]);
    for (value, ev) in values.iter().zip(enterprise_values.iter()) {
        let _ = wtr.write_record([&format_csv_value(value), &format_csv_value(ev)]);
    }
}

fn write_grid(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &serde_json::Map<String, Value>) {
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

    let mut header = vec![format!("{}/{}", variable_1, variable_2)];
    header.extend(values_2.iter().map(format_csv_value));
    let _ = wtr.write_record(&header);

    for (i, row) in grid.iter().enumerate() {
        let mut record = vec![values_1.get(i).map(format_csv_value).unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn is_record_array(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|arr| arr.first())
        .map(Value::is_object)
        .unwrap_or(false)
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
