use serde_json::Value;
use std::io;

use super::find_schedule;

/// Write output as CSV to stdout.
///
/// Results carrying a schedule are written one installment per row;
/// everything else as a two-column field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value.get("result").unwrap_or(value);
    let nested_schedule = result
        .get("schedule")
        .and_then(|s| s.get("schedule"))
        .and_then(Value::as_array);

    if let Some(entries) = find_schedule(result).or(nested_schedule) {
        write_rows(&mut wtr, entries);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
        }
    } else if let Value::Array(arr) = result {
        write_rows(&mut wtr, arr);
    } else {
        let _ = wtr.write_record([&format_csv_value(result)]);
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let mut headers = vec!["index".to_string()];
    headers.extend(first.keys().cloned());
    let _ = wtr.write_record(&headers);

    for (i, item) in arr.iter().enumerate() {
        if let Value::Object(map) = item {
            let mut row = vec![i.to_string()];
            row.extend(
                headers[1..]
                    .iter()
                    .map(|h| map.get(h).map(format_csv_value).unwrap_or_default()),
            );
            let _ = wtr.write_record(&row);
        }
    }
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
