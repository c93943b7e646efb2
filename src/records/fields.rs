//! Tolerant field access on raw JSON rows.
//!
//! Different endpoints serialize the same column as `task_no`, `taskNo`,
//! `TASK_NO` or `TaskNo`. Every lookup here takes canonical snake_case names
//! and tries all casings of each, in order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

fn casings(name: &str) -> [String; 4] {
    let mut camel = String::with_capacity(name.len());
    let mut pascal = String::with_capacity(name.len());
    let mut upper_next = false;
    for (i, c) in name.chars().enumerate() {
        if c == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            camel.extend(c.to_uppercase());
            pascal.extend(c.to_uppercase());
            upper_next = false;
        } else {
            camel.push(c);
            if i == 0 {
                pascal.extend(c.to_uppercase());
            } else {
                pascal.push(c);
            }
        }
    }
    [name.to_string(), camel, name.to_uppercase(), pascal]
}

/// First non-null value under any of the names, in any casing.
pub fn lookup<'a>(row: &'a Value, names: &[&str]) -> Option<&'a Value> {
    let object = row.as_object()?;
    names
        .iter()
        .flat_map(|name| casings(name))
        .filter_map(|key| object.get(&key))
        .find(|v| !v.is_null())
}

pub fn text(row: &Value, names: &[&str]) -> Option<String> {
    match lookup(row, names)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

pub fn number(row: &Value, names: &[&str]) -> Option<f64> {
    match lookup(row, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

pub fn integer(row: &Value, names: &[&str]) -> Option<i64> {
    match lookup(row, names)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn boolean(row: &Value, names: &[&str]) -> Option<bool> {
    match lookup(row, names)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "active" => Some(true),
            "false" | "no" | "n" | "0" | "inactive" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn date(row: &Value, names: &[&str]) -> Option<NaiveDate> {
    match lookup(row, names)? {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    ["%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
