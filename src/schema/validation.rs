//! Per-field constraint checks applied after coercion.

use crate::config::FieldRules;
use crate::error::AppError;
use serde_json::Value;

pub fn check_rules(field: &str, v: &Value, rules: &FieldRules) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rules.format {
        check_format(field, v, format)?;
    }
    if let (Some(max), Some(s)) = (rules.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            return Err(AppError::Validation(format!("{} must be at most {} characters", field, max)));
        }
    }
    if let (Some(min), Some(s)) = (rules.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            return Err(AppError::Validation(format!("{} must be at least {} characters", field, min)));
        }
    }
    if let (Some(re), Some(s)) = (&rules.pattern, v.as_str()) {
        if !re.is_match(s) {
            return Err(AppError::Validation(format!("{} does not match required pattern", field)));
        }
    }
    if let Some(allowed) = &rules.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let (Some(min), Some(n)) = (rules.minimum, v.as_f64()) {
        if n < min {
            return Err(AppError::Validation(format!("{} must be at least {}", field, min)));
        }
    }
    if let (Some(max), Some(n)) = (rules.maximum, v.as_f64()) {
        if n > max {
            return Err(AppError::Validation(format!("{} must be at most {}", field, max)));
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" => {
            let valid = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                .unwrap_or(false);
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", field)));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(AppError::Validation(format!("{} must be a valid UUID", field)));
            }
        }
        _ => {}
    }
    Ok(())
}
