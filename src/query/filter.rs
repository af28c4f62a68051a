//! Query-string filter grammar: an optional bracketed operator prefix, then the operand.
//!
//! `[=] [<=] [<] [>] [>=]` compare, `[!] [!=] [<>]` negate, `[*] [!*]` test membership of a
//! comma-separated set, `[~] [!~]` pattern match, `[-]` a two-sided comma-separated range.
//! A value without a prefix is an equality test.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Le,
    Lt,
    Gt,
    Ge,
    Ne,
    In,
    NotIn,
    Like,
    NotLike,
    Between,
}

impl FilterOp {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => FilterOp::Eq,
            "<=" => FilterOp::Le,
            "<" => FilterOp::Lt,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Ge,
            "!" | "!=" | "<>" => FilterOp::Ne,
            "*" => FilterOp::In,
            "!*" => FilterOp::NotIn,
            "~" => FilterOp::Like,
            "!~" => FilterOp::NotLike,
            "-" => FilterOp::Between,
            _ => return None,
        })
    }

    /// SQL comparison operator for the single-operand forms.
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Le => "<=",
            FilterOp::Lt => "<",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Ne => "<>",
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT IN",
            FilterOp::Like => "LIKE",
            FilterOp::NotLike => "NOT LIKE",
            FilterOp::Between => "BETWEEN",
        }
    }
}

/// One parsed constraint on a field. `operands` holds one value, except for
/// membership (one or more) and range (exactly two).
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub op: FilterOp,
    pub operands: Vec<Value>,
}

fn operator_prefix() -> &'static Regex {
    static OPERATOR: OnceLock<Regex> = OnceLock::new();
    OPERATOR.get_or_init(|| {
        Regex::new(r"^\[(=|<=|<|>|>=|!|!=|<>|\*|!\*|~|!~|-)\]").expect("operator pattern is valid")
    })
}

/// Parse one raw query value. `Ok(None)` means no constraint on the field.
/// Operands are coerced with `coerce`, except pattern operands which stay strings.
pub fn parse_filter<E, F>(raw: &str, coerce: F) -> Result<Option<Filter>, E>
where
    F: Fn(&str) -> Result<Value, E>,
{
    if raw.is_empty() {
        return Ok(None);
    }
    let Some(caps) = operator_prefix().captures(raw) else {
        return Ok(Some(Filter {
            op: FilterOp::Eq,
            operands: vec![coerce(raw)?],
        }));
    };
    let token = &caps[1];
    let Some(op) = FilterOp::from_token(token) else {
        return Ok(None);
    };
    let payload = &raw[caps[0].len()..];
    if payload.is_empty() {
        return Ok(None);
    }

    let operands = match op {
        FilterOp::Like | FilterOp::NotLike => {
            if payload.contains('%') {
                vec![Value::String(payload.to_string())]
            } else {
                vec![Value::String(format!("%{}%", payload))]
            }
        }
        FilterOp::In | FilterOp::NotIn => {
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for item in payload.split(',') {
                if seen.insert(item) {
                    out.push(coerce(item)?);
                }
            }
            out
        }
        FilterOp::Between => {
            let bounds: Vec<&str> = payload.split(',').take(2).collect();
            if bounds.len() < 2 {
                return Ok(None);
            }
            vec![coerce(bounds[0])?, coerce(bounds[1])?]
        }
        _ => vec![coerce(payload)?],
    };
    Ok(Some(Filter { op, operands }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_int(s: &str) -> Result<Value, String> {
        s.parse::<i64>().map(Value::from).map_err(|e| e.to_string())
    }

    fn as_text(s: &str) -> Result<Value, String> {
        Ok(Value::String(s.to_string()))
    }

    #[test]
    fn like_wraps_plain_payload() {
        let f = parse_filter("[~]abc", as_text).unwrap().unwrap();
        assert_eq!(f.op, FilterOp::Like);
        assert_eq!(f.operands, vec![json!("%abc%")]);

        let f = parse_filter("[!~]ab%", as_text).unwrap().unwrap();
        assert_eq!(f.op, FilterOp::NotLike);
        assert_eq!(f.operands, vec![json!("ab%")]);
    }

    #[test]
    fn membership_deduplicates() {
        let f = parse_filter("[*]1,2,2", as_int).unwrap().unwrap();
        assert_eq!(f.op, FilterOp::In);
        assert_eq!(f.operands, vec![json!(1), json!(2)]);

        let f = parse_filter("[!*]3", as_int).unwrap().unwrap();
        assert_eq!(f.op, FilterOp::NotIn);
        assert_eq!(f.operands, vec![json!(3)]);
    }

    #[test]
    fn single_sided_range_is_no_filter() {
        assert_eq!(parse_filter("[-]5", as_int).unwrap(), None);
        let f = parse_filter("[-]1,9,12", as_int).unwrap().unwrap();
        assert_eq!(f.op, FilterOp::Between);
        assert_eq!(f.operands, vec![json!(1), json!(9)]);
    }

    #[test]
    fn empty_values_are_no_filter() {
        assert_eq!(parse_filter("", as_int).unwrap(), None);
        assert_eq!(parse_filter("[>=]", as_int).unwrap(), None);
        assert_eq!(parse_filter("[~]", as_text).unwrap(), None);
    }

    #[test]
    fn comparison_tokens() {
        let cases = [
            ("[=]4", FilterOp::Eq),
            ("[<=]4", FilterOp::Le),
            ("[<]4", FilterOp::Lt),
            ("[>]4", FilterOp::Gt),
            ("[>=]4", FilterOp::Ge),
            ("[!]4", FilterOp::Ne),
            ("[!=]4", FilterOp::Ne),
            ("[<>]4", FilterOp::Ne),
        ];
        for (raw, op) in cases {
            let f = parse_filter(raw, as_int).unwrap().unwrap();
            assert_eq!(f.op, op, "{}", raw);
            assert_eq!(f.operands, vec![json!(4)]);
        }
    }

    #[test]
    fn unprefixed_value_is_equality() {
        let f = parse_filter("[x]y", as_text).unwrap().unwrap();
        assert_eq!(f.op, FilterOp::Eq);
        assert_eq!(f.operands, vec![json!("[x]y")]);
    }

    #[test]
    fn coercion_errors_propagate() {
        assert!(parse_filter("[*]1,two", as_int).is_err());
        assert!(parse_filter("seven", as_int).is_err());
    }
}
