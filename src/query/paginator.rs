//! Page/page-size/ordering normalization for list requests.

use crate::error::AppError;
use std::collections::{HashMap, HashSet};

/// Query parameters consumed by the paginator; never treated as field filters.
pub const PAGINATION_PARAMS: &[&str] = &["page", "page_size", "show_total", "order_by"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginatorConfig {
    pub page_size_default: u32,
    /// Ceiling applied to any requested page size.
    pub page_size_max: u32,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        PaginatorConfig {
            page_size_default: 10,
            page_size_max: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub direction: OrderDirection,
}

impl Ordering {
    /// `-name` sorts descending on `name`; anything else ascending.
    pub fn parse(token: &str) -> Option<Self> {
        let (field, direction) = match token.strip_prefix('-') {
            Some(rest) => (rest, OrderDirection::Desc),
            None => (token, OrderDirection::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Ordering {
            field: field.to_string(),
            direction,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paginator {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub show_total: bool,
    pub order_by: Vec<Ordering>,
}

impl Paginator {
    pub fn normalize(
        config: &PaginatorConfig,
        page: Option<i64>,
        page_size: Option<i64>,
        show_total: bool,
        order_by: &[&str],
    ) -> Self {
        let page = page.filter(|p| *p > 0).map(|p| p.min(u32::MAX as i64) as u32).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s > 0)
            .map(|s| s.min(u32::MAX as i64) as u32)
            .unwrap_or(config.page_size_default)
            .min(config.page_size_max);
        let mut seen = HashSet::new();
        let order_by = order_by
            .iter()
            .copied()
            .map(str::trim)
            .filter(|t| seen.insert(*t))
            .filter_map(Ordering::parse)
            .collect();
        Paginator {
            page,
            page_size,
            show_total,
            order_by,
        }
    }

    /// Read `page`, `page_size`, `show_total` (default true) and comma-separated `order_by`.
    pub fn from_query(config: &PaginatorConfig, params: &HashMap<String, String>) -> Result<Self, AppError> {
        let page = parse_int(params, "page")?;
        let page_size = parse_int(params, "page_size")?;
        let show_total = match params.get("show_total").map(|s| s.trim().to_lowercase()) {
            None => true,
            Some(s) if s.is_empty() => true,
            Some(s) => match s.as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => return Err(AppError::BadRequest(format!("show_total must be a boolean, got '{}'", s))),
            },
        };
        let order_by: Vec<&str> = params
            .get("order_by")
            .map(|s| s.split(',').filter(|t| !t.trim().is_empty()).collect())
            .unwrap_or_default();
        Ok(Self::normalize(config, page, page_size, show_total, &order_by))
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

fn parse_int(params: &HashMap<String, String>, key: &str) -> Result<Option<i64>, AppError> {
    match params.get(key).map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be an integer, got '{}'", key, s))),
    }
}
