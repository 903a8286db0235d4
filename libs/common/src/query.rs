//! Query feature pipeline
//!
//! Translates a raw HTTP query-parameter mapping into a bounded fetch
//! plan: filter, keyword search, field projection, multi-key sort and
//! skip/limit pagination, plus a pagination summary derived from a
//! caller-supplied total count.
//!
//! Every input is optional and individually defaulted — malformed
//! numeric values fall back to their defaults, no error is raised.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::store::{Cmp, Filter, Projection, SortKey};

/// Parameter keys consumed by the pipeline itself; everything else is a
/// filter predicate.
const RESERVED_KEYS: [&str; 5] = ["page", "limit", "sort", "fields", "keyword"];

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 5;

/// Which fields a keyword search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    /// Products: match `title` or `description`.
    TitleDescription,
    /// Every other resource: match `name`.
    Name,
}

/// Derived pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaginationSummary {
    pub current_page: u64,
    pub limit: u64,
    pub number_of_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<u64>,
}

/// Builder that accumulates the fetch plan. Stages are applied in a
/// fixed order: filter, search, field projection, sort, paginate.
#[derive(Debug, Clone)]
pub struct QueryFeatures {
    params: HashMap<String, String>,
    pub filter: Filter,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: u64,
    pub pagination: Option<PaginationSummary>,
}

impl QueryFeatures {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self {
            params,
            filter: Filter::new(),
            projection: Projection::Default,
            sort: Vec::new(),
            skip: 0,
            limit: 0,
            pagination: None,
        }
    }

    /// Turn the non-reserved parameters into filter conditions. Keys of
    /// the form `field[gte|gt|lte|lt]` become comparison predicates;
    /// any other key — including unrecognized operator suffixes — is an
    /// exact-match predicate on the literal key.
    pub fn filter(mut self) -> Self {
        for (key, raw) in &self.params {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let value = parse_param_value(raw);
            match split_operator(key) {
                Some((field, op)) => {
                    self.filter = self.filter.cond(field, op, value);
                }
                None => {
                    self.filter = self.filter.cond(key.clone(), Cmp::Eq, value);
                }
            }
        }
        self
    }

    /// Add a case-insensitive keyword predicate when `keyword` is
    /// present, OR-combined across the target's search fields.
    pub fn search(mut self, target: SearchTarget) -> Self {
        if let Some(keyword) = self.params.get("keyword").cloned() {
            match target {
                SearchTarget::TitleDescription => {
                    self.filter = self
                        .filter
                        .or("title", Cmp::Contains, keyword.clone())
                        .or("description", Cmp::Contains, keyword);
                }
                SearchTarget::Name => {
                    self.filter = self.filter.or("name", Cmp::Contains, keyword);
                }
            }
        }
        self
    }

    /// Restrict returned attributes to the comma-separated `fields`
    /// list; default keeps everything but the internal revision field.
    pub fn limit_fields(mut self) -> Self {
        if let Some(raw) = self.params.get("fields") {
            let fields: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
            if !fields.is_empty() {
                self.projection = Projection::Include(fields);
            }
        }
        self
    }

    /// Parse the comma-separated `sort` parameter (`-` prefix for
    /// descending); default is newest first.
    pub fn sort(mut self) -> Self {
        let keys: Vec<SortKey> = self
            .params
            .get("sort")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty() && *t != "-")
                    .map(|token| match token.strip_prefix('-') {
                        Some(field) => SortKey {
                            field: field.to_string(),
                            descending: true,
                        },
                        None => SortKey {
                            field: token.to_string(),
                            descending: false,
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.sort = if keys.is_empty() {
            vec![SortKey {
                field: "created_at".to_string(),
                descending: true,
            }]
        } else {
            keys
        };
        self
    }

    /// Compute skip/limit and the pagination summary. `total_count`
    /// must be computed with the same filter the fetch will use for the
    /// summary to reflect the filtered population.
    pub fn paginate(mut self, total_count: u64) -> Self {
        let page = positive_or(self.params.get("page"), DEFAULT_PAGE);
        let limit = positive_or(self.params.get("limit"), DEFAULT_LIMIT);
        // page and limit come straight off the query string; saturate
        // instead of trusting the product to fit in a u64.
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let has_next = page
            .checked_mul(limit)
            .is_some_and(|consumed| consumed < total_count);

        self.skip = skip;
        self.limit = limit;
        self.pagination = Some(PaginationSummary {
            current_page: page,
            limit,
            number_of_pages: total_count.div_ceil(limit),
            next: has_next.then(|| page + 1),
            prev: (skip > 0).then(|| page - 1),
        });
        self
    }
}

fn positive_or(raw: Option<&String>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Split a `field[op]` key into its parts when `op` is a recognized
/// comparison operator. Anything else is treated as a literal field
/// name (deliberately permissive, per the original API contract).
fn split_operator(key: &str) -> Option<(String, Cmp)> {
    let open = key.find('[')?;
    let inner = key.strip_suffix(']')?.get(open + 1..)?;
    let op = match inner {
        "gte" => Cmp::Gte,
        "gt" => Cmp::Gt,
        "lte" => Cmp::Lte,
        "lt" => Cmp::Lt,
        _ => return None,
    };
    Some((key[..open].to_string(), op))
}

/// Coerce a raw parameter into a typed JSON value so numeric and
/// boolean predicates compare naturally.
fn parse_param_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
