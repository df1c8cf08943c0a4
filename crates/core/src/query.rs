use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Column a customer listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    FirstName,
    LastName,
}

impl SortField {
    /// Resolves a client supplied name against the allow-list.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "id" => Ok(Self::Id),
            "first_name" => Ok(Self::FirstName),
            "last_name" => Ok(Self::LastName),
            other => Err(ValidationError::InvalidSortField(other.to_string())),
        }
    }

    /// Column name used in the ORDER BY clause.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive; anything other than `desc` sorts ascending.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw query string parameters of `GET /api/customers`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

/// Validated customer listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for CustomerQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CustomerQuery {
    /// Applies defaults and validates the raw parameters.
    ///
    /// Blank values are treated as absent, matching what the browser client
    /// sends when a field is left empty.
    pub fn from_params(params: ListParams) -> Result<Self, ValidationError> {
        let search = non_blank(params.search);
        let sort = match non_blank(params.sort_by) {
            Some(value) => SortField::parse(&value)?,
            None => SortField::default(),
        };
        let order = params
            .order
            .as_deref()
            .map(SortOrder::parse_lenient)
            .unwrap_or_default();
        let page = parse_positive("page", params.page)?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive("limit", params.limit)?
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);

        Ok(Self {
            search,
            sort,
            order,
            page,
            limit,
        })
    }

    /// Number of rows skipped before the requested page.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// Search text interpreted as an exact customer id, when it is one.
    pub fn search_id(&self) -> Option<i64> {
        self.search.as_deref().and_then(|value| value.parse().ok())
    }

    /// LIKE pattern for substring matching, with wildcards in the input escaped by `\`.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|value| {
            let mut pattern = String::with_capacity(value.len() + 2);
            pattern.push('%');
            for ch in value.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(ch);
            }
            pattern.push('%');
            pattern
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn parse_positive(name: &'static str, raw: Option<String>) -> Result<Option<u32>, ValidationError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    match value.parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        _ => Err(ValidationError::NotPositive { name, value }),
    }
}

/// Pagination block returned alongside a customer page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// `total_pages` is `ceil(total / limit)`, so zero matches yield zero pages.
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            total,
            total_pages,
            page,
            limit,
        }
    }
}
