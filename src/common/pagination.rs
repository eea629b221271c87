//! Page/ordering query parameters shared by the list endpoints

use sea_orm::{
    ConnectionTrait, EntityTrait, FromQueryResult, Order, PaginatorTrait, QueryOrder, Select,
};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 200;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Run a select through the paginator and wrap the requested page
pub async fn fetch_page<E, C>(
    select: Select<E>,
    db: &C,
    params: &PageParams,
) -> CoreResult<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
    C: ConnectionTrait,
{
    let page = params.page();
    let page_size = params.page_size();

    let paginator = select.paginate(db, page_size);
    let totals = paginator.num_items_and_pages().await?;
    let results = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        count: totals.number_of_items,
        page,
        page_size,
        total_pages: totals.number_of_pages,
        results,
    })
}

/// A parsed `ordering` query parameter, e.g. `-due_date`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: raw.to_string(),
                descending: false,
            },
        }
    }

    pub fn order(&self) -> Order {
        if self.descending {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}

/// Apply an optional ordering parameter using a per-resource column whitelist
///
/// `resolve` maps a public field name onto a column; unknown names are a
/// validation error naming the accepted fields.
pub fn apply_ordering<E, F>(
    select: Select<E>,
    ordering: Option<&str>,
    allowed: &[&str],
    default: (E::Column, Order),
    resolve: F,
) -> CoreResult<Select<E>>
where
    E: EntityTrait,
    F: Fn(&str) -> Option<E::Column>,
{
    let Some(raw) = ordering.filter(|s| !s.trim().is_empty()) else {
        return Ok(select.order_by(default.0, default.1));
    };

    let ordering = Ordering::parse(raw);
    let column = resolve(&ordering.field).ok_or_else(|| {
        CoreError::field(
            "ordering",
            format!(
                "Unknown ordering field '{}'. Allowed: {}",
                ordering.field,
                allowed.join(", ")
            ),
        )
    })?;

    Ok(select.order_by(column, ordering.order()))
}
