//! Listing filters, sorting and pagination

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::product::{Category, Product};
use super::CatalogError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Id,
    PriceAsc,
    PriceDesc,
    Rating,
    Popularity,
    Name,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "id" => Ok(SortOrder::Id),
            "price_asc" | "price" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "rating" => Ok(SortOrder::Rating),
            "popularity" | "popular" => Ok(SortOrder::Popularity),
            "name" => Ok(SortOrder::Name),
            other => Err(format!("Unknown sort order '{}'", other)),
        }
    }
}

impl SortOrder {
    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortOrder::Id => a.id.cmp(&b.id),
            SortOrder::PriceAsc => a.price.total_cmp(&b.price),
            SortOrder::PriceDesc => b.price.total_cmp(&a.price),
            SortOrder::Rating => b.rating.total_cmp(&a.rating),
            SortOrder::Popularity => b.popularity.cmp(&a.popularity),
            SortOrder::Name => a.name.cmp(&b.name),
        }
        .then_with(|| a.id.cmp(&b.id))
    }
}

/// Raw query-string parameters for `GET /api/products`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Validated listing query
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub category: Option<Category>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub sort: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category: None,
            min_price: None,
            max_price: None,
            min_rating: None,
            sort: SortOrder::default(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl TryFrom<ListParams> for ProductQuery {
    type Error = CatalogError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let category = params
            .category
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.parse::<Category>())
            .transpose()
            .map_err(CatalogError::InvalidQuery)?;

        let sort = params
            .sort
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()
            .map_err(CatalogError::InvalidQuery)?
            .unwrap_or_default();

        if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
            if min > max {
                return Err(CatalogError::InvalidQuery(format!(
                    "minPrice ({}) is greater than maxPrice ({})",
                    min, max
                )));
            }
        }

        Ok(Self {
            category,
            min_price: params.min_price,
            max_price: params.max_price,
            min_rating: params.min_rating,
            sort,
            limit: params
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            offset: params.offset.unwrap_or(0),
        })
    }
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        self.category.map_or(true, |c| product.category == c)
            && self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max)
            && self.min_rating.map_or(true, |min| product.rating >= min)
    }

    /// Filter, sort and paginate a product list
    pub fn apply(&self, products: &[Product]) -> ProductPage {
        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));

        let total = matched.len();
        let products = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();

        ProductPage {
            products,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Stable key used to cache listing responses
    pub fn cache_key(&self) -> String {
        fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map(|v| v.to_string()).unwrap_or_default()
        }
        format!(
            "products:list:c={}:min={}:max={}:r={}:s={:?}:l={}:o={}",
            opt(&self.category),
            opt(&self.min_price),
            opt(&self.max_price),
            opt(&self.min_rating),
            self.sort,
            self.limit,
            self.offset
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Search matches ordered by popularity, most popular first
pub fn search(products: &[Product], needle: &str, limit: usize) -> Vec<Product> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<Product> = products
        .iter()
        .filter(|p| p.matches_search(&needle))
        .cloned()
        .collect();
    hits.sort_by(|a, b| SortOrder::Popularity.compare(a, b));
    hits.truncate(limit.clamp(1, MAX_SEARCH_LIMIT));
    hits
}
