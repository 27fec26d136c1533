//! Domain types for the expedition catalog.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// A bookable expedition itinerary.
///
/// The CMS omits fields freely, so everything beyond the id is optional or
/// defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub slug: String,
  #[serde(default)]
  pub region: Option<String>,
  #[serde(default)]
  pub ship: Option<String>,
  #[serde(default)]
  pub price: Option<f64>,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default)]
  pub duration_days: Option<u32>,
  #[serde(default)]
  pub departure_date: Option<NaiveDate>,
  #[serde(default)]
  pub summary: Option<String>,
  #[serde(default)]
  pub hero_image: Option<String>,
}

/// A vessel in the fleet catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub slug: String,
  #[serde(default)]
  pub capacity: Option<u32>,
  #[serde(default)]
  pub cabins: Option<u32>,
  #[serde(default)]
  pub year_built: Option<u32>,
  #[serde(default)]
  pub description: Option<String>,
}

/// A flattened page of catalog results.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
  pub items: Vec<T>,
  pub current_page: u32,
  pub total_pages: u32,
  pub total_items: u64,
  pub per_page: u32,
  pub from: Option<u64>,
  pub to: Option<u64>,
}

impl<T> PageResult<T> {
  /// The shape pages fall back to when there is nothing to show.
  pub fn empty() -> Self {
    Self {
      items: Vec::new(),
      current_page: DEFAULT_PAGE,
      total_pages: 1,
      total_items: 0,
      per_page: DEFAULT_PAGE_SIZE,
      from: None,
      to: None,
    }
  }
}

/// Outcome of a catalog list query.
///
/// Keeps "the backend had nothing usable" apart from "the fetch failed".
/// Page layers that only want graceful degradation can collapse either case
/// with [`QueryOutcome::into_page`].
#[derive(Debug, Clone)]
pub enum QueryOutcome<T> {
  /// The envelope parsed; the page may still have zero items.
  Loaded(PageResult<T>),
  /// The resource is missing, the envelope was malformed, or the backend
  /// refused the request in-band.
  Empty,
  /// The fetch itself failed and no data is available.
  Failed(ApiError),
}

impl<T> QueryOutcome<T> {
  pub fn is_loaded(&self) -> bool {
    matches!(self, QueryOutcome::Loaded(_))
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, QueryOutcome::Empty)
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, QueryOutcome::Failed(_))
  }

  /// Collapse to a page, degrading failures and misses to the empty shape.
  pub fn into_page(self) -> PageResult<T> {
    match self {
      QueryOutcome::Loaded(page) => page,
      QueryOutcome::Empty | QueryOutcome::Failed(_) => PageResult::empty(),
    }
  }
}

/// Filters for the trip catalog; unset fields are omitted from the query
/// string.
#[derive(Debug, Clone, Default)]
pub struct TripFilters {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub region: Option<String>,
  pub ship: Option<String>,
  pub min_price: Option<u64>,
  pub max_price: Option<u64>,
  pub min_duration: Option<u32>,
  pub max_duration: Option<u32>,
  pub search: Option<String>,
  pub sort: Option<String>,
}

impl TripFilters {
  /// Build the query string: `page` and `limit` first (with their
  /// defaults), everything else in declaration order, blank values omitted.
  pub fn to_query_string(&self) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("page", &self.page.unwrap_or(DEFAULT_PAGE).to_string());
    query.append_pair(
      "limit",
      &self.limit.unwrap_or(DEFAULT_PAGE_SIZE).to_string(),
    );

    append_text(&mut query, "region", self.region.as_deref());
    append_text(&mut query, "ship", self.ship.as_deref());
    append_number(&mut query, "min_price", self.min_price);
    append_number(&mut query, "max_price", self.max_price);
    append_number(&mut query, "min_duration", self.min_duration.map(u64::from));
    append_number(&mut query, "max_duration", self.max_duration.map(u64::from));
    append_text(&mut query, "search", self.search.as_deref());
    append_text(&mut query, "sort", self.sort.as_deref());

    query.finish()
  }
}

/// Filters for the ship catalog.
#[derive(Debug, Clone, Default)]
pub struct ShipFilters {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub region: Option<String>,
  pub search: Option<String>,
}

impl ShipFilters {
  pub fn to_query_string(&self) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("page", &self.page.unwrap_or(DEFAULT_PAGE).to_string());
    query.append_pair(
      "limit",
      &self.limit.unwrap_or(DEFAULT_PAGE_SIZE).to_string(),
    );

    append_text(&mut query, "region", self.region.as_deref());
    append_text(&mut query, "search", self.search.as_deref());

    query.finish()
  }
}

fn append_text(
  query: &mut url::form_urlencoded::Serializer<'_, String>,
  name: &str,
  value: Option<&str>,
) {
  if let Some(value) = value {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
      query.append_pair(name, trimmed);
    }
  }
}

fn append_number(
  query: &mut url::form_urlencoded::Serializer<'_, String>,
  name: &str,
  value: Option<u64>,
) {
  if let Some(value) = value {
    query.append_pair(name, &value.to_string());
  }
}

/// Path segment for a trip detail lookup.
///
/// The CMS addresses detail endpoints with a type discriminator such as
/// `trip_two`; the prefix is dropped, and the bare `trip` sentinel means
/// the type-agnostic endpoint.
pub fn detail_segment(kind: &str) -> Option<&str> {
  let stripped = kind.strip_prefix("trip_").unwrap_or(kind);
  let stripped = stripped.trim();
  if stripped.is_empty() || stripped == "trip" {
    None
  } else {
    Some(stripped)
  }
}
