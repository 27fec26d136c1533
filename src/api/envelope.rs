//! Serde types matching the backend's response envelope.
//!
//! These are separate from the domain types so the backend's wire shape can
//! stay lenient while domain types stay focused on what pages need. Most
//! resources arrive as `{ status, message, data, code }`; paginated list
//! resources nest a page object under `data`.

use serde::Deserialize;

use super::types::PageResult;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub status: bool,
  #[serde(default)]
  pub message: String,
  pub data: Option<T>,
  #[serde(default)]
  pub code: i64,
}

/// The backend's page object, as nested under `data` for list resources.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
  #[serde(default = "first_page")]
  pub current_page: u32,
  #[serde(default)]
  pub data: Vec<T>,
  #[serde(default = "first_page")]
  pub last_page: u32,
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub per_page: u32,
  pub from: Option<u64>,
  pub to: Option<u64>,
}

fn first_page() -> u32 {
  1
}

impl<T> Page<T> {
  /// Flatten the wire shape into the result pages consume.
  pub fn into_page_result(self) -> PageResult<T> {
    PageResult {
      items: self.data,
      current_page: self.current_page,
      total_pages: self.last_page,
      total_items: self.total,
      per_page: self.per_page,
      from: self.from,
      to: self.to,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Trip;
  use serde_json::json;

  #[test]
  fn test_paginated_envelope_deserializes() {
    let raw = json!({
      "status": true,
      "message": "ok",
      "code": 200,
      "data": {
        "current_page": 2,
        "data": [{"id": 1, "title": "Svalbard Circumnavigation"}],
        "last_page": 5,
        "total": 58,
        "per_page": 12,
        "from": 13,
        "to": 24
      }
    });

    let envelope: Envelope<Page<Trip>> = serde_json::from_value(raw).unwrap();
    assert!(envelope.status);

    let page = envelope.data.unwrap().into_page_result();
    assert_eq!(page.current_page, 2);
    assert_eq!(page.total_pages, 5);
    assert_eq!(page.total_items, 58);
    assert_eq!(page.from, Some(13));
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Svalbard Circumnavigation");
  }

  #[test]
  fn test_envelope_without_status_is_rejected() {
    let raw = json!({"data": {"current_page": 1}});
    let result: Result<Envelope<Page<Trip>>, _> = serde_json::from_value(raw);
    assert!(result.is_err());
  }

  #[test]
  fn test_sparse_page_object_fills_defaults() {
    let raw = json!({"status": true, "data": {"data": []}});
    let envelope: Envelope<Page<Trip>> = serde_json::from_value(raw).unwrap();
    let page = envelope.data.unwrap().into_page_result();
    assert_eq!(page.current_page, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.total_items, 0);
    assert!(page.items.is_empty());
  }
}
