//! One in-memory admin collection and the schema-driven CRUD rules the admin backend applies.
//!
//! The search form decides which query parameters filter the listing and the edit form decides
//! which body fields a create or patch may write. Collections without a form fall back to the
//! fields present on their rows.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use store::models::{
    form_schema::{DataPanel, FormData, FormSchema},
    pagination::DEFAULT_PAGE_SIZE,
};
use utils::response::PageInfo;

use crate::error::ApiError;

pub const SEARCH_FORM: &str = "search";
pub const EDIT_FORM: &str = "edit";

#[derive(Debug, Clone, Default)]
pub struct MockCollection {
    rows: Vec<FormData>,
    forms: HashMap<String, FormSchema>,
    next_id: u64,
}

impl MockCollection {
    pub fn new(rows: Vec<FormData>, forms: HashMap<String, FormSchema>) -> Self {
        let mut collection = Self {
            rows: Vec::with_capacity(rows.len()),
            forms,
            next_id: 1,
        };
        let max_id = rows.iter().filter_map(numeric_id).max().unwrap_or(0);
        collection.next_id = max_id + 1;
        for mut row in rows {
            if !row.contains_key("id") {
                row.insert("id".to_string(), Value::from(collection.allocate_id()));
            }
            collection.rows.push(row);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn form(&self, name: &str) -> Option<&FormSchema> {
        self.forms.get(name)
    }

    /// Filter by `query` and cut out the requested page.
    pub fn list(&self, query: &HashMap<String, String>) -> (Vec<Value>, PageInfo) {
        let filters = self.filters(query);
        let matching: Vec<&FormData> = self
            .rows
            .iter()
            .filter(|row| filters.iter().all(|filter| filter.matches(row)))
            .collect();

        let page = positive(query.get("page")).unwrap_or(1);
        let page_size = positive(query.get("page_size")).unwrap_or(DEFAULT_PAGE_SIZE);
        let info = PageInfo::compute(matching.len() as u64, page, page_size);

        let start = ((info.page - 1) * page_size) as usize;
        let rows = matching
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .map(|row| Value::Object(row.clone()))
            .collect();
        (rows, info)
    }

    pub fn get(&self, id: &str) -> Result<Value, ApiError> {
        self.position(id)
            .map(|index| Value::Object(self.rows[index].clone()))
            .ok_or(ApiError::NotFound)
    }

    pub fn create(&mut self, body: &FormData) -> Value {
        let mut row = FormData::new();
        row.insert("id".to_string(), Value::from(self.allocate_id()));
        self.apply(&mut row, body);
        self.rows.push(row.clone());
        Value::Object(row)
    }

    pub fn patch(&mut self, id: &str, body: &FormData) -> Result<Value, ApiError> {
        let index = self.position(id).ok_or(ApiError::NotFound)?;
        let mut row = self.rows[index].clone();
        if self.apply(&mut row, body) == 0 {
            return Err(ApiError::BadRequest("No field to update".to_string()));
        }
        self.rows[index] = row.clone();
        Ok(Value::Object(row))
    }

    /// Remove the row and answer with what was removed.
    pub fn delete(&mut self, id: &str) -> Result<Value, ApiError> {
        let index = self.position(id).ok_or(ApiError::NotFound)?;
        Ok(Value::Object(self.rows.remove(index)))
    }

    /// Copy writable fields of `body` into `row`; returns how many were written.
    fn apply(&self, row: &mut FormData, body: &FormData) -> usize {
        let mut written = 0;
        match self.forms.get(EDIT_FORM) {
            Some(form) => {
                for panel in form.data_panels() {
                    if let Some(value) = body.get(&panel.form_field_name) {
                        row.insert(model_field(panel).to_string(), value.clone());
                        written += 1;
                    }
                }
            }
            None => {
                for (key, value) in body {
                    if key != "id" {
                        row.insert(key.clone(), value.clone());
                        written += 1;
                    }
                }
            }
        }
        written
    }

    fn filters(&self, query: &HashMap<String, String>) -> Vec<Filter> {
        let lookup = |param: &str| query.get(param).filter(|value| !value.is_empty());

        match self.forms.get(SEARCH_FORM) {
            Some(form) => form
                .data_panels()
                .into_iter()
                .filter_map(|panel| {
                    lookup(panel.form_field_name.as_str()).map(|value| Filter {
                        field: model_field(panel).to_string(),
                        value: value.clone(),
                        range: panel.panel_type == "date-range",
                    })
                })
                .collect(),
            None => {
                let known: BTreeSet<&String> = self.rows.iter().flat_map(|row| row.keys()).collect();
                known
                    .into_iter()
                    .filter_map(|field| {
                        lookup(field.as_str()).map(|value| Filter {
                            field: field.clone(),
                            value: value.clone(),
                            range: false,
                        })
                    })
                    .collect()
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get("id").and_then(render).as_deref() == Some(id))
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

struct Filter {
    field: String,
    value: String,
    /// `from,to` with either bound optional, compared as strings.
    range: bool,
}

impl Filter {
    fn matches(&self, row: &FormData) -> bool {
        let Some(actual) = row.get(&self.field) else {
            return false;
        };
        let actual = match actual {
            Value::Object(object) => match object.get("id") {
                Some(id) => id,
                None => return false,
            },
            other => other,
        };

        if self.range {
            let Some(actual) = actual.as_str() else {
                return false;
            };
            let (from, to) = self.value.split_once(',').unwrap_or((self.value.as_str(), ""));
            return (from.is_empty() || actual >= from) && (to.is_empty() || actual <= to);
        }

        match actual {
            Value::String(text) => text.to_lowercase().contains(&self.value.to_lowercase()),
            Value::Array(items) => items
                .iter()
                .filter_map(render)
                .any(|item| item == self.value),
            other => render(other).is_some_and(|rendered| rendered == self.value),
        }
    }
}

fn model_field(panel: &DataPanel) -> &str {
    panel.field_name.as_deref().unwrap_or(&panel.form_field_name)
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn numeric_id(row: &FormData) -> Option<u64> {
    row.get("id").and_then(Value::as_u64)
}

fn positive(value: Option<&String>) -> Option<u64> {
    value.and_then(|v| v.parse().ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rows() -> Vec<FormData> {
        (1..=23)
            .map(|i| {
                json!({
                    "id": i,
                    "title": format!("Talk {i}"),
                    "published": i % 2 == 0,
                    "owner": { "id": i % 3 },
                    "created_at": format!("2019-01-{:02}", i),
                })
                .as_object()
                .cloned()
                .unwrap()
            })
            .collect()
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn forms() -> HashMap<String, FormSchema> {
        let search = FormSchema::from_value(json!({
            "panels": [
                { "data_panel": true, "type": "text", "field_name": "title", "form_field_name": "title" },
                { "data_panel": true, "type": "date-range", "field_name": "created_at",
                  "form_field_name": "created_range" }
            ]
        }))
        .unwrap();
        let edit = FormSchema::from_value(json!({
            "panels": [
                { "data_panel": true, "type": "text", "field_name": "title", "form_field_name": "title" },
                { "data_panel": true, "type": "select", "field_name": "owner",
                  "form_field_name": "owner_id", "form_field_property": "id" }
            ]
        }))
        .unwrap();
        HashMap::from([(SEARCH_FORM.to_string(), search), (EDIT_FORM.to_string(), edit)])
    }

    #[test]
    fn test_pagination_clamps_and_slices() {
        let collection = MockCollection::new(rows(), HashMap::new());
        let (page, info) = collection.list(&query(&[("page", "9")]));
        assert_eq!(info.page, 3);
        assert_eq!(info.total, 23);
        assert_eq!(page.len(), 3);
        assert_eq!(page[0]["id"], 21);

        let (page, info) = collection.list(&query(&[("page", "x"), ("page_size", "5")]));
        assert_eq!(info.page, 1);
        assert_eq!(info.last_page, Some(5));
        assert_eq!(page.len(), 5);
    }

    #[test]
    fn test_row_field_filters_without_forms() {
        let collection = MockCollection::new(rows(), HashMap::new());

        let (_, info) = collection.list(&query(&[("title", "talk 1")]));
        assert_eq!(info.total, 11); // 1 and 10..=19

        let (_, info) = collection.list(&query(&[("published", "true"), ("owner", "0")]));
        assert_eq!(info.total, 3); // 6, 12, 18

        let (_, info) = collection.list(&query(&[("nonsense", "x")]));
        assert_eq!(info.total, 23);
    }

    #[test]
    fn test_search_form_drives_filters() {
        let collection = MockCollection::new(rows(), forms());

        let (_, info) = collection.list(&query(&[("created_range", "2019-01-05,2019-01-09")]));
        assert_eq!(info.total, 5);

        let (_, info) = collection.list(&query(&[("created_range", "2019-01-20,")]));
        assert_eq!(info.total, 4);

        // `published` is not a search panel
        let (_, info) = collection.list(&query(&[("published", "true")]));
        assert_eq!(info.total, 23);
    }

    #[test]
    fn test_edit_form_limits_writes() {
        let mut collection = MockCollection::new(rows(), forms());

        let created = collection.create(
            json!({ "title": "New", "owner_id": 2, "published": true })
                .as_object()
                .unwrap(),
        );
        assert_eq!(created["id"], 24);
        assert_eq!(created["owner"], 2);
        assert!(created.get("published").is_none());

        let err = collection
            .patch("3", json!({ "published": false }).as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "No field to update"));

        let patched = collection
            .patch("3", json!({ "title": "Renamed" }).as_object().unwrap())
            .unwrap();
        assert_eq!(patched["title"], "Renamed");
        assert_eq!(collection.get("3").unwrap()["title"], "Renamed");
    }

    #[test]
    fn test_delete_returns_row() {
        let mut collection = MockCollection::new(rows(), HashMap::new());
        let deleted = collection.delete("4").unwrap();
        assert_eq!(deleted["title"], "Talk 4");
        assert_eq!(collection.len(), 22);
        assert!(matches!(collection.get("4"), Err(ApiError::NotFound)));
        assert!(matches!(collection.delete("4"), Err(ApiError::NotFound)));
    }

    #[test]
    fn test_rows_without_id_get_one() {
        let collection = MockCollection::new(
            vec![
                json!({ "id": 7 }).as_object().cloned().unwrap(),
                json!({ "title": "x" }).as_object().cloned().unwrap(),
            ],
            HashMap::new(),
        );
        assert_eq!(collection.get("8").unwrap()["title"], "x");
    }
}
