//! Conversion between entity snapshots, editable form-data and submit payloads.
//!
//! Everything here is schema-driven: only keys bound by a data panel survive either direction,
//! so unknown entity fields are dropped on the way in and unknown form keys on the way out.

use serde_json::Value;
use store::models::form_schema::{DataPanel, FormData, FormSchema};

/// Every data panel reachable in `schema`, depth-first and left-to-right.
pub fn get_data_panels(schema: &FormSchema) -> Vec<&DataPanel> {
    schema.data_panels()
}

/// Build the initial form-data for `schema`, seeded from `initial_data`.
///
/// Returns `None` when either input is missing. Each data panel contributes its declared
/// default, replaced by the entity value under `field_name` when the entity has that key.
pub fn build_formdata(
    schema: Option<&FormSchema>,
    initial_data: Option<&FormData>,
) -> Option<FormData> {
    let (schema, initial_data) = (schema?, initial_data?);

    let mut formdata = FormData::new();
    for panel in get_data_panels(schema) {
        let value = panel
            .field_name
            .as_deref()
            .and_then(|field| initial_data.get(field))
            .cloned()
            .unwrap_or_else(|| panel.default_value());
        formdata.insert(panel.form_field_name.clone(), value);
    }
    Some(formdata)
}

/// Turn edited form-data into the request body for create/patch.
///
/// Missing inputs yield an empty payload. Keys absent from `formdata` stay absent, which keeps
/// "not set" distinct from "set to null".
pub fn prepare_submit_formdata(
    schema: Option<&FormSchema>,
    formdata: Option<&FormData>,
) -> FormData {
    let mut payload = FormData::new();
    let (Some(schema), Some(formdata)) = (schema, formdata) else {
        return payload;
    };

    for panel in get_data_panels(schema) {
        let Some(value) = formdata.get(&panel.form_field_name) else {
            continue;
        };
        let submitted = match panel.form_field_property.as_deref() {
            Some(property) if panel.many_field => Some(pluck_each(value, property)),
            Some(property) => pluck(value, property),
            None => Some(value.clone()),
        };
        if let Some(submitted) = submitted {
            payload.insert(panel.form_field_name.clone(), submitted);
        }
    }
    payload
}

/// `[{p: 1}, {p: 2}]` -> `[1, 2]`. Elements without the property become null.
fn pluck_each(value: &Value, property: &str) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| item.get(property).cloned().unwrap_or(Value::Null))
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

/// Falsy values (an empty picture, ...) submit as null. `None` means the key is left out.
fn pluck(value: &Value, property: &str) -> Option<Value> {
    if !is_truthy(value) {
        return Some(Value::Null);
    }
    value.get(property).cloned()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use store::models::form_schema::Panel;

    use super::*;

    fn fd(value: Value) -> FormData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn news_schema() -> FormSchema {
        FormSchema::new(vec![
            DataPanel::new("text", "title").with_default(json!("")).into(),
            Panel::tabs(vec![
                (
                    "content",
                    vec![
                        DataPanel::new("richtext", "body").with_default(json!("")).into(),
                        DataPanel::new("switch", "published")
                            .with_default(json!(false))
                            .into(),
                    ],
                ),
                (
                    "media",
                    vec![Panel::group(vec![
                        DataPanel::new("image-uploader", "cover")
                            .with_form_field_name("cover_id")
                            .with_property("id", false)
                            .into(),
                        DataPanel::new("select", "tags")
                            .with_property("id", true)
                            .with_default(json!([]))
                            .into(),
                    ])],
                ),
            ]),
        ])
        .unwrap()
    }

    #[test]
    fn test_get_data_panels_depth_first_order() {
        let schema = news_schema();
        let names: Vec<_> = get_data_panels(&schema)
            .into_iter()
            .map(|p| p.form_field_name.as_str())
            .collect();
        assert_eq!(names, vec!["title", "body", "published", "cover_id", "tags"]);
    }

    #[test]
    fn test_build_formdata_missing_inputs() {
        let schema = news_schema();
        assert!(build_formdata(None, Some(&FormData::new())).is_none());
        assert!(build_formdata(Some(&schema), None).is_none());
    }

    #[test]
    fn test_build_formdata_defaults_and_overrides() {
        let schema = news_schema();
        let entity = fd(json!({
            "id": 7,
            "title": "Hello",
            "cover": { "id": 3, "url": "/img/3.png" },
            "published": null,
            "unknown": "dropped"
        }));

        let formdata = build_formdata(Some(&schema), Some(&entity)).unwrap();
        assert_eq!(
            Value::Object(formdata),
            json!({
                "title": "Hello",
                "body": "",
                "published": null,
                "cover_id": { "id": 3, "url": "/img/3.png" },
                "tags": []
            })
        );
    }

    #[test]
    fn test_build_formdata_empty_schema() {
        let schema = FormSchema::new(vec![]).unwrap();
        let formdata = build_formdata(Some(&schema), Some(&fd(json!({ "a": 1 })))).unwrap();
        assert!(formdata.is_empty());
    }

    #[test]
    fn test_prepare_submit_missing_inputs_is_empty() {
        let schema = news_schema();
        assert!(prepare_submit_formdata(None, Some(&FormData::new())).is_empty());
        assert!(prepare_submit_formdata(Some(&schema), None).is_empty());
    }

    #[test]
    fn test_prepare_submit_extracts_properties() {
        let schema = news_schema();
        let formdata = fd(json!({
            "title": "Hello",
            "cover_id": { "id": 3, "url": "/img/3.png" },
            "tags": [{ "id": 1, "name": "a" }, { "id": 2, "name": "b" }],
            "stray": true
        }));

        let payload = prepare_submit_formdata(Some(&schema), Some(&formdata));
        assert_eq!(
            Value::Object(payload),
            json!({ "title": "Hello", "cover_id": 3, "tags": [1, 2] })
        );
    }

    #[test]
    fn test_prepare_submit_null_single_value_stays_null() {
        let schema = news_schema();
        let payload =
            prepare_submit_formdata(Some(&schema), Some(&fd(json!({ "cover_id": null }))));
        assert_eq!(payload.get("cover_id"), Some(&Value::Null));
    }

    #[test]
    fn test_prepare_submit_falsy_single_values_become_null() {
        let schema = news_schema();
        for falsy in [json!(""), json!(0), json!(false)] {
            let formdata = fd(json!({ "cover_id": falsy.clone() }));
            let payload = prepare_submit_formdata(Some(&schema), Some(&formdata));
            assert_eq!(payload.get("cover_id"), Some(&Value::Null), "{falsy}");
        }
    }

    #[test]
    fn test_prepare_submit_truthy_scalar_is_omitted() {
        let schema = news_schema();
        for truthy in [json!("abc"), json!(5), json!(true)] {
            let payload = prepare_submit_formdata(
                Some(&schema),
                Some(&fd(json!({ "title": "T", "cover_id": truthy.clone() }))),
            );
            assert!(!payload.contains_key("cover_id"), "{truthy}");
            assert_eq!(payload["title"], "T");
        }
    }

    #[test]
    fn test_prepare_submit_null_list_becomes_empty_list() {
        let schema = news_schema();
        let payload = prepare_submit_formdata(Some(&schema), Some(&fd(json!({ "tags": null }))));
        assert_eq!(payload.get("tags"), Some(&json!([])));
    }

    #[test]
    fn test_prepare_submit_object_without_property_is_omitted() {
        let schema = news_schema();
        let payload =
            prepare_submit_formdata(Some(&schema), Some(&fd(json!({ "cover_id": { "url": "x" } }))));
        assert!(!payload.contains_key("cover_id"));
    }

    #[test]
    fn test_prepare_submit_never_invents_keys() {
        let schema = news_schema();
        let formdata = fd(json!({ "body": "text" }));
        let payload = prepare_submit_formdata(Some(&schema), Some(&formdata));
        for key in payload.keys() {
            assert!(formdata.contains_key(key));
        }
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_round_trip_without_property() {
        let schema = news_schema();
        let entity = fd(json!({ "title": "T", "body": "B", "published": true }));
        let formdata = build_formdata(Some(&schema), Some(&entity)).unwrap();
        let payload = prepare_submit_formdata(Some(&schema), Some(&formdata));
        for field in ["title", "body", "published"] {
            assert_eq!(payload[field], entity[field]);
        }
    }
}
