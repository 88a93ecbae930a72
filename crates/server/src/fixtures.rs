//! Seed data for the mock backend: a JSON file, or the built-in sample.

use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use serde_json::json;
use store::models::form_schema::{FormData, FormSchema};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Also raised for forms that do not parse as a valid schema.
    #[error("invalid fixtures: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub collections: Vec<CollectionFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionFixture {
    pub domain: String,
    pub collection: String,
    #[serde(default)]
    pub rows: Vec<FormData>,
    #[serde(default)]
    pub forms: HashMap<String, FormSchema>,
}

impl CollectionFixture {
    pub fn key(&self) -> String {
        format!("{}/{}", self.domain, self.collection)
    }
}

impl Fixtures {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let fixtures: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            collections = fixtures.collections.len(),
            "fixtures loaded"
        );
        Ok(fixtures)
    }

    /// A few collections with forms, enough to click through every page type.
    pub fn sample() -> Result<Self, FixtureError> {
        let value = json!({
            "collections": [
                {
                    "domain": "media",
                    "collection": "presentations",
                    "rows": [
                        { "id": 1, "title": "Opening keynote", "speaker": "Li", "published": true },
                        { "id": 2, "title": "Rust in production", "speaker": "Wang", "published": false },
                        { "id": 3, "title": "Closing remarks", "speaker": "Li", "published": true }
                    ],
                    "forms": {
                        "search": {
                            "panels": [
                                { "data_panel": true, "type": "text", "field_name": "title",
                                  "form_field_name": "title" },
                                { "data_panel": true, "type": "select", "field_name": "published",
                                  "form_field_name": "published" }
                            ]
                        },
                        "edit": {
                            "panels": [
                                { "data_panel": true, "type": "text", "field_name": "title",
                                  "form_field_name": "title", "required": true,
                                  "options": { "default_value": "" } },
                                { "data_panel": true, "type": "text", "field_name": "speaker",
                                  "form_field_name": "speaker" },
                                { "data_panel": true, "type": "switch", "field_name": "published",
                                  "form_field_name": "published",
                                  "options": { "default_value": false } }
                            ]
                        }
                    }
                },
                {
                    "domain": "cardpc",
                    "collection": "zhixiang/news",
                    "rows": [
                        { "id": 1, "title": "Training opens", "body": "<p>...</p>", "cover": null }
                    ]
                },
                {
                    "domain": "notification",
                    "collection": "emails",
                    "rows": [
                        { "id": 1, "subject": "Welcome", "recipient": "a@example.org", "status": "success" },
                        { "id": 2, "subject": "Reset password", "recipient": "b@example.org", "status": "dryrun" }
                    ]
                }
            ]
        });
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_sample_parses() {
        let fixtures = Fixtures::sample().unwrap();
        assert_eq!(fixtures.collections.len(), 3);
        let presentations = &fixtures.collections[0];
        assert_eq!(presentations.key(), "media/presentations");
        assert_eq!(presentations.forms["edit"].data_panels().len(), 3);
    }

    #[test]
    fn test_invalid_form_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "collections": [{{ "domain": "a", "collection": "b",
                "forms": {{ "edit": {{ "panels": [{{ "type": "inline" }}] }} }} }}] }}"#
        )
        .unwrap();
        assert!(matches!(Fixtures::load(file.path()), Err(FixtureError::Json(_))));
    }
}
