//! Declarative form schemas as served by `GET .../forms/{search|edit}`.
//!
//! The wire format is loosely typed: every node is a `panel` object and its shape is implied by
//! which keys it carries. Parsing turns it into a closed union ([`Panel`]) and rejects nodes
//! that match more than one shape (or none), as well as schemas that bind two data panels to
//! the same form field.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Flat, editable form values keyed by `form_field_name`.
///
/// An absent key means "not set"; `Value::Null` means "explicitly set to null".
pub type FormData = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("panel at {path} is marked as a data panel but also declares nested {nested}")]
    AmbiguousDataPanel { path: String, nested: &'static str },
    #[error("panel at {path} declares both panels and tabs")]
    AmbiguousContainer { path: String },
    #[error("panel at {path} is neither a data panel nor a container")]
    UnknownShape { path: String },
    #[error("data panel at {path} has no form_field_name")]
    MissingFormFieldName { path: String },
    #[error("form field `{0}` is bound by more than one data panel")]
    DuplicateFormField(String),
    #[error("invalid schema json: {0}")]
    Json(String),
}

/// A single client-side validation rule attached to a data panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRule {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// Leaf panel bound to exactly one entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPanel {
    /// Registry key of the widget (`text`, `switch`, `image-uploader`, ...).
    pub panel_type: String,
    /// Source entity key. Panels not backed by a model field have none.
    pub field_name: Option<String>,
    pub form_field_name: String,
    /// When set, only this property of an object (or of each list element) is submitted.
    pub form_field_property: Option<String>,
    pub many_field: bool,
    pub required: bool,
    pub disabled: bool,
    pub disabled_on_new: bool,
    pub disabled_on_edit: bool,
    pub disabled_on_search: bool,
    pub hide_on_new: bool,
    pub hide_on_edit: bool,
    pub options: Map<String, Value>,
    pub validators: Vec<ValidatorRule>,
}

impl DataPanel {
    pub fn new(panel_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self {
            panel_type: panel_type.into(),
            form_field_name: field_name.clone(),
            field_name: Some(field_name),
            form_field_property: None,
            many_field: false,
            required: false,
            disabled: false,
            disabled_on_new: false,
            disabled_on_edit: false,
            disabled_on_search: false,
            hide_on_new: false,
            hide_on_edit: false,
            options: Map::new(),
            validators: Vec::new(),
        }
    }

    pub fn with_form_field_name(mut self, form_field_name: impl Into<String>) -> Self {
        self.form_field_name = form_field_name.into();
        self
    }

    pub fn with_default(mut self, default_value: Value) -> Self {
        self.options.insert("default_value".to_string(), default_value);
        self
    }

    pub fn with_property(mut self, property: impl Into<String>, many_field: bool) -> Self {
        self.form_field_property = Some(property.into());
        self.many_field = many_field;
        self
    }

    pub fn with_validator(mut self, rule: ValidatorRule) -> Self {
        self.validators.push(rule);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The declared `options.default_value`; a panel without one defaults to null.
    pub fn default_value(&self) -> Value {
        self.options
            .get("default_value")
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn label(&self) -> &str {
        self.options
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&self.form_field_name)
    }
}

/// Ordered group of child panels (`inline`, `divider`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPanel {
    pub panel_type: String,
    pub title: Option<String>,
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub title: String,
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabSetPanel {
    pub panel_type: String,
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Data(DataPanel),
    Group(GroupPanel),
    Tabs(TabSetPanel),
}

impl Panel {
    pub fn group(panels: Vec<Panel>) -> Self {
        Panel::Group(GroupPanel {
            panel_type: "inline".to_string(),
            title: None,
            panels,
        })
    }

    pub fn tabs(tabs: Vec<(&str, Vec<Panel>)>) -> Self {
        Panel::Tabs(TabSetPanel {
            panel_type: "tab".to_string(),
            tabs: tabs
                .into_iter()
                .map(|(title, panels)| Tab {
                    title: title.to_string(),
                    panels,
                })
                .collect(),
        })
    }

    fn collect_data_panels<'a>(&'a self, out: &mut Vec<&'a DataPanel>) {
        match self {
            Panel::Data(panel) => out.push(panel),
            Panel::Group(group) => {
                for child in &group.panels {
                    child.collect_data_panels(out);
                }
            }
            Panel::Tabs(tab_set) => {
                for tab in &tab_set.tabs {
                    for child in &tab.panels {
                        child.collect_data_panels(out);
                    }
                }
            }
        }
    }
}

impl From<DataPanel> for Panel {
    fn from(panel: DataPanel) -> Self {
        Panel::Data(panel)
    }
}

/// A parsed form. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForm", into = "RawForm")]
pub struct FormSchema {
    form_mode: Option<String>,
    panels: Vec<Panel>,
}

impl FormSchema {
    pub fn new(panels: Vec<Panel>) -> Result<Self, SchemaError> {
        let schema = Self {
            form_mode: None,
            panels,
        };
        schema.check_unique_form_fields()?;
        Ok(schema)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value).map_err(|e| SchemaError::Json(e.to_string()))
    }

    pub fn form_mode(&self) -> Option<&str> {
        self.form_mode.as_deref()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Every data panel reachable from the root, depth-first and left-to-right.
    pub fn data_panels(&self) -> Vec<&DataPanel> {
        let mut out = Vec::new();
        for panel in &self.panels {
            panel.collect_data_panels(&mut out);
        }
        out
    }

    fn check_unique_form_fields(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for panel in self.data_panels() {
            if !seen.insert(panel.form_field_name.as_str()) {
                return Err(SchemaError::DuplicateFormField(
                    panel.form_field_name.clone(),
                ));
            }
        }
        Ok(())
    }
}

// ---------- wire format ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawForm {
    #[serde(default = "form_object")]
    object: String,
    #[serde(default)]
    panels: Vec<RawPanel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_mode: Option<String>,
}

fn form_object() -> String {
    "form".to_string()
}

fn panel_object() -> String {
    "panel".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawTab {
    #[serde(default)]
    title: String,
    #[serde(default)]
    panels: Vec<RawPanel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawPanel {
    #[serde(default = "panel_object")]
    object: String,
    #[serde(default)]
    data_panel: bool,
    #[serde(rename = "type", default)]
    panel_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    panels: Option<Vec<RawPanel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tabs: Option<Vec<RawTab>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_field_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    many_field: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled_on_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled_on_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled_on_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hide_on_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hide_on_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validators: Option<Vec<ValidatorRule>>,
}

impl RawPanel {
    fn into_panel(self, path: &str) -> Result<Panel, SchemaError> {
        if self.data_panel {
            if self.panels.is_some() {
                return Err(SchemaError::AmbiguousDataPanel {
                    path: path.to_string(),
                    nested: "panels",
                });
            }
            if self.tabs.is_some() {
                return Err(SchemaError::AmbiguousDataPanel {
                    path: path.to_string(),
                    nested: "tabs",
                });
            }
            let form_field_name = self
                .form_field_name
                .or_else(|| self.field_name.clone())
                .ok_or_else(|| SchemaError::MissingFormFieldName {
                    path: path.to_string(),
                })?;
            let disabled = self.disabled.unwrap_or(false);
            return Ok(Panel::Data(DataPanel {
                panel_type: self.panel_type,
                field_name: self.field_name,
                form_field_name,
                form_field_property: self.form_field_property,
                many_field: self.many_field.unwrap_or(false),
                required: self.required.unwrap_or(false),
                disabled,
                disabled_on_new: self.disabled_on_new.unwrap_or(disabled),
                disabled_on_edit: self.disabled_on_edit.unwrap_or(disabled),
                disabled_on_search: self.disabled_on_search.unwrap_or(disabled),
                hide_on_new: self.hide_on_new.unwrap_or(false),
                hide_on_edit: self.hide_on_edit.unwrap_or(false),
                options: self.options.unwrap_or_default(),
                validators: self.validators.unwrap_or_default(),
            }));
        }

        match (self.panels, self.tabs) {
            (Some(_), Some(_)) => Err(SchemaError::AmbiguousContainer {
                path: path.to_string(),
            }),
            (Some(panels), None) => Ok(Panel::Group(GroupPanel {
                panel_type: self.panel_type,
                title: self.title,
                panels: convert_children(panels, path)?,
            })),
            (None, Some(tabs)) => {
                let tabs = tabs
                    .into_iter()
                    .enumerate()
                    .map(|(i, tab)| {
                        let tab_path = format!("{path}.tabs[{i}]");
                        Ok(Tab {
                            title: tab.title,
                            panels: convert_children(tab.panels, &tab_path)?,
                        })
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                Ok(Panel::Tabs(TabSetPanel {
                    panel_type: self.panel_type,
                    tabs,
                }))
            }
            (None, None) => Err(SchemaError::UnknownShape {
                path: path.to_string(),
            }),
        }
    }
}

fn convert_children(panels: Vec<RawPanel>, path: &str) -> Result<Vec<Panel>, SchemaError> {
    panels
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.into_panel(&format!("{path}.panels[{i}]")))
        .collect()
}

impl TryFrom<RawForm> for FormSchema {
    type Error = SchemaError;

    fn try_from(raw: RawForm) -> Result<Self, Self::Error> {
        let schema = Self {
            form_mode: raw.form_mode,
            panels: convert_children(raw.panels, "form")?,
        };
        schema.check_unique_form_fields()?;
        Ok(schema)
    }
}

impl From<Panel> for RawPanel {
    fn from(panel: Panel) -> Self {
        match panel {
            Panel::Data(p) => RawPanel {
                data_panel: true,
                panel_type: p.panel_type,
                field_name: p.field_name,
                form_field_name: Some(p.form_field_name),
                form_field_property: p.form_field_property,
                many_field: Some(p.many_field),
                required: Some(p.required),
                disabled: Some(p.disabled),
                disabled_on_new: Some(p.disabled_on_new),
                disabled_on_edit: Some(p.disabled_on_edit),
                disabled_on_search: Some(p.disabled_on_search),
                hide_on_new: Some(p.hide_on_new),
                hide_on_edit: Some(p.hide_on_edit),
                options: Some(p.options),
                validators: Some(p.validators),
                ..RawPanel::with_object()
            },
            Panel::Group(g) => RawPanel {
                panel_type: g.panel_type,
                title: g.title,
                panels: Some(g.panels.into_iter().map(RawPanel::from).collect()),
                ..RawPanel::with_object()
            },
            Panel::Tabs(t) => RawPanel {
                panel_type: t.panel_type,
                tabs: Some(
                    t.tabs
                        .into_iter()
                        .map(|tab| RawTab {
                            title: tab.title,
                            panels: tab.panels.into_iter().map(RawPanel::from).collect(),
                        })
                        .collect(),
                ),
                ..RawPanel::with_object()
            },
        }
    }
}

impl RawPanel {
    fn with_object() -> Self {
        RawPanel {
            object: panel_object(),
            ..Default::default()
        }
    }
}

impl From<FormSchema> for RawForm {
    fn from(schema: FormSchema) -> Self {
        RawForm {
            object: form_object(),
            panels: schema.panels.into_iter().map(RawPanel::from).collect(),
            form_mode: schema.form_mode,
        }
    }
}
