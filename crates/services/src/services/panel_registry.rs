//! Panel type name -> component lookup.
//!
//! Feature modules register their own panel components on the registry instance built at
//! startup, before any page resolves panels. Registering an existing name replaces it.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use serde_json::Value;
use store::models::form_schema::DataPanel;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

const KEY_PREFIX: &str = "ns-panel-";

/// An editable widget bound to a data panel.
pub trait PanelComponent: Send + Sync {
    /// Type name the component is known under (without the registry prefix).
    fn panel_type(&self) -> &str;

    /// Whether `value` has the shape this widget edits. `null` is accepted by every widget.
    fn accepts(&self, value: &Value) -> bool;
}

/// Panel widgets available without any feature module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum BuiltinPanel {
    Text,
    #[strum(serialize = "richtext")]
    RichText,
    Switch,
    Select,
    DateRange,
    DatetimePicker,
    ImageUploader,
    DocumentUploader,
}

impl PanelComponent for BuiltinPanel {
    fn panel_type(&self) -> &str {
        match self {
            BuiltinPanel::Text => "text",
            BuiltinPanel::RichText => "richtext",
            BuiltinPanel::Switch => "switch",
            BuiltinPanel::Select => "select",
            BuiltinPanel::DateRange => "date-range",
            BuiltinPanel::DatetimePicker => "datetime-picker",
            BuiltinPanel::ImageUploader => "image-uploader",
            BuiltinPanel::DocumentUploader => "document-uploader",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            BuiltinPanel::Text | BuiltinPanel::RichText | BuiltinPanel::DatetimePicker => {
                value.is_string()
            }
            BuiltinPanel::Switch => value.is_boolean(),
            BuiltinPanel::Select => !value.is_object(),
            BuiltinPanel::DateRange => value
                .as_array()
                .is_some_and(|range| range.len() == 2 && range.iter().all(Value::is_string)),
            BuiltinPanel::ImageUploader | BuiltinPanel::DocumentUploader => {
                value.is_object() || value.is_array()
            }
        }
    }
}

#[derive(Default)]
pub struct PanelRegistry {
    components: DashMap<String, Arc<dyn PanelComponent>>,
}

impl fmt::Debug for PanelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.components.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        f.debug_struct("PanelRegistry").field("components", &keys).finish()
    }
}

impl PanelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every [`BuiltinPanel`].
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for panel in BuiltinPanel::iter() {
            registry.register(panel.panel_type(), Arc::new(panel));
        }
        registry
    }

    pub fn register(&self, name: &str, component: Arc<dyn PanelComponent>) {
        if self
            .components
            .insert(registry_key(name), component)
            .is_some()
        {
            debug!(panel = name, "panel component replaced");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn PanelComponent>> {
        self.components
            .get(&registry_key(name))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn resolve_panel(&self, panel: &DataPanel) -> Option<Arc<dyn PanelComponent>> {
        self.resolve(&panel.panel_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(&registry_key(name))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

fn registry_key(name: &str) -> String {
    format!("{KEY_PREFIX}{name}")
}
