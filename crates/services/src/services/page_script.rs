//! Per-page script registration for server-rendered pages.
//!
//! Each entry is paired with an [`Activator`] that decides, against the current page, whether
//! the entry runs. `run` walks entries in registration order.

use std::{collections::HashSet, fmt};

use regex::Regex;
use tracing::debug;

/// What an activator can observe about the current page.
pub trait PageEnvironment {
    fn pathname(&self) -> &str;

    /// Raw `data-js` attribute of `<body>`, if present.
    fn data_js(&self) -> Option<&str>;

    fn element_exists(&self, selector: &str) -> bool;
}

#[derive(Debug, Clone)]
pub enum Activator {
    ElementExists(String),
    PathMatches(Regex),
    /// The whole `data-js` attribute equals the value.
    DataJsIs(String),
    /// One of the whitespace-separated `data-js` tokens equals the value.
    DataJsContains(String),
    Always(bool),
}

impl Activator {
    pub fn path(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Activator::PathMatches(Regex::new(pattern)?))
    }

    pub fn element(selector: impl Into<String>) -> Self {
        Activator::ElementExists(selector.into())
    }

    pub fn data_js_contains(value: impl Into<String>) -> Self {
        Activator::DataJsContains(value.into())
    }

    pub fn is_active(&self, env: &dyn PageEnvironment) -> bool {
        match self {
            Activator::ElementExists(selector) => env.element_exists(selector),
            Activator::PathMatches(pattern) => pattern.is_match(env.pathname()),
            Activator::DataJsIs(value) => env.data_js() == Some(value.as_str()),
            Activator::DataJsContains(value) => env
                .data_js()
                .is_some_and(|raw| raw.split_whitespace().any(|token| token == value.as_str())),
            Activator::Always(active) => *active,
        }
    }
}

pub type PageEntry = Box<dyn Fn(&dyn PageEnvironment) + Send + Sync>;

struct PageScript {
    name: String,
    entry: PageEntry,
    activator: Activator,
}

#[derive(Default)]
pub struct PageScripts {
    scripts: Vec<PageScript>,
}

impl fmt::Debug for PageScripts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.scripts.iter().map(|s| (&s.name, &s.activator)))
            .finish()
    }
}

impl PageScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, entry: F, activator: Activator)
    where
        F: Fn(&dyn PageEnvironment) + Send + Sync + 'static,
    {
        self.scripts.push(PageScript {
            name: name.into(),
            entry: Box::new(entry),
            activator,
        });
    }

    /// Register an entry that runs on pages whose `data-js` is exactly `name`.
    pub fn register_named<F>(&mut self, name: &str, entry: F)
    where
        F: Fn(&dyn PageEnvironment) + Send + Sync + 'static,
    {
        self.register(name, entry, Activator::DataJsIs(name.to_string()));
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Run every active entry and return the names of those that ran.
    pub fn run(&self, env: &dyn PageEnvironment) -> Vec<&str> {
        let mut ran = Vec::new();
        for script in &self.scripts {
            if script.activator.is_active(env) {
                debug!(script = %script.name, path = env.pathname(), "running page script");
                (script.entry)(env);
                ran.push(script.name.as_str());
            }
        }
        ran
    }
}

/// A fixed page description, for rendering contexts without a live document.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    pub pathname: String,
    pub data_js: Option<String>,
    pub elements: HashSet<String>,
}

impl StaticPage {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            ..Default::default()
        }
    }

    pub fn with_data_js(mut self, data_js: impl Into<String>) -> Self {
        self.data_js = Some(data_js.into());
        self
    }

    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(selector.into());
        self
    }
}

impl PageEnvironment for StaticPage {
    fn pathname(&self) -> &str {
        &self.pathname
    }

    fn data_js(&self) -> Option<&str> {
        self.data_js.as_deref()
    }

    fn element_exists(&self, selector: &str) -> bool {
        self.elements.contains(selector)
    }
}
