//! The contract between the page accumulator and a template
//! renderer. The accumulator only ever loads templates by id, sets
//! parameters on them and renders them; it never looks inside.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TemplateError;
use crate::param::ParamValue;

/// A loaded template instance accepting parameters.
pub trait Fragment {
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), TemplateError>;

    fn render(&self) -> Result<String, TemplateError>;
}

pub trait TemplateLoader {
    type Fragment: Fragment;

    /// Must fail (not return an empty fragment) if `id` can't be
    /// resolved or parsed.
    fn load(&self, id: &str, options: &RenderOptions) -> Result<Self::Fragment, TemplateError>;
}

impl<T: TemplateLoader + ?Sized> TemplateLoader for &T {
    type Fragment = T::Fragment;

    fn load(&self, id: &str, options: &RenderOptions) -> Result<Self::Fragment, TemplateError> {
        (**self).load(id, options)
    }
}

impl<T: TemplateLoader + ?Sized> TemplateLoader for Arc<T> {
    type Fragment = T::Fragment;

    fn load(&self, id: &str, options: &RenderOptions) -> Result<Self::Fragment, TemplateError> {
        (**self).load(id, options)
    }
}

fn default_true() -> bool { true }

/// Options handed through to the renderer when loading a
/// template. Only `die_on_bad_params` is interpreted by the built-in
/// renderer; everything else ends up in `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Setting a parameter the template doesn't use is an error.
    #[serde(default = "default_true")]
    pub die_on_bad_params: bool,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            die_on_bad_params: true,
            other: Map::new(),
        }
    }
}

impl RenderOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        RenderOptions {
            die_on_bad_params: false,
            other: Map::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
