//! Configuration from environment variables.
//!
//! | variable                | meaning                         | default     |
//! |-------------------------|---------------------------------|-------------|
//! | `PAGEFRAG_TEMPLATE_DIR` | template directory              | `templates` |
//! | `PAGEFRAG_TEMPLATE_EXT` | template file extension         | `html`      |
//! | `PAGEFRAG_HEADER`       | header template id              |             |
//! | `PAGEFRAG_FOOTER`       | footer template id              |             |
//! | `PAGEFRAG_LEGACY`       | enable all compat behaviours    | off         |
//! | `PAGEFRAG_COMPAT`       | `Compat` as JSON, beats LEGACY  |             |
//! | `PAGEFRAG_CACHE`        | cache parsed template files     | on          |

use std::path::PathBuf;

use anyhow::{Result, Context, anyhow};
use kstring::KString;

use crate::page::{Compat, PageOptions};
use crate::tmpl_loader::TemplateDir;
use crate::util::{getenv, flag_value};

#[derive(Debug, Clone, PartialEq)]
pub struct PageConfig {
    pub template_dir: PathBuf,
    pub template_extension: KString,
    pub page_options: PageOptions,
    pub compat: Compat,
    pub cache_templates: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        PageConfig {
            template_dir: PathBuf::from("templates"),
            template_extension: KString::from_static("html"),
            page_options: PageOptions::default(),
            compat: Compat::default(),
            cache_templates: true,
        }
    }
}

impl PageConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(getenv)
    }

    /// `lookup` returns the value of the named variable, if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Result<Option<String>>) -> Result<Self> {
        let get = |name: &str| lookup(name).with_context(
            || anyhow!("reading configuration variable {name:?}"));
        let nonempty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let mut config = PageConfig::default();
        if let Some(dir) = nonempty(get("PAGEFRAG_TEMPLATE_DIR")?) {
            config.template_dir = dir.into();
        }
        if let Some(ext) = get("PAGEFRAG_TEMPLATE_EXT")? {
            config.template_extension = KString::from_string(ext);
        }
        config.page_options.header = nonempty(get("PAGEFRAG_HEADER")?).map(KString::from_string);
        config.page_options.footer = nonempty(get("PAGEFRAG_FOOTER")?).map(KString::from_string);
        if get("PAGEFRAG_LEGACY")?.map_or(false, |s| flag_value(&s)) {
            config.compat = Compat::legacy();
        }
        if let Some(json) = nonempty(get("PAGEFRAG_COMPAT")?) {
            config.compat = Compat::from_json(&json).with_context(
                || anyhow!("parsing PAGEFRAG_COMPAT value {json:?}"))?;
        }
        if let Some(cache) = get("PAGEFRAG_CACHE")? {
            config.cache_templates = flag_value(&cache);
        }
        Ok(config)
    }

    pub fn template_dir(&self) -> TemplateDir {
        let dir =
            if self.cache_templates {
                TemplateDir::new(&self.template_dir)
            } else {
                TemplateDir::uncached(&self.template_dir)
            };
        dir.with_extension(&self.template_extension)
    }
}
