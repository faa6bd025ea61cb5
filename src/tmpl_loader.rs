//! `TemplateLoader` implementations for the `tmpl` language.

use std::{collections::HashMap,
          io::ErrorKind,
          path::{Path, PathBuf},
          sync::{Arc, Mutex}};

use kstring::KString;

use crate::error::TemplateError;
use crate::template::{RenderOptions, TemplateLoader};
use crate::tmpl::{Template, TmplFragment};

/// Templates held in memory, parsed when added.
#[derive(Debug, Default, Clone)]
pub struct TemplateMap {
    templates: HashMap<KString, Arc<Template>>,
}

impl TemplateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing template with the same id.
    pub fn add(&mut self, id: &str, source: &str) -> Result<&mut Self, TemplateError> {
        let template = Template::parse(id, source)?;
        self.templates.insert(KString::from_ref(id), Arc::new(template));
        Ok(self)
    }

    pub fn from_pairs<'s>(
        pairs: impl IntoIterator<Item = (&'s str, &'s str)>
    ) -> Result<Self, TemplateError> {
        let mut map = Self::new();
        for (id, source) in pairs {
            map.add(id, source)?;
        }
        Ok(map)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }
}

impl TemplateLoader for TemplateMap {
    type Fragment = TmplFragment;

    fn load(&self, id: &str, options: &RenderOptions) -> Result<TmplFragment, TemplateError> {
        let template = self.templates.get(id).ok_or_else(
            || TemplateError::NotFound { id: KString::from_ref(id) })?;
        Ok(TmplFragment::new(template.clone(), options))
    }
}

/// Ids are relative paths without extension, e.g. `parts/element`;
/// empty, `.` and `..` segments are refused, as are backslashes and
/// NUL.
fn check_id(id: &str) -> Result<(), TemplateError> {
    let ok = !id.is_empty()
        && !id.contains(|c: char| c == '\\' || c == '\0')
        && id.split('/').all(|segment| !matches!(segment, "" | "." | ".."));
    if ok {
        Ok(())
    } else {
        Err(TemplateError::InvalidId { id: KString::from_ref(id) })
    }
}

/// Templates read from files `<dir>/<id>.<extension>`.
#[derive(Debug)]
pub struct TemplateDir {
    dir: PathBuf,
    extension: KString,
    cache: Option<Mutex<HashMap<KString, Arc<Template>>>>,
}

impl TemplateDir {
    /// Parsed templates are cached for the lifetime of the loader.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TemplateDir {
            dir: dir.into(),
            extension: KString::from_static("html"),
            cache: Some(Mutex::new(HashMap::new())),
        }
    }

    /// Re-reads the file on every load.
    pub fn uncached(dir: impl Into<PathBuf>) -> Self {
        TemplateDir {
            cache: None,
            ..Self::new(dir)
        }
    }

    /// Pass an empty string for files without extension.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = KString::from_ref(extension.trim_start_matches('.'));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, TemplateError> {
        check_id(id)?;
        let filename =
            if self.extension.is_empty() {
                id.to_string()
            } else {
                format!("{id}.{}", self.extension)
            };
        Ok(self.dir.join(filename))
    }

    fn read(&self, id: &str) -> Result<Template, TemplateError> {
        let path = self.path_for(id)?;
        match std::fs::read_to_string(&path) {
            Ok(source) => Template::parse(id, &source),
            Err(e) => match e.kind() {
                ErrorKind::NotFound => Err(TemplateError::NotFound { id: KString::from_ref(id) }),
                _ => Err(TemplateError::Io { path, source: e }),
            }
        }
    }

    fn get(&self, id: &str) -> Result<Arc<Template>, TemplateError> {
        let cache = match &self.cache {
            None => return Ok(Arc::new(self.read(id)?)),
            Some(cache) => cache,
        };
        // A panic while holding the lock can't leave the map half
        // updated, so poisoning is ignored.
        let lock = move || cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(template) = lock().get(id) {
            return Ok(template.clone())
        }
        let template = Arc::new(self.read(id)?);
        lock().insert(KString::from_ref(id), template.clone());
        Ok(template)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }
}

impl TemplateLoader for TemplateDir {
    type Fragment = TmplFragment;

    fn load(&self, id: &str, options: &RenderOptions) -> Result<TmplFragment, TemplateError> {
        Ok(TmplFragment::new(self.get(id)?, options))
    }
}
