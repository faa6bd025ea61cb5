//! Building a page response from a sequence of independently
//! rendered template fragments, with optional header and footer.
//!
//! A `PageBuilder` lives for one request: templates are appended in
//! the order they should appear, parameters always go to the
//! fragment appended last, and `build` concatenates header, fragments
//! and footer without separators.

use kstring::KString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PageError;
use crate::param::{FalsyPolicy, ParamValue};
use crate::template::{Fragment, RenderOptions, TemplateLoader};
use crate::{nowarn, warn};

/// Header and footer template ids; both optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    #[serde(default)]
    pub header: Option<KString>,
    #[serde(default)]
    pub footer: Option<KString>,
}

impl PageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, id: &str) -> Self {
        self.header = Some(KString::from_ref(id));
        self
    }

    pub fn footer(mut self, id: &str) -> Self {
        self.footer = Some(KString::from_ref(id));
        self
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Switches for behaviour kept only for compatibility with older
/// page code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compat {
    /// Let the first `append_fragment` on an uninitialized builder
    /// initialize it with empty options, instead of failing.
    #[serde(default)]
    pub auto_initialize: bool,
    /// Which values `set_param` drops without setting them.
    #[serde(default)]
    pub falsy: FalsyPolicy,
    /// Don't clear the output between `build` calls; every call
    /// appends the whole page again.
    #[serde(default)]
    pub accumulate_output: bool,
}

impl Default for Compat {
    fn default() -> Self {
        Compat {
            auto_initialize: false,
            falsy: FalsyPolicy::Legacy,
            accumulate_output: false,
        }
    }
}

impl Compat {
    pub fn legacy() -> Self {
        Compat {
            auto_initialize: true,
            falsy: FalsyPolicy::Legacy,
            accumulate_output: true,
        }
    }

    /// Missing keys keep their `Compat::default()` values.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Uninitialized,
    Initialized,
    /// At least one fragment appended since the last initialization
    /// or build.
    Accumulating,
    Built,
}

pub struct PageBuilder<'l, L: TemplateLoader + ?Sized> {
    loader: &'l L,
    header: Option<KString>,
    footer: Option<KString>,
    fragments: Vec<(KString, L::Fragment)>,
    output: String,
    state: PageState,
    compat: Compat,
}

impl<'l, L: TemplateLoader + ?Sized> PageBuilder<'l, L> {
    /// An initialized, empty page.
    pub fn new(loader: &'l L, options: PageOptions) -> Self {
        let mut page = Self::uninitialized(loader, Compat::default());
        page.initialize(options);
        page
    }

    /// A page that still needs `initialize`, unless
    /// `compat.auto_initialize` is set.
    pub fn uninitialized(loader: &'l L, compat: Compat) -> Self {
        PageBuilder {
            loader,
            header: None,
            footer: None,
            fragments: Vec::new(),
            output: String::new(),
            state: PageState::Uninitialized,
            compat,
        }
    }

    pub fn with_compat(mut self, compat: Compat) -> Self {
        self.compat = compat;
        self
    }

    /// Start over: drops all fragments and output, takes header and
    /// footer from `options`.
    pub fn initialize(&mut self, options: PageOptions) {
        let PageOptions { header, footer } = options;
        self.header = header;
        self.footer = footer;
        self.fragments.clear();
        self.output.clear();
        self.state = PageState::Initialized;
    }

    /// Load template `id` and append it; it becomes the current
    /// fragment. `options` go to the loader untouched.
    pub fn append_fragment(
        &mut self,
        id: &str,
        options: RenderOptions,
    ) -> Result<&mut L::Fragment, PageError> {
        if self.state == PageState::Uninitialized {
            if self.compat.auto_initialize {
                warn!("append_fragment({id:?}) on uninitialized page, initializing \
                       with empty options");
                self.initialize(PageOptions::default());
            } else {
                return Err(PageError::NotInitialized)
            }
        }
        let fragment = self.loader.load(id, &options).map_err(
            |source| PageError::TemplateLoad { id: KString::from_ref(id), source })?;
        let i = self.fragments.len();
        self.fragments.push((KString::from_ref(id), fragment));
        self.state = PageState::Accumulating;
        Ok(&mut self.fragments[i].1)
    }

    /// Set a parameter on the current fragment. Returns `Ok(false)`
    /// and leaves the fragment alone if the compat falsy policy drops
    /// `value`; with the default policy that includes `""` and `0`.
    pub fn set_param(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<bool, PageError> {
        let falsy = self.compat.falsy;
        let (id, fragment) = self.current_mut()?;
        let value = value.into();
        if falsy.skips(&value) {
            nowarn!("set_param: skipping {name:?} = {value:?} on \"{id}\"");
            return Ok(false)
        }
        fragment.set_param(name, value).map_err(
            |source| PageError::SetParam {
                id: id.clone(),
                name: KString::from_ref(name),
                source
            })?;
        Ok(true)
    }

    /// Set all `pairs` on the current fragment, whatever their
    /// values. Stops at the first parameter the fragment rejects.
    pub fn set_params<K, V>(
        &mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), PageError>
    where K: AsRef<str>,
          V: Into<ParamValue>
    {
        let (id, fragment) = self.current_mut()?;
        for (name, value) in pairs {
            let name = name.as_ref();
            fragment.set_param(name, value.into()).map_err(
                |source| PageError::SetParam {
                    id: id.clone(),
                    name: KString::from_ref(name),
                    source
                })?;
        }
        Ok(())
    }

    /// `set_params` taking a JSON object.
    pub fn set_params_json(&mut self, params: &Value) -> Result<(), PageError> {
        match params {
            Value::Object(map) => self.set_params(map.iter()),
            _ => {
                // check for a current fragment first, as set_params would
                self.current_mut()?;
                Err(PageError::NotAMapping(params.to_string()))
            }
        }
    }

    /// Render header, all fragments in append order, and footer, and
    /// concatenate them.
    pub fn build(&mut self) -> Result<String, PageError> {
        // the buffer is only touched once every piece has rendered
        let mut page = String::new();
        if let Some(id) = &self.header {
            page.push_str(&render_unparameterized(self.loader, id)?);
        }
        for (id, fragment) in &self.fragments {
            let s = fragment.render().map_err(
                |source| PageError::Render { id: id.clone(), source })?;
            page.push_str(&s);
        }
        if let Some(id) = &self.footer {
            page.push_str(&render_unparameterized(self.loader, id)?);
        }
        if !self.compat.accumulate_output {
            self.output.clear();
        }
        self.output.push_str(&page);
        self.state = PageState::Built;
        Ok(self.output.clone())
    }

    fn current_mut(&mut self) -> Result<&mut (KString, L::Fragment), PageError> {
        self.fragments.last_mut().ok_or(PageError::NoCurrentFragment)
    }

    pub fn current_fragment(&self) -> Option<&L::Fragment> {
        self.fragments.last().map(|(_, f)| f)
    }

    pub fn current_fragment_mut(&mut self) -> Option<&mut L::Fragment> {
        self.fragments.last_mut().map(|(_, f)| f)
    }

    /// Template ids of the appended fragments, in order.
    pub fn fragment_ids(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != PageState::Uninitialized
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    pub fn compat(&self) -> Compat {
        self.compat
    }

    /// Output of the last `build` (all builds, with
    /// `accumulate_output`).
    pub fn output(&self) -> &str {
        &self.output
    }
}

fn render_unparameterized<L: TemplateLoader + ?Sized>(
    loader: &L,
    id: &KString,
) -> Result<String, PageError> {
    let fragment = loader.load(id, &RenderOptions::default()).map_err(
        |source| PageError::TemplateLoad { id: id.clone(), source })?;
    fragment.render().map_err(
        |source| PageError::Render { id: id.clone(), source })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

    use anyhow::Result;
    use serde_json::json;

    use crate::error::TemplateError;
    use crate::tmpl_loader::TemplateMap;

    use super::*;

    /// Loader whose fragments render as `id(k=v,...)` and count their
    /// `render` calls.
    #[derive(Default)]
    struct Recorder {
        renders: Rc<RefCell<Vec<KString>>>,
    }

    struct RecFragment {
        id: KString,
        params: BTreeMap<String, String>,
        renders: Rc<RefCell<Vec<KString>>>,
    }

    impl Fragment for RecFragment {
        fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), TemplateError> {
            self.params.insert(name.into(), value.to_text());
            Ok(())
        }

        fn render(&self) -> Result<String, TemplateError> {
            self.renders.borrow_mut().push(self.id.clone());
            let params: Vec<String> =
                self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            Ok(format!("{}({})", self.id, params.join(",")))
        }
    }

    impl TemplateLoader for Recorder {
        type Fragment = RecFragment;

        fn load(&self, id: &str, _options: &RenderOptions) -> Result<RecFragment, TemplateError> {
            if id == "missing" {
                return Err(TemplateError::NotFound { id: KString::from_ref(id) })
            }
            Ok(RecFragment {
                id: KString::from_ref(id),
                params: BTreeMap::new(),
                renders: self.renders.clone(),
            })
        }
    }

    fn templates() -> Result<TemplateMap> {
        Ok(TemplateMap::from_pairs([
            ("h", "<html><body>\n"),
            ("f", "</body></html>\n"),
            ("top", "<h1>Elements</h1>\n<dl>\n"),
            ("element", "<dt><TMPL_VAR name></dt><dd><TMPL_VAR value></dd>\n"),
            ("bottom", "</dl>\n"),
        ])?)
    }

    #[test]
    fn t_order() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h").footer("f"));
        for id in ["t1", "t2", "t3"] {
            page.append_fragment(id, RenderOptions::default())?;
        }
        assert_eq!(page.fragment_ids().collect::<Vec<_>>(), vec!["t1", "t2", "t3"]);
        assert_eq!(page.build()?, "h()t1()t2()t3()f()");
        Ok(())
    }

    #[test]
    fn t_no_header_footer() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::default());
        assert_eq!(page.build()?, "");
        page.append_fragment("a", RenderOptions::default())?;
        assert_eq!(page.build()?, "a()");
        let mut page = PageBuilder::new(&loader, PageOptions::new().footer("f"));
        page.append_fragment("a", RenderOptions::default())?;
        assert_eq!(page.build()?, "a()f()");
        Ok(())
    }

    #[test]
    fn t_current_fragment_only() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h"));
        page.append_fragment("t1", RenderOptions::default())?;
        assert!(page.set_param("x", "1")?);
        page.append_fragment("t2", RenderOptions::default())?;
        assert!(page.set_param("x", "2")?);
        assert!(page.set_param("y", "3")?);
        assert_eq!(page.build()?, "h()t1(x=1)t2(x=2,y=3)");
        Ok(())
    }

    #[test]
    fn t_returned_handle_is_current() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::default());
        page.append_fragment("t", RenderOptions::default())?
            .set_param("direct", "yes".into())?;
        assert_eq!(page.current_fragment().map(|f| f.id.as_str()), Some("t"));
        assert_eq!(page.build()?, "t(direct=yes)");
        Ok(())
    }

    #[test]
    fn t_falsy_values() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::default());
        page.append_fragment("t", RenderOptions::default())?;
        assert!(!page.set_param("a", "")?);
        assert!(!page.set_param("b", 0)?);
        assert!(!page.set_param("c", "0")?);
        assert!(!page.set_param("d", None::<&str>)?);
        assert!(page.set_param("e", "0value")?);
        assert_eq!(page.build()?, "t(e=0value)");

        // set_params doesn't skip anything
        page.set_params([("f", ParamValue::from("")), ("g", ParamValue::from(0))])?;
        assert_eq!(page.build()?, "t(e=0value,f=,g=0)");
        Ok(())
    }

    #[test]
    fn t_null_only_policy() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::default())
            .with_compat(Compat { falsy: FalsyPolicy::NullOnly, ..Compat::default() });
        page.append_fragment("t", RenderOptions::default())?;
        assert!(page.set_param("a", "")?);
        assert!(page.set_param("b", 0)?);
        assert!(!page.set_param("c", ParamValue::Null)?);
        assert_eq!(page.build()?, "t(a=,b=0)");
        Ok(())
    }

    #[test]
    fn t_set_params() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::default());
        page.append_fragment("t", RenderOptions::default())?;
        page.set_params([("b", 2), ("a", 1)])?;
        assert_eq!(page.build()?, "t(a=1,b=2)");

        page.append_fragment("u", RenderOptions::default())?;
        page.set_params_json(&json!({"x": "y", "n": null}))?;
        assert_eq!(page.build()?, "t(a=1,b=2)u(n=,x=y)");
        assert!(matches!(page.set_params_json(&json!(["x"])),
                         Err(PageError::NotAMapping(_))));
        Ok(())
    }

    #[test]
    fn t_no_current_fragment() {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h"));
        assert!(matches!(page.set_param("x", "1"), Err(PageError::NoCurrentFragment)));
        assert!(matches!(page.set_param("x", ""), Err(PageError::NoCurrentFragment)));
        assert!(matches!(page.set_params([("x", "1")]), Err(PageError::NoCurrentFragment)));
        assert!(matches!(page.set_params_json(&json!({})),
                         Err(PageError::NoCurrentFragment)));
        assert!(matches!(page.set_params_json(&json!(1)),
                         Err(PageError::NoCurrentFragment)));
    }

    #[test]
    fn t_load_error() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::default());
        page.append_fragment("a", RenderOptions::default())?;
        match page.append_fragment("missing", RenderOptions::default()) {
            Err(PageError::TemplateLoad { id, source: TemplateError::NotFound { .. } }) =>
                assert_eq!(id.as_str(), "missing"),
            Err(e) => panic!("unexpected error {e:?}"),
            Ok(_) => panic!("expected an error"),
        }
        // the failed append didn't change anything
        assert_eq!(page.len(), 1);
        assert!(page.set_param("still", "a")?);
        assert_eq!(page.build()?, "a(still=a)");

        let mut page = PageBuilder::new(&loader, PageOptions::new().footer("missing"));
        page.append_fragment("a", RenderOptions::default())?;
        assert!(matches!(page.build(), Err(PageError::TemplateLoad { .. })));
        Ok(())
    }

    #[test]
    fn t_render_once_per_build() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h").footer("f"));
        page.append_fragment("a", RenderOptions::default())?;
        page.append_fragment("b", RenderOptions::default())?;
        page.build()?;
        let renders: Vec<String> =
            loader.renders.borrow().iter().map(|k| k.to_string()).collect();
        assert_eq!(renders, vec!["h", "a", "b", "f"]);
        page.build()?;
        assert_eq!(loader.renders.borrow().len(), 8);
        Ok(())
    }

    #[test]
    fn t_initialize_resets() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h").footer("f"));
        page.append_fragment("a", RenderOptions::default())?;
        page.build()?;
        page.initialize(PageOptions::new().header("h2"));
        assert_eq!(page.state(), PageState::Initialized);
        assert!(page.is_empty());
        assert_eq!(page.output(), "");
        assert_eq!(page.header(), Some("h2"));
        assert_eq!(page.footer(), None);
        assert!(matches!(page.set_param("x", "1"), Err(PageError::NoCurrentFragment)));
        page.append_fragment("b", RenderOptions::default())?;
        assert_eq!(page.build()?, "h2()b()");
        Ok(())
    }

    #[test]
    fn t_state_machine() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::uninitialized(&loader, Compat::default());
        assert_eq!(page.state(), PageState::Uninitialized);
        assert!(!page.is_initialized());
        assert!(matches!(page.append_fragment("a", RenderOptions::default()),
                         Err(PageError::NotInitialized)));
        page.initialize(PageOptions::default());
        assert_eq!(page.state(), PageState::Initialized);
        page.append_fragment("a", RenderOptions::default())?;
        assert_eq!(page.state(), PageState::Accumulating);
        page.build()?;
        assert_eq!(page.state(), PageState::Built);
        page.append_fragment("b", RenderOptions::default())?;
        assert_eq!(page.state(), PageState::Accumulating);
        assert_eq!(page.build()?, "a()b()");
        Ok(())
    }

    #[test]
    fn t_legacy_compat() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::uninitialized(&loader, Compat::legacy());
        page.append_fragment("a", RenderOptions::default())?;
        assert!(page.is_initialized());
        assert_eq!(page.header(), None);
        assert_eq!(page.build()?, "a()");
        // the legacy buffer is never cleared between builds
        assert_eq!(page.build()?, "a()a()");
        assert_eq!(page.output(), "a()a()");
        // but initialize still clears it
        page.initialize(PageOptions::default());
        assert_eq!(page.build()?, "");
        Ok(())
    }

    #[test]
    fn t_repeated_build_fresh() -> Result<()> {
        let loader = Recorder::default();
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h"));
        page.append_fragment("a", RenderOptions::default())?;
        assert_eq!(page.build()?, "h()a()");
        assert_eq!(page.build()?, "h()a()");
        Ok(())
    }

    #[test]
    fn t_failed_build_keeps_output() -> Result<()> {
        let loader = Recorder::default();
        for compat in [Compat::default(), Compat::legacy()] {
            let mut page = PageBuilder::new(&loader, PageOptions::new().header("h").footer("missing"))
                .with_compat(compat);
            page.append_fragment("a", RenderOptions::default())?;
            let e = page.build().err().map(|e| e.to_string());
            assert_eq!(e.as_deref(), Some("loading template \"missing\""));
            assert_eq!(page.output(), "");
            assert_eq!(page.state(), PageState::Accumulating);
        }
        Ok(())
    }

    #[test]
    fn t_end_to_end() -> Result<()> {
        let loader = templates()?;
        let mut page = PageBuilder::new(&loader, PageOptions::new().header("h").footer("f"));
        page.append_fragment("top", RenderOptions::default())?;
        for (name, value) in [("one", "The one"), ("two", "The two")] {
            page.append_fragment("element", RenderOptions::default())?;
            page.set_param("name", name)?;
            page.set_param("value", value)?;
        }
        page.append_fragment("bottom", RenderOptions::default())?;
        assert_eq!(
            page.build()?,
            "<html><body>\n\
             <h1>Elements</h1>\n<dl>\n\
             <dt>one</dt><dd>The one</dd>\n\
             <dt>two</dt><dd>The two</dd>\n\
             </dl>\n\
             </body></html>\n");
        Ok(())
    }

    #[test]
    fn t_bad_params_per_fragment() -> Result<()> {
        let loader = templates()?;
        let mut page = PageBuilder::new(&loader, PageOptions::default());
        page.append_fragment("element", RenderOptions::default())?;
        match page.set_param("bogus", "x") {
            Err(PageError::SetParam { id, name, source: TemplateError::BadParam { .. } }) => {
                assert_eq!(id.as_str(), "element");
                assert_eq!(name.as_str(), "bogus");
            }
            r => panic!("expected SetParam error, got {r:?}"),
        }
        assert!(matches!(page.set_params([("name", "n"), ("bogus", "x")]),
                         Err(PageError::SetParam { .. })));

        page.append_fragment("element", RenderOptions::lenient())?;
        assert!(page.set_param("bogus", "x")?);
        assert!(page.set_param("name", "Lenient")?);
        assert_eq!(page.build()?,
                   "<dt>n</dt><dd></dd>\n<dt>Lenient</dt><dd></dd>\n");
        Ok(())
    }

    #[test]
    fn t_page_options_json() -> Result<()> {
        assert_eq!(PageOptions::from_json("{}")?, PageOptions::default());
        assert_eq!(PageOptions::from_json(r#"{"header": "h", "extra": 1}"#)?,
                   PageOptions::new().header("h"));
        assert_eq!(PageOptions::from_json(r#"{"header": "h", "footer": "f"}"#)?,
                   PageOptions::new().header("h").footer("f"));
        Ok(())
    }

    #[test]
    fn t_compat_json() -> Result<()> {
        assert_eq!(Compat::from_json("{}")?, Compat::default());
        assert_eq!(Compat::from_json(r#"{"falsy": "null_only"}"#)?,
                   Compat { falsy: FalsyPolicy::NullOnly, ..Compat::default() });
        assert_eq!(Compat::from_json(
            r#"{"auto_initialize": true, "falsy": "legacy", "accumulate_output": true}"#)?,
                   Compat::legacy());
        assert!(Compat::from_json(r#"{"falsy": "never"}"#).is_err());
        Ok(())
    }
}
