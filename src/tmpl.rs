//! A minimal variables-only template language in the style of
//! HTML::Template: literal text with `<TMPL_VAR name>` tags.
//!
//! Tag forms accepted (keyword and attribute names are
//! case-insensitive, as are variable names):
//!
//! ```text
//! <TMPL_VAR name>
//! <TMPL_VAR NAME=name>
//! <TMPL_VAR NAME="name" ESCAPE=HTML DEFAULT="n/a">
//! ```
//!
//! `ESCAPE` takes `HTML`/`1` or `0`/`NONE`. Unset variables render
//! as their `DEFAULT`, or empty.

use std::{collections::{BTreeSet, HashMap}, sync::Arc};

use kstring::KString;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::TemplateError;
use crate::param::ParamValue;
use crate::template::{Fragment, RenderOptions};

const TAG: &str = "<tmpl_var";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    None,
    Html,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Var {
        name: KString,
        escape: Escape,
        default: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Template {
    id: KString,
    pieces: Vec<Piece>,
    var_names: BTreeSet<KString>,
}

pub fn html_escape(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

fn normalize_name(name: &str) -> KString {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        KString::from_string(name.to_ascii_lowercase())
    } else {
        KString::from_ref(name)
    }
}

lazy_static! {
    /// The tag keyword, followed by whitespace, `>` or end of input
    /// (a bare keyword at the end is an unterminated tag, not text).
    static ref TAG_START: Regex = Regex::new(r"(?i)<tmpl_var(?:[\s>]|$)")
        .expect("valid TAG_START regex");

    /// One `key=value` or bare-word attribute at the start of a tag
    /// body; whitespace is allowed around `=`.
    static ref ATTRIBUTE: Regex = Regex::new(
        r#"^\s*(?:(\w+)\s*=\s*)?(?:"([^"]*)"|'([^']*)'|([^\s"'=>]*))"#)
        .expect("valid ATTRIBUTE regex");
}

/// Position of the next `<TMPL_VAR` tag at or after `from`.
fn find_tag(s: &str, from: usize) -> Option<usize> {
    TAG_START.find_at(s, from).map(|m| m.start())
}

/// Split a tag body into `(key, value)` pairs; bare words have no
/// key. Values may be quoted with `"` or `'`.
fn tag_attributes(body: &str) -> Result<Vec<(Option<&str>, &str)>, &'static str> {
    let mut out = Vec::new();
    let mut rest = body;
    while !rest.trim_start().is_empty() {
        let caps = ATTRIBUTE.captures(rest).ok_or("unexpected character")?;
        let key = caps.get(1).map(|m| m.as_str());
        let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        if key.is_none() && value.is_empty() && caps.get(4).is_some() {
            // nothing consumed but whitespace
            let t = rest.trim_start();
            return Err(if t.starts_with('=') {
                "attribute without a key"
            } else if t.starts_with(|c: char| c == '"' || c == '\'') {
                "unterminated quote"
            } else {
                "unexpected character"
            })
        }
        out.push((key, value));
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }
    Ok(out)
}

fn parse_var(body: &str) -> Result<Piece, &'static str> {
    let mut name = None;
    let mut escape = Escape::None;
    let mut default = None;
    for (key, value) in tag_attributes(body)? {
        let key = key.map(|k| k.to_ascii_lowercase());
        match key.as_deref() {
            None | Some("name") => {
                if name.is_some() {
                    return Err("more than one variable name")
                }
                name = Some(value);
            }
            Some("escape") => {
                escape = match value.to_ascii_lowercase().as_str() {
                    "html" | "1" => Escape::Html,
                    "0" | "none" => Escape::None,
                    _ => return Err("unknown ESCAPE value"),
                };
            }
            Some("default") => default = Some(value.to_string()),
            Some(_) => return Err("unknown attribute"),
        }
    }
    match name {
        Some(name) if !name.is_empty() => Ok(Piece::Var {
            name: normalize_name(name),
            escape,
            default,
        }),
        _ => Err("missing variable name"),
    }
}

impl Template {
    pub fn parse(id: &str, source: &str) -> Result<Template, TemplateError> {
        let id = KString::from_ref(id);
        let mut pieces = Vec::new();
        let mut var_names = BTreeSet::new();
        let mut pos = 0;
        while let Some(start) = find_tag(source, pos) {
            if start > pos {
                pieces.push(Piece::Text(source[pos..start].into()));
            }
            let bodystart = start + TAG.len();
            let close = source[bodystart..].find('>').ok_or_else(
                || TemplateError::Parse {
                    id: id.clone(), pos: start, msg: "unterminated TMPL_VAR tag"
                })?;
            let piece = parse_var(&source[bodystart..bodystart + close]).map_err(
                |msg| TemplateError::Parse { id: id.clone(), pos: start, msg })?;
            if let Piece::Var { name, .. } = &piece {
                var_names.insert(name.clone());
            }
            pieces.push(piece);
            pos = bodystart + close + 1;
        }
        if pos < source.len() {
            pieces.push(Piece::Text(source[pos..].into()));
        }
        Ok(Template { id, pieces, var_names })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lowercased names of all variables used, sorted.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.var_names.iter().map(|k| k.as_str())
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.var_names.contains(normalize_name(name).as_str())
    }

    pub fn render(&self, params: &HashMap<KString, ParamValue>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(s) => out.push_str(s),
                Piece::Var { name, escape, default } => {
                    let text = match params.get(name) {
                        Some(v) if !v.is_null() => v.to_text(),
                        _ => default.clone().unwrap_or_default(),
                    };
                    match escape {
                        Escape::None => out.push_str(&text),
                        Escape::Html => html_escape(&text, &mut out),
                    }
                }
            }
        }
        out
    }
}

/// One loaded instance of a `Template`, collecting parameters.
#[derive(Debug, Clone)]
pub struct TmplFragment {
    template: Arc<Template>,
    params: HashMap<KString, ParamValue>,
    die_on_bad_params: bool,
}

impl TmplFragment {
    pub fn new(template: Arc<Template>, options: &RenderOptions) -> Self {
        TmplFragment {
            template,
            params: HashMap::new(),
            die_on_bad_params: options.die_on_bad_params,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(normalize_name(name).as_str())
    }
}

impl Fragment for TmplFragment {
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), TemplateError> {
        let name = normalize_name(name);
        if self.die_on_bad_params && !self.template.var_names.contains(&name) {
            return Err(TemplateError::BadParam {
                id: self.template.id.clone(),
                name,
            })
        }
        self.params.insert(name, value);
        Ok(())
    }

    fn render(&self) -> Result<String, TemplateError> {
        Ok(self.template.render(&self.params))
    }
}
