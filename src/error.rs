//! Error types of the renderer and of the page accumulator.

use std::path::PathBuf;

use kstring::KString;

/// Failures reported by a template renderer (`TemplateLoader` /
/// `Fragment` implementations).
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template \"{id}\" not found")]
    NotFound { id: KString },

    #[error("invalid template id \"{id}\"")]
    InvalidId { id: KString },

    #[error("can't read template file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template \"{id}\": {msg} at byte {pos}")]
    Parse { id: KString, pos: usize, msg: &'static str },

    #[error("template \"{id}\" has no parameter \"{name}\"")]
    BadParam { id: KString, name: KString },
}

/// Failures of the page accumulator. Renderer errors are carried
/// unchanged as the source.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("loading template \"{id}\"")]
    TemplateLoad {
        id: KString,
        #[source]
        source: TemplateError,
    },

    #[error("no current fragment (append_fragment was never called)")]
    NoCurrentFragment,

    #[error("page was not initialized and auto-initialization is off")]
    NotInitialized,

    #[error("setting parameter \"{name}\" on template \"{id}\"")]
    SetParam {
        id: KString,
        name: KString,
        #[source]
        source: TemplateError,
    },

    #[error("rendering template \"{id}\"")]
    Render {
        id: KString,
        #[source]
        source: TemplateError,
    },

    #[error("parameters must be given as a JSON object, got: {0}")]
    NotAMapping(String),
}
