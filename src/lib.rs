//! Compose a page response out of independently rendered template
//! fragments: an optional header, the appended fragments in order,
//! an optional footer.

pub mod warn;
pub mod time_guard;
pub mod util;
pub mod error;
pub mod param;
pub mod template;
pub mod tmpl;
pub mod tmpl_loader;
pub mod page;
pub mod config;
pub mod http_response_status_codes;
pub mod webutils;

pub use error::{PageError, TemplateError};
pub use page::{Compat, PageBuilder, PageOptions, PageState};
pub use param::{FalsyPolicy, ParamValue};
pub use template::{Fragment, RenderOptions, TemplateLoader};
