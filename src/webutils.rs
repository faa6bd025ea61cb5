//! Glue between page building and rouille responses.

use std::borrow::Cow;

use anyhow::{Result, Error, anyhow};
use rouille::{Request, Response, ResponseBody};

use crate::http_response_status_codes::HttpResponseStatusCode;
use crate::page::{Compat, PageBuilder, PageOptions};
use crate::template::TemplateLoader;
use crate::tmpl::html_escape;
use crate::warn;

pub fn htmlresponse(status: HttpResponseStatusCode, body: String) -> Response {
    Response {
        status_code: status.code(),
        headers: vec![(Cow::from("Content-type"),
                       Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_string(body),
        upgrade: None,
    }
}

pub fn errorpage_from_status(status: HttpResponseStatusCode) -> Response {
    let mut title = String::new();
    html_escape(status.title(), &mut title);
    let mut explanation = String::new();
    html_escape(status.desc(), &mut explanation);
    htmlresponse(
        status,
        format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>\
                 <p>{explanation}</p></body></html>\n"))
}

/// The details of `err` only go to the log, never to the client.
pub fn errorpage_from_error(err: Error) -> Response {
    let status = HttpResponseStatusCode::InternalServerError500;
    warn!("error in page (returning {status:?}): {err:#}");
    errorpage_from_status(status)
}

/// Build a page for one request: a fresh `PageBuilder` is handed to
/// `compose`, which appends and parameterizes fragments; the result
/// is built and sent as HTML. Any error turns into a 500 page.
pub fn page_response<L, F>(
    request: &Request,
    loader: &L,
    options: PageOptions,
    compat: Compat,
    compose: F,
) -> Response
where L: TemplateLoader + ?Sized,
      F: FnOnce(&Request, &mut PageBuilder<'_, L>) -> Result<()>
{
    let mut page = PageBuilder::new(loader, options).with_compat(compat);
    let result = compose(request, &mut page)
        .and_then(|()| Ok(page.build()?));
    match result {
        Ok(body) => htmlresponse(HttpResponseStatusCode::OK200, body),
        Err(e) => errorpage_from_error(
            e.context(anyhow!("building page for {} {}", request.method(), request.url()))),
    }
}
