use anyhow::Result;
use clap::Parser as ClapParser;
use rouille::{Request, router, start_server};

use pagefrag::config::PageConfig;
use pagefrag::http_response_status_codes::HttpResponseStatusCode;
use pagefrag::page::{PageBuilder, PageOptions};
use pagefrag::template::RenderOptions;
use pagefrag::tmpl_loader::TemplateDir;
use pagefrag::util::getenv_or;
use pagefrag::webutils::{page_response, errorpage_from_status};
use pagefrag::time_guard;


#[derive(clap::Parser, Debug)]
/// Serve a page put together from template fragments: header, a
/// "top" part, one "element" per entry, a "bottom" part and footer.
struct Args {
    /// Directory with the templates (default: $PAGEFRAG_TEMPLATE_DIR
    /// or "templates")
    #[clap(long)]
    templates: Option<String>,

    /// Address to listen on (default: $LISTEN_HTTP or 127.0.0.1:3000)
    #[clap(long)]
    listen: Option<String>,
}

const ELEMENTS: &[(&str, &str)] = &[
    ("one", "The one"),
    ("two", "The two"),
];

fn elements_page(_request: &Request, page: &mut PageBuilder<TemplateDir>) -> Result<()> {
    page.append_fragment("top", RenderOptions::default())?;
    for (name, value) in ELEMENTS {
        page.append_fragment("element", RenderOptions::default())?;
        page.set_param("name", *name)?;
        page.set_param("value", *value)?;
    }
    page.append_fragment("bottom", RenderOptions::default())?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PageConfig::from_env()?;
    if let Some(dir) = args.templates {
        config.template_dir = dir.into();
    }
    if config.page_options == PageOptions::default() {
        // what the shipped templates/ dir provides
        config.page_options = PageOptions::new().header("h").footer("f");
    }
    let listen = match args.listen {
        Some(listen) => listen,
        None => getenv_or("LISTEN_HTTP", Some("127.0.0.1:3000"))?,
    };

    let loader = config.template_dir();
    eprintln!("Serving templates from {:?} on {listen}", loader.dir());

    start_server(
        listen,
        move |request: &Request| {
            time_guard!(format!("{} {}", request.method(), request.raw_url()));
            router!(
                request,
                (GET) (/) => {
                    page_response(request, &loader, config.page_options.clone(),
                                  config.compat, elements_page)
                },
                _ => {
                    errorpage_from_status(HttpResponseStatusCode::NotFound404)
                }
            )
        });
}
