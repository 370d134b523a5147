use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::site::{Metadata, Page, SiteModel};
use crate::theme::ResolvedTheme;

pub const BASE_TEMPLATE: &str = "base.html";
pub const PAGE_TEMPLATE: &str = "page.html";

const DEFAULT_BASE: &str = include_str!("../templates/base.html");
const DEFAULT_PAGE: &str = include_str!("../templates/page.html");

/// Built-in templates, in the order they are written out.
pub const DEFAULT_TEMPLATES: [(&str, &str); 2] =
    [(BASE_TEMPLATE, DEFAULT_BASE), (PAGE_TEMPLATE, DEFAULT_PAGE)];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template error")]
    Tera(#[from] tera::Error),
    #[error("failed to access template {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write any missing default template into `template_dir`, leaving existing files
/// alone. Returns the files that were created.
pub fn ensure_default_templates<P: AsRef<Path>>(
    template_dir: P,
) -> Result<Vec<PathBuf>, TemplateError> {
    let template_dir = template_dir.as_ref();
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| TemplateError::Io { path, source }
    };

    std::fs::create_dir_all(template_dir).map_err(io_error(template_dir))?;

    let mut created = Vec::new();
    for (name, contents) in DEFAULT_TEMPLATES {
        let path = template_dir.join(name);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, contents).map_err(io_error(&path))?;
        created.push(path);
    }

    Ok(created)
}

#[derive(Serialize)]
struct PageContext<'a> {
    metadata: &'a Metadata,
    content: &'a str,
    toc: &'a str,
    url: String,
}

#[derive(Serialize)]
struct RenderContext<'a> {
    page: PageContext<'a>,
    site: &'a SiteModel,
    theme: &'a ResolvedTheme,
}

/// Template registry for one build. Construction only reads templates.
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Load every `*.html` template under `template_dir`, named by its path
    /// relative to that directory.
    pub fn new<P: AsRef<Path>>(template_dir: P) -> Result<Self, TemplateError> {
        let template_dir = template_dir.as_ref();

        let mut files = Vec::new();
        for entry in WalkDir::new(template_dir).sort_by_file_name() {
            let entry = entry.map_err(|source: walkdir::Error| TemplateError::Io {
                path: template_dir.to_path_buf(),
                source: source.into(),
            })?;
            let is_html = entry.path().extension().is_some_and(|ext| ext == "html");
            if !entry.file_type().is_file() || !is_html {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(template_dir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((entry.path().to_path_buf(), Some(name)));
        }

        let mut tera = Tera::default();
        tera.add_template_files(files)?;

        Ok(Self { tera })
    }

    /// A registry holding only the built-in templates.
    pub fn with_defaults() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(DEFAULT_TEMPLATES)?;

        Ok(Self { tera })
    }

    /// Render `page` through the page layout.
    pub fn render(
        &self,
        page: &Page,
        site: &SiteModel,
        theme: &ResolvedTheme,
    ) -> Result<String, TemplateError> {
        let context = RenderContext {
            page: PageContext {
                metadata: &page.metadata,
                content: &page.body,
                toc: &page.toc,
                url: page.url(),
            },
            site,
            theme,
        };

        let context = Context::from_serialize(&context)?;
        Ok(self.tera.render(PAGE_TEMPLATE, &context)?)
    }
}
