use std::path::{Path, PathBuf};

use tracing::info;

use crate::builder::{CONTENT_DIR, STATIC_DIR, TEMPLATES_DIR};
use crate::markdown::title_case;

const DEFAULT_CONFIG: &str = r##"# Sunsite configuration
title: My Sunsite
description: A site built with sunsite
theme:
  accent_color: "#3498db"
  font: "Inter"
  roundness: "medium"  # none, small, medium, large
  shadows: true
"##;

const WELCOME_PAGE: &str = "---
title: Welcome to Sunsite
---

# Welcome to Sunsite

This is an example page created with sunsite.

## Features

- Markdown support
- Custom theming
- Semantic HTML
";

#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    ProjectExists(PathBuf),
    #[error("{} already exists", .0.display())]
    PageExists(PathBuf),
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ScaffoldError {
    let path = path.to_path_buf();
    move |source| ScaffoldError::Io { path, source }
}

/// Create a new project skeleton in `dir`.
pub fn init_project<P: AsRef<Path>>(dir: P, force: bool) -> Result<(), ScaffoldError> {
    let dir = dir.as_ref();
    if dir.exists() && !force {
        return Err(ScaffoldError::ProjectExists(dir.to_path_buf()));
    }

    for sub in [CONTENT_DIR, STATIC_DIR, TEMPLATES_DIR] {
        let path = dir.join(sub);
        std::fs::create_dir_all(&path).map_err(io_error(&path))?;
    }

    let config = dir.join("sunsite.yaml");
    std::fs::write(&config, DEFAULT_CONFIG).map_err(io_error(&config))?;

    let index = dir.join(CONTENT_DIR).join("index.md");
    std::fs::write(&index, WELCOME_PAGE).map_err(io_error(&index))?;

    info!("Project initialized at {}", dir.display());
    Ok(())
}

/// Starter document text for a new page.
pub fn page_template(title: &str, icon: Option<&str>) -> String {
    let mut text = String::from("---\n");
    text.push_str(&format!("title: {}\n", yaml_string(title)));
    if let Some(icon) = icon.filter(|i| !i.is_empty()) {
        text.push_str(&format!("icon: {}\n", yaml_string(icon)));
    }
    text.push_str(&format!("---\n\n# {title}\n\nContent goes here.\n"));
    text
}

fn yaml_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Write a starter document at `path` under the project's content directory.
/// `.md` is added when the path has no extension. Returns the file written.
pub fn new_page<P: AsRef<Path>, Q: AsRef<Path>>(
    project_dir: P,
    path: Q,
    title: Option<&str>,
    icon: Option<&str>,
) -> Result<PathBuf, ScaffoldError> {
    let mut relative = path.as_ref().to_path_buf();
    if relative.extension().is_none() {
        relative.set_extension("md");
    }

    let target = project_dir.as_ref().join(CONTENT_DIR).join(&relative);
    if target.exists() {
        return Err(ScaffoldError::PageExists(target));
    }

    let title = match title {
        Some(t) => t.to_string(),
        None => title_case(
            &relative
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
        ),
    };

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    std::fs::write(&target, page_template(&title, icon)).map_err(io_error(&target))?;

    info!("Created new page at {}", target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::markdown::parse_file;

    #[test]
    fn test_init_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("site");

        init_project(&project, false).unwrap();
        assert!(project.join("content/index.md").is_file());
        assert!(project.join("static").is_dir());
        assert!(project.join("templates").is_dir());

        let config = SiteConfig::load(&project).unwrap();
        assert_eq!(config.title, "My Sunsite");
        assert_eq!(config.theme, crate::theme::ThemeConfig::default());
    }

    #[test]
    fn test_init_refuses_existing_dir_without_force() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            init_project(dir.path(), false),
            Err(ScaffoldError::ProjectExists(_))
        ));
        init_project(dir.path(), true).unwrap();
    }

    #[test]
    fn test_new_page_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let written = new_page(dir.path(), "docs/getting-started", None, None).unwrap();
        assert_eq!(written, dir.path().join("content/docs/getting-started.md"));

        let text = std::fs::read_to_string(&written).unwrap();
        assert!(!text.contains("icon"));

        let page = parse_file(&dir.path().join("content"), Path::new("docs/getting-started.md")).unwrap();
        assert_eq!(page.metadata.title, "Getting-Started");
        assert!(page.body.contains("Content goes here."));
        assert!(!page.body.contains("<h1"));
    }

    #[test]
    fn test_new_page_with_title_and_icon() {
        let dir = tempfile::tempdir().unwrap();
        new_page(dir.path(), "about.md", Some("About \"us\""), Some("👋")).unwrap();

        let page = parse_file(&dir.path().join("content"), Path::new("about.md")).unwrap();
        assert_eq!(page.metadata.title, "About \"us\"");
        assert_eq!(page.metadata.icon.as_deref(), Some("👋"));

        assert!(matches!(
            new_page(dir.path(), "about.md", None, None),
            Err(ScaffoldError::PageExists(_))
        ));
    }
}
