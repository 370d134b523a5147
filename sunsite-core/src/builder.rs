use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{ConfigError, SiteConfig};
use crate::markdown::{ContentError, parse_file};
use crate::site::{NavigationEntry, OutputPath, SiteModel, sort_navigation};
use crate::template::{TemplateError, TemplateRenderer, ensure_default_templates};
use crate::theme::{ResolvedTheme, ThemeError};

pub const CONTENT_DIR: &str = "content";
pub const STATIC_DIR: &str = "static";
pub const TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_OUTPUT_DIR: &str = "_site";

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("refusing to replace output directory {}: it contains project files", .0.display())]
    UnsafeOutputDir(PathBuf),
    #[error("{} and {} both map to {}", first.display(), second.display(), output.display())]
    DuplicateOutput {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },
    #[error("failed to scan {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to write {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn output_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Output { path, source }
}

/// Build stages, entered strictly in order. A failure in any stage aborts the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Init,
    ConfigLoaded,
    OutputPrepared,
    NavigationCollected,
    PagesEmitted,
    Done,
}

/// What a finished build produced.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Written pages, relative to the output directory, in discovery order.
    pub pages: Vec<PathBuf>,
    pub navigation: Vec<NavigationEntry>,
    /// Default templates materialised into the project during this build.
    pub created_templates: Vec<PathBuf>,
}

/// Everything fixed once configuration is loaded.
struct Prepared {
    config: SiteConfig,
    theme: ResolvedTheme,
    renderer: TemplateRenderer,
    created_templates: Vec<PathBuf>,
}

pub struct SiteBuilder {
    project_dir: PathBuf,
    output_dir: PathBuf,
    stage: BuildStage,
}

impl SiteBuilder {
    pub fn new<P: AsRef<Path>>(project_dir: P) -> Self {
        let project_dir = project_dir.as_ref().to_path_buf();
        Self {
            output_dir: project_dir.join(DEFAULT_OUTPUT_DIR),
            project_dir,
            stage: BuildStage::Init,
        }
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn content_dir(&self) -> PathBuf {
        self.project_dir.join(CONTENT_DIR)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.project_dir.join(STATIC_DIR)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.project_dir.join(TEMPLATES_DIR)
    }

    /// Run every stage in order. The same builder can build again.
    pub fn build(&mut self) -> Result<BuildReport, BuildError> {
        self.stage = BuildStage::Init;

        let prepared = self.load_config()?;
        self.prepare_output()?;

        let sources = discover_content(&self.content_dir())?;
        let site = self.collect_navigation(&prepared.config, &sources)?;
        let pages = self.emit_pages(&sources, &site, &prepared)?;

        self.enter(BuildStage::Done);

        Ok(BuildReport {
            pages,
            navigation: site.navigation,
            created_templates: prepared.created_templates,
        })
    }

    fn enter(&mut self, stage: BuildStage) {
        debug_assert!(stage > self.stage, "{stage:?} entered after {:?}", self.stage);
        info!("Build stage: {:?}", stage);
        self.stage = stage;
    }

    fn load_config(&mut self) -> Result<Prepared, BuildError> {
        let config = SiteConfig::load(&self.project_dir)?;
        let theme = config.theme.resolve()?;

        let created_templates = ensure_default_templates(self.templates_dir())?;
        for path in &created_templates {
            info!("Created default template {}", path.display());
        }
        let renderer = TemplateRenderer::new(self.templates_dir())?;

        self.enter(BuildStage::ConfigLoaded);
        Ok(Prepared {
            config,
            theme,
            renderer,
            created_templates,
        })
    }

    fn prepare_output(&mut self) -> Result<(), BuildError> {
        self.check_output_dir()?;

        if self.output_dir.exists() {
            std::fs::remove_dir_all(&self.output_dir).map_err(output_error(&self.output_dir))?;
        }
        std::fs::create_dir_all(&self.output_dir).map_err(output_error(&self.output_dir))?;

        let static_dir = self.static_dir();
        if static_dir.is_dir() {
            copy_dir(&static_dir, &self.output_dir)?;
        }

        self.enter(BuildStage::OutputPrepared);
        Ok(())
    }

    /// The output directory is wiped, so it must not hold any project input.
    fn check_output_dir(&self) -> Result<(), BuildError> {
        let Ok(output) = self.output_dir.canonicalize() else {
            // Nothing there yet, nothing to lose
            return Ok(());
        };

        let inputs = [
            self.project_dir.clone(),
            self.content_dir(),
            self.static_dir(),
            self.templates_dir(),
        ];
        let unsafe_output = inputs
            .iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .any(|dir| dir.starts_with(&output));

        if unsafe_output {
            return Err(BuildError::UnsafeOutputDir(self.output_dir.clone()));
        }
        Ok(())
    }

    fn collect_navigation(
        &mut self,
        config: &SiteConfig,
        sources: &[PathBuf],
    ) -> Result<SiteModel, BuildError> {
        let content_dir = self.content_dir();
        let mut outputs: HashMap<OutputPath, &PathBuf> = HashMap::new();
        let mut navigation = Vec::new();

        for source in sources {
            let page = parse_file(&content_dir, source)?;

            let out = page.out_path();
            if let Some(first) = outputs.insert(out.clone(), source) {
                return Err(BuildError::DuplicateOutput {
                    first: first.clone(),
                    second: source.clone(),
                    output: out.relative().to_path_buf(),
                });
            }

            match page.nav_entry() {
                Some(entry) => navigation.push(entry),
                None => debug!("Hidden from navigation: {}", source.display()),
            }
        }

        sort_navigation(&mut navigation);

        self.enter(BuildStage::NavigationCollected);
        Ok(SiteModel {
            title: config.title.clone(),
            description: config.description.clone(),
            navigation,
        })
    }

    fn emit_pages(
        &mut self,
        sources: &[PathBuf],
        site: &SiteModel,
        prepared: &Prepared,
    ) -> Result<Vec<PathBuf>, BuildError> {
        let content_dir = self.content_dir();
        let mut written = Vec::with_capacity(sources.len());

        for source in sources {
            let page = parse_file(&content_dir, source)?;
            let html = prepared.renderer.render(&page, site, &prepared.theme)?;

            let relative = page.out_path().relative().to_path_buf();
            let output_path = self.output_dir.join(&relative);
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent).map_err(output_error(parent))?;
            }
            std::fs::write(&output_path, html).map_err(output_error(&output_path))?;

            info!("Generated {}", output_path.display());
            written.push(relative);
        }

        self.enter(BuildStage::PagesEmitted);
        Ok(written)
    }
}

/// Build the project at `project_dir` into `output_dir`.
pub fn build_site<P: AsRef<Path>, Q: AsRef<Path>>(
    project_dir: P,
    output_dir: Q,
) -> Result<BuildReport, BuildError> {
    SiteBuilder::new(project_dir).output_dir(output_dir).build()
}

/// Markdown documents under `content_dir`, relative to it, in a stable order.
pub fn discover_content(content_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    if !content_dir.is_dir() {
        warn!("No content directory at {}", content_dir.display());
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(content_dir).sort_by_file_name() {
        let entry = entry.map_err(|source| BuildError::Walk {
            path: content_dir.to_path_buf(),
            source,
        })?;

        let is_markdown = entry
            .path()
            .extension()
            .is_some_and(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| ext == *m));
        if !entry.file_type().is_file() || !is_markdown {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(content_dir) {
            debug!("Discovered {}", relative.display());
            sources.push(relative.to_path_buf());
        }
    }

    Ok(sources)
}

/// Copy every file under `from` into `to`, keeping relative paths and
/// overwriting what is already there.
fn copy_dir(from: &Path, to: &Path) -> Result<(), BuildError> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|source| BuildError::Walk {
            path: from.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(output_error(parent))?;
        }
        std::fs::copy(entry.path(), &target).map_err(output_error(&target))?;
        debug!("Copied {}", relative.display());
    }

    Ok(())
}
