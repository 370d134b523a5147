pub mod builder;
pub mod config;
pub mod markdown;
pub mod scaffold;
pub mod site;
pub mod template;
pub mod theme;

// Re-export main types
pub use builder::{BuildError, BuildReport, BuildStage, SiteBuilder, build_site};
pub use config::{ConfigError, SiteConfig};
pub use markdown::{ContentError, parse_content, parse_file};
pub use site::{Metadata, NavigationEntry, OutputPath, Page, SiteModel};
pub use template::{TemplateError, TemplateRenderer, ensure_default_templates};
pub use theme::{ResolvedTheme, Roundness, ThemeConfig, ThemeError};
