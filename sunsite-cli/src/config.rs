use anyhow::Result;
use clap::ArgMatches;
use clap::parser::ValueSource;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sunsite_core::SiteConfig;

const PROJECT_ENV: &str = "SUNSITE_BUILD__PROJECT";

/// Command-line settings merged from defaults, the project config file,
/// environment variables and flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SunsiteConfig {
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Project directory holding content/, static/, templates/ and the config file
    pub project: String,
    /// Output directory for the generated site
    pub output: String,
    /// Host for the dev server
    pub host: String,
    /// Port for the dev server
    pub port: u16,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project: ".".to_string(),
            output: "_site".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Value of `id` only when it was typed on the command line. Defaults declared on
/// the clap argument must not mask the config file or environment.
fn from_command_line(args: &ArgMatches, id: &str) -> Option<String> {
    if !args.try_contains_id(id).unwrap_or(false) {
        return None;
    }
    if args.value_source(id) != Some(ValueSource::CommandLine) {
        return None;
    }
    if let Ok(Some(port)) = args.try_get_one::<u16>(id) {
        return Some(port.to_string());
    }
    args.try_get_one::<String>(id).ok().flatten().cloned()
}

impl SunsiteConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (SUNSITE_BUILD__*)
    /// 3. `build` section of the project config file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        // The project directory decides which config file is read, so resolve it
        // from the flag or the environment before layering.
        let typed_project = from_command_line(args, "project");
        let project = typed_project
            .clone()
            .or_else(|| std::env::var(PROJECT_ENV).ok())
            .unwrap_or_else(|| BuildConfig::default().project);

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        // 2. Add the project config file if there is one
        if let Some(path) = SiteConfig::locate(&project) {
            builder = builder.add_source(File::from(path).required(false));
        }

        // 3. Add environment variables with SUNSITE_ prefix
        builder = builder.add_source(
            Environment::with_prefix("SUNSITE")
                .prefix_separator("_")
                .separator("__"), // Use double underscore for nested keys
        );

        // 4. Override with CLI arguments that were actually given
        if let Some(project) = typed_project {
            builder = builder.set_override("build.project", project)?;
        }
        for key in ["output", "host", "port"] {
            if let Some(value) = from_command_line(args, key) {
                builder = builder.set_override(format!("build.{key}"), value)?;
            }
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

impl BuildConfig {
    pub fn project_dir(&self) -> PathBuf {
        PathBuf::from(&self.project)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }
}
