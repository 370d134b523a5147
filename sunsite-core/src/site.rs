use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::warn;

pub const DEFAULT_NAV_WEIGHT: f64 = 999.0;

/// Unreserved URL characters: A-Z a-z 0-9 - . _ ~
pub(crate) const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Front-matter exactly as written in the document.
#[derive(Debug, Default, Clone)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub nav_title: Option<String>,
    pub nav_weight: Option<f64>,
    pub hide_in_nav: bool,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    /// Read the recognised keys one at a time. A key with an unusable value is
    /// skipped with a warning and the rest of the block is kept.
    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut front_matter = FrontMatter::default();

        for (key, value) in mapping {
            let Some(key) = scalar_string(&key) else {
                warn!("Ignoring front-matter key that is not a scalar: {key:?}");
                continue;
            };

            match key.as_str() {
                "title" => front_matter.title = text_field(&key, &value),
                "nav_title" => front_matter.nav_title = text_field(&key, &value),
                "icon" => front_matter.icon = text_field(&key, &value),
                "description" => front_matter.description = text_field(&key, &value),
                "nav_weight" => front_matter.nav_weight = weight_field(&value),
                "hide_in_nav" => front_matter.hide_in_nav = truthy(&value),
                _ => {
                    front_matter.extra.insert(key, value);
                }
            }
        }

        front_matter
    }
}

/// Strings, numbers and booleans as text. `None` for null and collections.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn text_field(key: &str, value: &Value) -> Option<String> {
    let text = scalar_string(value);
    if text.is_none() && !value.is_null() {
        warn!("Ignoring front-matter '{key}': expected text");
    }
    text
}

fn weight_field(value: &Value) -> Option<f64> {
    let weight = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if weight.is_none() && !value.is_null() {
        warn!("Ignoring front-matter 'nav_weight': expected a number");
    }
    weight
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

/// Page metadata with every default applied. `title` is always set.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub nav_title: Option<String>,
    pub nav_weight: f64,
    pub hide_in_nav: bool,
    pub icon: Option<String>,
    pub description: Option<String>,
    /// Any other front-matter keys, passed through to templates.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    pub fn from_front_matter(front_matter: FrontMatter, fallback_title: &str) -> Self {
        Self {
            title: front_matter
                .title
                .unwrap_or_else(|| fallback_title.to_string()),
            nav_title: front_matter.nav_title,
            nav_weight: front_matter.nav_weight.unwrap_or(DEFAULT_NAV_WEIGHT),
            hide_in_nav: front_matter.hide_in_nav,
            icon: front_matter.icon,
            description: front_matter.description,
            extra: front_matter.extra,
        }
    }

    /// Label used in the site navigation.
    pub fn nav_label(&self) -> &str {
        self.nav_title.as_deref().unwrap_or(&self.title)
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    /// Path relative to the content root.
    pub source_path: PathBuf,
    pub metadata: Metadata,
    pub body: String,
    pub toc: String,
}

impl Page {
    pub fn out_path(&self) -> OutputPath {
        OutputPath::for_source(&self.source_path)
    }

    pub fn url(&self) -> String {
        self.out_path().url()
    }

    /// Navigation entry for this page, or `None` when it is hidden from navigation.
    pub fn nav_entry(&self) -> Option<NavigationEntry> {
        if self.metadata.hide_in_nav {
            return None;
        }

        Some(NavigationEntry {
            title: self.metadata.nav_label().to_string(),
            url: self.url(),
            weight: self.metadata.nav_weight,
        })
    }
}

/// Where a content document is written, relative to the output root.
///
/// `index` documents keep their directory (`docs/index.md` → `docs/index.html`),
/// everything else swaps its extension (`docs/guide.md` → `docs/guide.html`).
/// Navigation URLs are derived from the same value so the two cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputPath(PathBuf);

impl OutputPath {
    pub fn for_source(relative: &Path) -> Self {
        let is_index = relative
            .file_stem()
            .is_some_and(|stem| stem == "index");

        if is_index {
            OutputPath(relative.with_file_name("index.html"))
        } else {
            OutputPath(relative.with_extension("html"))
        }
    }

    pub fn relative(&self) -> &Path {
        &self.0
    }

    /// Site-root-relative URL. Directory indexes collapse to their directory.
    /// Segments are percent-encoded, so the URL is safe inside an attribute.
    pub fn url(&self) -> String {
        let segments: Vec<String> = self
            .0
            .components()
            .map(|c| utf8_percent_encode(&c.as_os_str().to_string_lossy(), URL_SEGMENT).to_string())
            .collect();

        match segments.split_last() {
            Some((last, dirs)) if last == "index.html" => {
                if dirs.is_empty() {
                    "/".to_string()
                } else {
                    format!("/{}/", dirs.join("/"))
                }
            }
            _ => format!("/{}", segments.join("/")),
        }
    }

    /// Interpret a site URL produced by [`OutputPath::url`] as an output path.
    #[cfg(test)]
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim_start_matches('/');
        let mut path = PathBuf::new();
        for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
            let segment = percent_encoding::percent_decode_str(segment).decode_utf8_lossy();
            path.push(&*segment);
        }
        if url.ends_with('/') {
            path.push("index.html");
        }
        OutputPath(path)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NavigationEntry {
    pub title: String,
    pub url: String,
    pub weight: f64,
}

/// Stable sort by ascending weight. Equal weights keep discovery order.
pub fn sort_navigation(entries: &mut [NavigationEntry]) {
    entries.sort_by(|a, b| a.weight.total_cmp(&b.weight));
}

/// Site-wide data shared read-only by every page render.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SiteModel {
    pub title: String,
    pub description: String,
    pub navigation: Vec<NavigationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, weight: f64) -> NavigationEntry {
        NavigationEntry {
            title: title.into(),
            url: format!("/{}.html", title.to_lowercase()),
            weight,
        }
    }

    #[test]
    fn test_output_paths() {
        let out = |p: &str| OutputPath::for_source(Path::new(p));
        assert_eq!(out("index.md").relative(), Path::new("index.html"));
        assert_eq!(out("docs/index.md").relative(), Path::new("docs/index.html"));
        assert_eq!(out("docs/guide.md").relative(), Path::new("docs/guide.html"));
        assert_eq!(out("a/b/c.markdown").relative(), Path::new("a/b/c.html"));
    }

    #[test]
    fn test_urls() {
        let url = |p: &str| OutputPath::for_source(Path::new(p)).url();
        assert_eq!(url("index.md"), "/");
        assert_eq!(url("docs/index.md"), "/docs/");
        assert_eq!(url("docs/guide.md"), "/docs/guide.html");
        assert_eq!(url("about.md"), "/about.html");
    }

    #[test]
    fn test_urls_are_percent_encoded() {
        let url = |p: &str| OutputPath::for_source(Path::new(p)).url();
        assert_eq!(url("say \"hi\".md"), "/say%20%22hi%22.html");
        assert_eq!(url("notes/café.md"), "/notes/caf%C3%A9.html");
        assert_eq!(url("my docs/index.md"), "/my%20docs/");
    }

    #[test]
    fn test_url_round_trips_to_output_path() {
        for p in [
            "index.md",
            "say \"hi\".md",
            "my docs/index.md",
            "about.md",
            "docs/index.md",
            "docs/guide.md",
            "a/b/index.md",
            "a/b/deep.md",
        ] {
            let out = OutputPath::for_source(Path::new(p));
            assert_eq!(OutputPath::from_url(&out.url()), out, "{p}");
        }
    }

    #[test]
    fn test_navigation_sort_is_stable() {
        let mut nav = vec![
            entry("Zeta", 999.0),
            entry("Alpha", 2.0),
            entry("Home", 999.0),
            entry("Guide", 1.0),
            entry("Beta", 2.0),
        ];
        sort_navigation(&mut nav);
        let titles: Vec<&str> = nav.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Guide", "Alpha", "Beta", "Zeta", "Home"]);
    }

    #[test]
    fn test_hidden_page_has_no_nav_entry() {
        let mut page = Page {
            source_path: PathBuf::from("docs/hidden.md"),
            metadata: Metadata::from_front_matter(FrontMatter::default(), "Hidden"),
            body: String::new(),
            toc: String::new(),
        };
        assert!(page.nav_entry().is_some());

        page.metadata.hide_in_nav = true;
        assert!(page.nav_entry().is_none());
    }

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_front_matter_keys_recover_independently() {
        let front_matter = FrontMatter::from_mapping(mapping(
            "title: 404\nhide_in_nav: true\nnav_weight: [1]\nicon: {a: b}\nlayout: wide\n",
        ));
        assert_eq!(front_matter.title.as_deref(), Some("404"));
        assert!(front_matter.hide_in_nav);
        assert_eq!(front_matter.nav_weight, None);
        assert_eq!(front_matter.icon, None);
        assert_eq!(
            front_matter.extra.get("layout"),
            Some(&Value::String("wide".into()))
        );
    }

    #[test]
    fn test_front_matter_scalar_coercion() {
        let front_matter = FrontMatter::from_mapping(mapping(
            "title: true\nnav_weight: \"2.5\"\nhide_in_nav: 0\ndescription: ~\n",
        ));
        assert_eq!(front_matter.title.as_deref(), Some("true"));
        assert_eq!(front_matter.nav_weight, Some(2.5));
        assert!(!front_matter.hide_in_nav);
        assert_eq!(front_matter.description, None);

        let metadata = Metadata::from_front_matter(
            FrontMatter::from_mapping(mapping("nav_weight: 3\n")),
            "Fallback",
        );
        assert_eq!(metadata.nav_weight, 3.0);
        assert_eq!(metadata.title, "Fallback");
    }

    #[test]
    fn test_nav_title_overrides_title() {
        let front_matter = FrontMatter {
            title: Some("Frequently Asked Questions".into()),
            nav_title: Some("FAQ".into()),
            nav_weight: Some(5.0),
            ..FrontMatter::default()
        };
        let page = Page {
            source_path: PathBuf::from("faq.md"),
            metadata: Metadata::from_front_matter(front_matter, "Faq"),
            body: String::new(),
            toc: String::new(),
        };
        assert_eq!(
            page.nav_entry(),
            Some(NavigationEntry {
                title: "FAQ".into(),
                url: "/faq.html".into(),
                weight: 5.0,
            })
        );
    }
}
