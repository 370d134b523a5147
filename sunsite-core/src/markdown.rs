use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, TextMergeStream, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tracing::warn;

use crate::site::{FrontMatter, Metadata, Page};

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read content file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Markdown converted to HTML, plus the table of contents built from its headings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedMarkdown {
    pub html: String,
    pub toc: String,
}

/// Read and parse `relative` under `content_dir`.
pub fn parse_file(content_dir: &Path, relative: &Path) -> Result<Page, ContentError> {
    let full_path = content_dir.join(relative);
    let text = std::fs::read_to_string(&full_path).map_err(|source| ContentError::Read {
        path: full_path.clone(),
        source,
    })?;

    Ok(parse_content(&text, relative))
}

/// Parse a document. `logical_path` is the path relative to the content root and
/// supplies the fallback title.
pub fn parse_content(text: &str, logical_path: &Path) -> Page {
    let (front_matter, body) = split_front_matter(text);

    let front_matter = match front_matter {
        Some(yaml) => parse_front_matter(yaml).unwrap_or_else(|e| {
            warn!(
                "Ignoring malformed front-matter in {}: {}",
                logical_path.display(),
                e
            );
            FrontMatter::default()
        }),
        None => FrontMatter::default(),
    };

    let stem = logical_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let metadata = Metadata::from_front_matter(front_matter, &title_case(&stem));

    let body = strip_title_heading(body.trim(), &metadata.title);
    let rendered = render_markdown(&body);

    Page {
        source_path: logical_path.to_path_buf(),
        metadata,
        body: rendered.html,
        toc: rendered.toc,
    }
}

/// Split a leading `---` fenced block off the document. Without both fences the
/// whole text is body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return (None, text);
    };
    if first.trim_end() != "---" {
        return (None, text);
    }

    let mut offset = first.len();
    for line in lines {
        if line.trim_end() == "---" {
            return (Some(&text[first.len()..offset]), &text[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, text)
}

/// Parse a front-matter block. Only unparseable YAML or a block that is not a
/// mapping is an error; bad values for individual keys are dropped one by one.
pub fn parse_front_matter(yaml: &str) -> Result<FrontMatter, serde_yaml::Error> {
    match serde_yaml::from_str(yaml)? {
        serde_yaml::Value::Null => Ok(FrontMatter::default()),
        serde_yaml::Value::Mapping(mapping) => Ok(FrontMatter::from_mapping(mapping)),
        _ => Err(serde::de::Error::custom("front-matter must be a mapping")),
    }
}

/// Capitalise the first letter of every run of letters and lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }

    out
}

/// Remove the first `# <title>` line. Only an exact match is removed, and only once.
pub fn strip_title_heading<'a>(body: &'a str, title: &str) -> Cow<'a, str> {
    let heading = format!("# {title}");
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        if line.trim_end() == heading {
            let mut stripped = String::with_capacity(body.len() - line.len());
            stripped.push_str(&body[..offset]);
            stripped.push_str(&body[offset + line.len()..]);
            return Cow::Owned(stripped);
        }
        offset += line.len();
    }

    Cow::Borrowed(body)
}

struct TocEntry {
    level: usize,
    id: String,
    text: String,
}

/// Convert markdown to HTML with tables, fenced and highlighted code, heading
/// anchors with a table of contents, and `{: #id .class}` attribute lists.
pub fn render_markdown(source: &str) -> RenderedMarkdown {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES);
    let events: Vec<Event> = TextMergeStream::new(parser).collect();

    let mut processed: Vec<Event> = Vec::with_capacity(events.len());
    let mut toc: Vec<TocEntry> = Vec::new();
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut i = 0;

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::Heading { level, .. }) => {
                let level = *level as usize;
                let (mut inner, next) = collect_block(&events, i);
                i = next;

                let attrs = take_trailing_attr_list(&mut inner, false);
                let text = plain_text(&inner);
                let id = unique_id(
                    attrs.id.clone().unwrap_or_else(|| slugify(&text)),
                    &mut used_ids,
                );

                processed.push(Event::Html(
                    format!("<h{level}{}>", attrs.render_with_id(&id)).into(),
                ));
                processed.extend(inner);
                processed.push(Event::Html(format!("</h{level}>\n").into()));
                toc.push(TocEntry { level, id, text });
            }
            Event::Start(Tag::Paragraph) => {
                let (mut inner, next) = collect_block(&events, i);
                i = next;

                let attrs = take_trailing_attr_list(&mut inner, true);
                if attrs.is_empty() {
                    processed.push(Event::Start(Tag::Paragraph));
                    processed.extend(inner);
                    processed.push(Event::End(TagEnd::Paragraph));
                } else {
                    processed.push(Event::Html(format!("<p{}>", attrs.render()).into()));
                    processed.extend(inner);
                    processed.push(Event::Html("</p>\n".into()));
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let (inner, next) = collect_block(&events, i);
                i = next;

                let code: String = inner
                    .iter()
                    .filter_map(|e| match e {
                        Event::Text(t) => Some(t.as_ref()),
                        _ => None,
                    })
                    .collect();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .next()
                        .unwrap_or_default(),
                    CodeBlockKind::Indented => "",
                };

                processed.push(Event::Html(highlight_code(&code, lang).into()));
            }
            event => {
                processed.push(event.clone());
                i += 1;
            }
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, processed.into_iter());

    RenderedMarkdown {
        html: out,
        toc: render_toc(&toc),
    }
}

/// Events strictly between the `Start` at `start` and its matching `End`, and the
/// index just past that `End`.
fn collect_block<'a>(events: &[Event<'a>], start: usize) -> (Vec<Event<'a>>, usize) {
    let mut depth = 0usize;
    let mut inner = Vec::new();
    let mut i = start + 1;

    while i < events.len() {
        match &events[i] {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return (inner, i + 1),
            Event::End(_) => depth -= 1,
            _ => {}
        }
        inner.push(events[i].clone());
        i += 1;
    }

    (inner, i)
}

fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Pull an attribute list off the end of a block's final text event.
///
/// Headings carry the list on the same line; paragraphs need it alone on their
/// last line.
fn take_trailing_attr_list(inner: &mut Vec<Event>, own_line: bool) -> AttrList {
    let Some(Event::Text(last)) = inner.last() else {
        return AttrList::default();
    };

    let trimmed = last.trim_end();
    let Some(open) = trimmed.rfind('{') else {
        return AttrList::default();
    };
    if !trimmed.ends_with('}') {
        return AttrList::default();
    }
    let Some(attrs) = AttrList::parse(&trimmed[open + 1..trimmed.len() - 1]) else {
        return AttrList::default();
    };

    let before = trimmed[..open].trim_end().to_string();
    if own_line {
        if !before.is_empty() || !matches!(inner.iter().rev().nth(1), Some(Event::SoftBreak)) {
            return AttrList::default();
        }
        inner.truncate(inner.len() - 2);
    } else if before.is_empty() {
        inner.pop();
    } else if let Some(last) = inner.last_mut() {
        *last = Event::Text(before.into());
    }

    attrs
}

#[derive(Debug, Default, PartialEq)]
struct AttrList {
    id: Option<String>,
    classes: Vec<String>,
    pairs: Vec<(String, String)>,
}

impl AttrList {
    /// Parse the inside of `{: #id .class key="value"}`. Any unrecognised token
    /// means the braces were ordinary text.
    fn parse(inner: &str) -> Option<Self> {
        let inner = inner.strip_prefix(':').unwrap_or(inner);
        let mut attrs = AttrList::default();

        for token in tokenize_attrs(inner)? {
            if let Some(id) = token.strip_prefix('#') {
                if id.is_empty() {
                    return None;
                }
                attrs.id = Some(id.to_string());
            } else if let Some(class) = token.strip_prefix('.') {
                if class.is_empty() {
                    return None;
                }
                attrs.classes.push(class.to_string());
            } else if let Some((key, value)) = token.split_once('=') {
                if key.is_empty() {
                    return None;
                }
                let value = value.trim_matches(|c| c == '"' || c == '\'');
                attrs.pairs.push((key.to_string(), value.to_string()));
            } else {
                return None;
            }
        }

        if attrs.is_empty() { None } else { Some(attrs) }
    }

    fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.pairs.is_empty()
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            push_attr(&mut out, "id", id);
        }
        self.render_rest(&mut out);
        out
    }

    fn render_with_id(&self, id: &str) -> String {
        let mut out = String::new();
        push_attr(&mut out, "id", id);
        self.render_rest(&mut out);
        out
    }

    fn render_rest(&self, out: &mut String) {
        if !self.classes.is_empty() {
            push_attr(out, "class", &self.classes.join(" "));
        }
        for (key, value) in &self.pairs {
            push_attr(out, key, value);
        }
    }
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!(
        " {}=\"{}\"",
        html_escape::encode_double_quoted_attribute(key),
        html_escape::encode_double_quoted_attribute(value)
    ));
}

/// Whitespace separated tokens, keeping quoted runs together. `None` on an
/// unterminated quote.
fn tokenize_attrs(input: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                current.push(c);
                quote = Some(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }

    if quote.is_some() {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}

/// Lowercase ASCII slug: word characters kept, whitespace and hyphen runs become
/// a single hyphen, everything else dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug
}

fn unique_id(base: String, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "section".to_string() } else { base };

    let mut id = base.clone();
    let mut n = 1;
    while used.contains(&id) {
        id = format!("{base}_{n}");
        n += 1;
    }

    used.insert(id.clone());
    id
}

fn highlight_code(code: &str, lang: &str) -> String {
    let plain = || {
        format!(
            "<pre><code>{}</code></pre>\n",
            html_escape::encode_text(code)
        )
    };

    if lang.is_empty() {
        return plain();
    }

    let syntax = SYNTAX_SET.find_syntax_by_token(lang).or_else(|| {
        // Fallback mappings for unsupported languages
        match lang {
            "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
            _ => None,
        }
    });

    match (syntax, THEME_SET.themes.get(HIGHLIGHT_THEME)) {
        (Some(syntax), Some(theme)) => highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme)
            .map(|highlighted| format!("<div class=\"codehilite\">{highlighted}</div>\n"))
            .unwrap_or_else(|_| plain()),
        _ => plain(),
    }
}

fn render_toc(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut html = String::from("<div class=\"toc\">\n");
    // Levels of the currently open <ul> elements
    let mut open: Vec<usize> = Vec::new();

    for entry in entries {
        match open.last() {
            None => {
                html.push_str("<ul>\n");
                open.push(entry.level);
            }
            Some(&current) if entry.level > current => {
                html.push_str("\n<ul>\n");
                open.push(entry.level);
            }
            Some(_) => {
                html.push_str("</li>\n");
                while open.len() > 1 && open.last().is_some_and(|&l| entry.level < l) {
                    html.push_str("</ul>\n</li>\n");
                    open.pop();
                }
            }
        }

        html.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            html_escape::encode_double_quoted_attribute(&entry.id),
            html_escape::encode_text(&entry.text)
        ));
    }

    html.push_str("</li>\n");
    while open.pop().is_some() {
        html.push_str("</ul>\n");
        if !open.is_empty() {
            html.push_str("</li>\n");
        }
    }
    html.push_str("</div>\n");

    html
}
