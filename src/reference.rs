//! Reference extraction for static asset links embedded in text files.
//!
//! Four fixed shapes are recognized; each yields a prefix literal, the URL and
//! a suffix literal so callers can rewrite the URL without touching the rest.
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::LazyLock;

static LINK_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<link.*?href=")(.*?)(".*?>)"#).expect("regex for link href references")
});
static QUOTED_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(")([^\s]*?\.js)(")"#).expect("regex for quoted script references")
});
static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<img.*?src=")(.*?)(".*?>)"#).expect("regex for img src references")
});
static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(url\(")(.*?)("\))"#).expect("regex for css url references"));

/// Syntactic shape a reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceShape {
    LinkHref,
    QuotedScript,
    ImgSrc,
    CssUrl,
}

impl ReferenceShape {
    /// Shapes in the order they are applied to a buffer.
    pub const ALL: [ReferenceShape; 4] = [
        ReferenceShape::LinkHref,
        ReferenceShape::QuotedScript,
        ReferenceShape::ImgSrc,
        ReferenceShape::CssUrl,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReferenceShape::LinkHref => "link_href",
            ReferenceShape::QuotedScript => "quoted_script",
            ReferenceShape::ImgSrc => "img_src",
            ReferenceShape::CssUrl => "css_url",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            ReferenceShape::LinkHref => &LINK_HREF,
            ReferenceShape::QuotedScript => &QUOTED_SCRIPT,
            ReferenceShape::ImgSrc => &IMG_SRC,
            ReferenceShape::CssUrl => &CSS_URL,
        }
    }
}

/// One match of a reference shape, borrowed from the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub shape: ReferenceShape,
    /// Byte range of the whole match (prefix through suffix).
    pub span: Range<usize>,
    pub prefix: &'a str,
    pub url: &'a str,
    pub suffix: &'a str,
}

impl Reference<'_> {
    /// Final `/`-delimited segment of the URL.
    pub fn file_name(&self) -> &str {
        file_name(self.url)
    }
}

/// Scan `text` left to right for non-overlapping matches of `shape`.
pub fn extract(text: &str, shape: ReferenceShape) -> Vec<Reference<'_>> {
    shape
        .regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Reference {
                shape,
                span: whole.range(),
                prefix: caps.get(1)?.as_str(),
                url: caps.get(2)?.as_str(),
                suffix: caps.get(3)?.as_str(),
            })
        })
        .collect()
}

/// Final `/`-delimited segment of a URL.
pub fn file_name(url: &str) -> &str {
    url.rsplit_once('/').map_or(url, |(_, name)| name)
}

/// Extension allow-list deciding which URLs are replacement candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(Vec<String>);

impl Extensions {
    /// Parse a comma-separated list such as `"css, js,png"`.
    pub fn parse(list: &str) -> Self {
        Extensions(
            list.split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True when the URL ends with `.<ext>` for a configured extension.
    ///
    /// The comparison is case-sensitive.
    pub fn is_replaceable(&self, url: &str) -> bool {
        self.0.iter().any(|ext| {
            url.strip_suffix(ext.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}
