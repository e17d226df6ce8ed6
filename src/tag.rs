//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag, the
//! [`normalize`] function which maps a tag label onto its URL path segment,
//! and the [`Chip`] type which renders a tag as a link to its index page.

use crate::util::escape;
use crate::value;
use gtmpl::Value;
use std::hash::{Hash, Hasher};
use url::{ParseError, Url};

/// Maps a free-text tag label onto its canonical form: the label is lowercased
/// and then kebab-cased, so `Rust Lang`, `rust_lang`, and `RUST--LANG` all
/// become `rust-lang`. The result only contains lowercase ASCII alphanumerics
/// and single hyphens and never starts or ends with a hyphen. Normalizing a
/// canonical form returns it unchanged.
///
/// Labels with no alphanumeric characters at all (including the empty label)
/// normalize to the empty string. Callers that build routes from tags must
/// reject those; see [`crate::parser::Error::EmptyTag`].
pub fn normalize(label: &str) -> String {
    slug::slugify(label.to_lowercase())
}

/// Represents a [`crate::post::Post`] tag. Two tags are the same tag when
/// their canonical forms are equal, regardless of how they were authored.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as it was authored in the post's frontmatter, e.g. `macOS`.
    pub label: String,

    /// The canonical form of `label` (see [`normalize`]), e.g. `macos`. This
    /// is the tag's identity and its path segment under `/tags/`.
    pub canonical: String,
}

impl Tag {
    pub fn new(label: &str) -> Tag {
        Tag {
            label: label.to_owned(),
            canonical: normalize(label),
        }
    }

    /// The URL for the tag's detail page, `{site_root}/tags/{canonical}/`.
    /// `site_root` should end in a trailing slash.
    pub fn url(&self, site_root: &Url) -> Result<Url, ParseError> {
        // NOTE: the trailing slash matters; [`Url::join`] treats the last
        // segment of a slash-less path as a file name.
        site_root.join(&format!("tags/{}/", self.canonical))
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the
    /// `canonical` field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `canonical` field.
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}
impl Eq for Tag {}

/// A tag rendered as a link to its detail page. The link text is the
/// lowercased label (`Rust Lang` → `rust lang`), while the link target uses
/// the canonical form (`/tags/rust-lang/`).
#[derive(Clone, Debug, PartialEq)]
pub struct Chip {
    pub text: String,
    pub href: Url,
}

impl Chip {
    pub fn new(label: &str, site_root: &Url) -> Result<Chip, ParseError> {
        Ok(Chip {
            text: label.to_lowercase(),
            href: Tag::new(label).url(site_root)?,
        })
    }

    pub fn render(&self) -> String {
        format!(
            r#"<a class="tag" href="{}">{}</a>"#,
            escape(self.href.as_str()),
            escape(&self.text),
        )
    }

    pub fn to_value(&self) -> Value {
        value::object(vec![
            ("text", value::string(self.text.as_str())),
            ("url", value::url(&self.href)),
            ("html", value::string(self.render())),
        ])
    }
}
