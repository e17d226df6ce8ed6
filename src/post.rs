//! Defines the [`Post`] type, the unit of content every view is built from.

use crate::tag::{Chip, Tag};
use crate::value;
use chrono::NaiveDate;
use gtmpl::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use url::{ParseError, Url};

/// The date format used on index and tag pages, e.g. `16 April, 2021`.
pub const LIST_DATE_FORMAT: &str = "%d %B, %Y";

/// The date format used on post pages, e.g. `April 16, 2021`.
pub const POST_DATE_FORMAT: &str = "%B %d, %Y";

/// Represents a blog post. Posts are produced by the content source
/// ([`crate::parser::Parser`]) and are immutable afterwards; views only ever
/// borrow them.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The URL path of the post relative to the site root, e.g. `/hello/`.
    pub slug: String,

    /// The absolute URL of the post page.
    pub url: Url,

    /// The location on disk where the post page will be written.
    pub file_path: PathBuf,

    /// The title of the post.
    pub title: String,

    /// The publish date of the post.
    pub date: NaiveDate,

    /// A plain-text summary of the body of at most
    /// [`crate::markdown::EXCERPT_LENGTH`] characters.
    pub excerpt: String,

    /// The rendered HTML body. This comes from the content source and is
    /// trusted: it's written to pages verbatim, never escaped or sanitized.
    pub body: String,

    /// A human-readable reading time estimate, e.g. `3 min read`.
    pub reading_time: String,

    /// The tags in the order they were authored, without duplicates. Two
    /// labels are duplicates when they have the same canonical form (see
    /// [`crate::tag::normalize`]); the first one authored is kept.
    pub tags: Vec<Tag>,
}

/// Removes tags which share a canonical form with an earlier tag.
pub fn dedup_tags<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .map(Tag::new)
        .filter(|tag| seen.insert(tag.canonical.clone()))
        .collect()
}

impl Post {
    /// Whether the post carries `tag`, comparing canonical forms.
    pub fn has_tag(&self, canonical: &str) -> bool {
        self.tags.iter().any(|t| t.canonical == canonical)
    }

    /// Converts the post's tags into [`Chip`]s linking to their tag pages.
    pub fn chips(&self, site_root: &Url) -> Result<Vec<Chip>, ParseError> {
        self.tags
            .iter()
            .map(|t| Chip::new(&t.label, site_root))
            .collect()
    }

    /// Converts the post into a template value for lists of posts (index and
    /// tag pages). The result has the fields `title`, `url`, `date`,
    /// `excerpt`, `reading_time`, and `tags` but not the body. The title and
    /// the excerpt are plain text, so they're HTML-escaped here.
    pub fn summarize(&self, site_root: &Url) -> Result<Value, ParseError> {
        Ok(value::object(vec![
            ("title", value::text(&self.title)),
            ("url", value::url(&self.url)),
            ("slug", value::string(self.slug.as_str())),
            (
                "date",
                value::string(self.date.format(LIST_DATE_FORMAT).to_string()),
            ),
            ("excerpt", value::text(&self.excerpt)),
            ("reading_time", value::string(self.reading_time.as_str())),
            ("tags", self.chips_value(site_root)?),
        ]))
    }

    /// Converts the post into a template value for its own page. Like
    /// [`Post::summarize`] but with the `body` and the long date format.
    pub fn to_value(&self, site_root: &Url) -> Result<Value, ParseError> {
        Ok(value::object(vec![
            ("title", value::text(&self.title)),
            ("url", value::url(&self.url)),
            ("slug", value::string(self.slug.as_str())),
            (
                "date",
                value::string(self.date.format(POST_DATE_FORMAT).to_string()),
            ),
            ("excerpt", value::text(&self.excerpt)),
            ("body", value::string(self.body.as_str())),
            ("reading_time", value::string(self.reading_time.as_str())),
            ("tags", self.chips_value(site_root)?),
        ]))
    }

    fn chips_value(&self, site_root: &Url) -> Result<Value, ParseError> {
        Ok(Value::Array(
            self.chips(site_root)?.iter().map(Chip::to_value).collect(),
        ))
    }
}


#[cfg(test)]
mod test {
    use super::fixture::post;
    use super::*;

    #[test]
    fn test_dedup_tags_keeps_first_casing() {
        let tags = dedup_tags(vec!["Go", "rust", "go", "GO ", "Rust"]);
        let labels: Vec<&str> = tags.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(vec!["Go", "rust"], labels);
    }

    #[test]
    fn test_has_tag() {
        let p = post("hello", "2021-04-16", &["Rust Lang"]);
        assert!(p.has_tag("rust-lang"));
        assert!(!p.has_tag("Rust Lang"));
    }

    #[test]
    fn test_summarize() -> Result<(), ParseError> {
        let root = Url::parse("https://example.org/")?;
        let p = post("hello", "2021-04-16", &["Rust"]);
        match p.summarize(&root)? {
            Value::Object(m) => {
                assert_eq!(
                    Some(&Value::String("16 April, 2021".to_owned())),
                    m.get("date")
                );
                assert!(m.get("body").is_none());
                match m.get("tags") {
                    Some(Value::Array(tags)) => assert_eq!(1, tags.len()),
                    other => panic!("unexpected tags value: {:?}", other),
                }
            }
            other => panic!("unexpected value: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_plain_text_is_escaped() -> Result<(), ParseError> {
        let root = Url::parse("https://example.org/")?;
        let mut p = post("generics", "2021-04-16", &[]);
        p.title = "Option<T> & friends".to_owned();
        p.excerpt = "Return an Option<String> and a 1 < 2 check.".to_owned();
        p.body = "<p>Return an <code>Option&lt;String&gt;</code></p>".to_owned();

        for value in &[p.summarize(&root)?, p.to_value(&root)?] {
            match value {
                Value::Object(m) => {
                    assert_eq!(
                        Some(&Value::String("Option&lt;T&gt; &amp; friends".to_owned())),
                        m.get("title")
                    );
                    assert_eq!(
                        Some(&Value::String(
                            "Return an Option&lt;String&gt; and a 1 &lt; 2 check.".to_owned()
                        )),
                        m.get("excerpt")
                    );
                }
                other => panic!("unexpected value: {:?}", other),
            }
        }

        // the body is already HTML
        match p.to_value(&root)? {
            Value::Object(m) => assert_eq!(
                Some(&Value::String(p.body.clone())),
                m.get("body")
            ),
            other => panic!("unexpected value: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_to_value_long_date() -> Result<(), ParseError> {
        let root = Url::parse("https://example.org/")?;
        let p = post("hello", "2021-04-06", &[]);
        match p.to_value(&root)? {
            Value::Object(m) => {
                assert_eq!(
                    Some(&Value::String("April 06, 2021".to_owned())),
                    m.get("date")
                );
                assert_eq!(
                    Some(&Value::String("<p>About hello</p>".to_owned())),
                    m.get("body")
                );
            }
            other => panic!("unexpected value: {:?}", other),
        }
        Ok(())
    }
}
