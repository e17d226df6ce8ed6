//! Converts post bodies from Markdown to HTML and derives the plain-text
//! excerpt and reading-time estimate from the same event stream.

use crate::url::Converter as LinkConverter;
use pulldown_cmark::*;
use url::{ParseError as UrlParseError, Url};

/// The maximum length of an excerpt in characters, ellipsis included.
pub const EXCERPT_LENGTH: usize = 160;

/// Reading speed used for reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

const ELLIPSIS: char = '…';

/// The outputs of [`render`].
#[derive(Debug, PartialEq)]
pub struct Rendered {
    pub html: String,
    pub excerpt: String,
    pub reading_time: String,
}

/// Converts markdown to HTML.
///
/// * `site_root` is the prefix for post URLs (e.g. https://example.org/).
///   This should end in a trailing slash.
/// * `source_path` is the relative path to the source file from the posts
///   directory.
/// * `markdown` is the post body (the source file less its frontmatter).
pub fn render(
    site_root: &Url,
    source_path: &str,
    markdown: &str,
) -> Result<Rendered, UrlParseError> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter {
        link_converter: LinkConverter::new(site_root, source_path)?,
    };
    let events = Parser::new_ext(markdown, options)
        .map(|ev| event_converter.convert(ev))
        .collect::<Result<Vec<Event>, UrlParseError>>()?;

    let text = plain_text(&events);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html, events.into_iter());
    Ok(Rendered {
        html,
        excerpt: excerpt(&text, EXCERPT_LENGTH),
        reading_time: reading_time(&text),
    })
}

struct EventConverter<'a> {
    link_converter: LinkConverter<'a>,
}

impl<'a> EventConverter<'a> {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Result<Tag<'b>, UrlParseError> {
        Ok(match tag {
            // Links to other posts need to be converted from their source
            // format to their output format (e.g., a post linking to another
            // post as `foo.md` will need to point to `foo/`).
            Tag::Link(
                link @ (LinkType::Inline
                | LinkType::Reference
                | LinkType::ReferenceUnknown
                | LinkType::Shortcut
                | LinkType::ShortcutUnknown
                | LinkType::Collapsed
                | LinkType::CollapsedUnknown),
                url,
                title,
            ) => Tag::Link(
                link,
                CowStr::Boxed(self.link_converter.convert(&url)?.into_boxed_str()),
                title,
            ),
            _ => tag,
        })
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Result<Event<'b>, UrlParseError> {
        Ok(match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)?),
            _ => ev,
        })
    }
}

/// Collects the readable text of a document: text and inline code, with
/// block boundaries and line breaks turned into spaces. Raw HTML is skipped.
fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for ev in events {
        match ev {
            Event::Text(s) | Event::Code(s) => text.push_str(s),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(Tag::Paragraph)
            | Event::End(Tag::Heading(_))
            | Event::End(Tag::Item)
            | Event::End(Tag::CodeBlock(_))
            | Event::End(Tag::TableCell) => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Collapses whitespace in `text` and prunes it to at most `max` characters.
/// Pruning happens on a word boundary when there is one and appends an
/// ellipsis, which counts towards `max`.
pub fn excerpt(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    if collapsed.chars().count() <= max || max == 0 {
        return collapsed;
    }

    // Leave room for the ellipsis.
    let budget = max - 1;
    let cut = collapsed
        .char_indices()
        .nth(budget)
        .map(|(i, _)| i)
        .unwrap_or_else(|| collapsed.len());
    let head = &collapsed[..cut];

    // If the cut landed mid-word, back up to the last space.
    let head = match collapsed[cut..].starts_with(' ') {
        true => head,
        false => match head.rfind(' ') {
            Some(i) => &head[..i],
            None => head,
        },
    };

    let mut out = head.trim_end().to_owned();
    out.push(ELLIPSIS);
    out
}

/// Estimates how long `text` takes to read, e.g. `3 min read`.
pub fn reading_time(text: &str) -> String {
    let words = text.split_whitespace().count();
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    format!("{} min read", minutes)
}

#[cfg(test)]
mod test {
    use super::*;

    fn root() -> Url {
        Url::parse("https://example.org/").unwrap()
    }

    #[test]
    fn test_render_html() -> Result<(), UrlParseError> {
        let rendered = render(&root(), "hello.md", "# Hi\n\nSee [other](other.md).")?;
        assert_eq!(
            "<h1>Hi</h1>\n<p>See <a href=\"https://example.org/other/\">other</a>.</p>\n",
            rendered.html
        );
        assert_eq!("Hi See other.", rendered.excerpt);
        assert_eq!("1 min read", rendered.reading_time);
        Ok(())
    }

    #[test]
    fn test_render_skips_raw_html_in_excerpt() -> Result<(), UrlParseError> {
        let rendered = render(&root(), "hello.md", "Intro\n\n<div>widget</div>\n\nOutro")?;
        assert_eq!("Intro Outro", rendered.excerpt);
        assert!(rendered.html.contains("<div>widget</div>"));
        Ok(())
    }

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!("a b c", excerpt("  a\n b\t\tc ", 160));
    }

    #[test]
    fn test_excerpt_prunes_on_word_boundary() {
        let text = "alpha beta gamma delta";
        assert_eq!("alpha beta…", excerpt(text, 13));
        assert_eq!("alpha beta…", excerpt(text, 12));
        assert_eq!("alpha…", excerpt(text, 10));
    }

    #[test]
    fn test_excerpt_length_bound() {
        let text = "word ".repeat(100);
        let out = excerpt(&text, EXCERPT_LENGTH);
        assert!(out.chars().count() <= EXCERPT_LENGTH);
        assert!(out.ends_with(ELLIPSIS));
        assert!(!out.contains("wor…"));
    }

    #[test]
    fn test_excerpt_single_long_word() {
        let text = "x".repeat(20);
        assert_eq!(format!("{}…", "x".repeat(9)), excerpt(&text, 10));
    }

    #[test]
    fn test_excerpt_multibyte() {
        let text = "ééééé ééééé";
        assert_eq!("ééééé…", excerpt(text, 8));
    }

    #[test]
    fn test_reading_time() {
        assert_eq!("0 min read", reading_time(""));
        assert_eq!("1 min read", reading_time("one"));
        assert_eq!("1 min read", reading_time(&"w ".repeat(200)));
        assert_eq!("2 min read", reading_time(&"w ".repeat(201)));
    }
}
