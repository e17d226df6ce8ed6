//! Rewrites links found in post sources so that links between posts point at
//! the rendered post pages rather than at the Markdown files.

use url::{ParseError, Url};

const MARKDOWN_EXTENSION: &str = ".md";
const BUNDLE_INDEX: &str = "/index.md";

pub struct Converter<'a> {
    site_root: &'a Url,
    base: Url,
}

impl<'a> Converter<'a> {
    /// Constructs a new `Converter`
    ///
    /// # Arguments
    ///
    /// * `site_root` - the URL prefix for posts. Every post `foo.md` (or
    ///   bundle `foo/index.md`) is rendered at `{site_root}foo/`.
    /// * `base` - the path of the source file containing the links, relative
    ///   to the posts source directory (e.g. `foo.md` or `foo/index.md`).
    pub fn new(site_root: &'a Url, base: &str) -> Result<Converter<'a>> {
        Ok(Converter {
            site_root,
            base: site_root.join(base)?,
        })
    }

    /// Maps a post source path relative to the posts directory onto the post
    /// page path (`foo.md` → `foo/`, `foo/index.md` → `foo/`).
    fn page_path(relative: &str) -> String {
        let stem = if relative.ends_with(BUNDLE_INDEX) {
            &relative[..relative.len() - BUNDLE_INDEX.len()]
        } else {
            relative.strip_suffix(MARKDOWN_EXTENSION).unwrap_or(relative)
        };
        format!("{}/", stem)
    }

    fn convert_absolute(&self, mut absolute: Url) -> Result<Url> {
        let fragment = absolute.fragment().map(str::to_owned);
        absolute.set_fragment(None);
        if let Some(relative) = self.site_root.make_relative(&absolute) {
            if !relative.starts_with("../")
                && absolute.query().is_none()
                && relative.ends_with(MARKDOWN_EXTENSION)
            {
                let mut page = self.site_root.join(&Self::page_path(&relative))?;
                page.set_fragment(fragment.as_deref());
                return Ok(page);
            }
        }
        absolute.set_fragment(fragment.as_deref());
        Ok(absolute)
    }

    fn convert_unknown(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(absolute) => self.convert_absolute(absolute),
            Err(ParseError::RelativeUrlWithoutBase) => {
                self.convert_absolute(self.base.join(url)?)
            }
            Err(e) => Err(e),
        }
    }

    pub fn convert(&self, url: &str) -> Result<String> {
        // In-page anchors resolve against the rendered page, not the source
        // file, so they're left alone.
        if url.starts_with('#') {
            return Ok(url.to_owned());
        }
        Ok(self.convert_unknown(url)?.to_string())
    }
}

type Result<T> = std::result::Result<T, ParseError>;
