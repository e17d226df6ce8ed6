//! Defines the [`Parser`] and [`Error`] types: the logic for reading posts
//! from the file system into memory. Each post is a Markdown file (or a
//! bundle directory with an `index.md` and its assets) which starts with a
//! YAML frontmatter block.

use std::{
    fmt,
    fs::{read_dir, File},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    markdown,
    post::{dedup_tags, Post},
};

const MARKDOWN_EXTENSION: &str = "md";
const BUNDLE_INDEX: &str = "index.md";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `site_root` is the base URL for post pages. A post whose source is
    /// `foo.md` or `foo/index.md` gets the URL `{site_root}foo/`.
    site_root: &'a Url,

    /// `output_directory` is the directory in which post pages will be
    /// rendered (`{output_directory}/foo/index.html`).
    output_directory: &'a Path,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(site_root: &'a Url, output_directory: &'a Path) -> Parser<'a> {
        Parser {
            site_root,
            output_directory,
        }
    }

    fn parse_post_bundle(
        &self,
        posts_source_directory: &Path,
        relative_path: &Path,
        static_files: &mut Vec<StaticFile>,
    ) -> Result<Option<Post>> {
        // We want to make sure we can parse a post before we mutate
        // `static_files`
        let post = match self
            .parse_post(posts_source_directory, &relative_path.join(BUNDLE_INDEX))?
        {
            Some(post) => post,
            None => return Ok(None),
        };

        use walkdir::WalkDir;
        let abs = posts_source_directory.join(relative_path);
        for result in WalkDir::new(&abs).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
            let entry = result?;
            if entry.file_type().is_file() && entry.path() != abs.join(BUNDLE_INDEX) {
                // strip_prefix shouldn't fail since `abs` is always an
                // ancestor of the entry
                let relative_asset = entry
                    .path()
                    .strip_prefix(&abs)
                    .map_err(|_| InvalidFileNameError(entry.path().to_owned()))?;
                static_files.push((
                    entry.path().to_owned(),
                    self.output_directory
                        .join(relative_path)
                        .join(relative_asset),
                ));
            }
        }

        Ok(Some(post))
    }

    /// Parses a single [`Post`] from a source file. `relative_path` is the
    /// path of the file relative to `posts_source_directory`. Returns `None`
    /// for drafts.
    fn parse_post(
        &self,
        posts_source_directory: &Path,
        relative_path: &Path,
    ) -> Result<Option<Post>> {
        match self._parse_post(posts_source_directory, relative_path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(
        &self,
        posts_source_directory: &Path,
        relative_path: &Path,
    ) -> Result<Option<Post>> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(posts_source_directory.join(relative_path))?
            .read_to_string(&mut contents)?;

        let (frontmatter, body) = split_frontmatter(&contents)?;
        let frontmatter: Frontmatter = serde_yaml::from_str(frontmatter)?;
        if frontmatter.draft {
            info!(path = %relative_path.display(), "skipping draft");
            return Ok(None);
        }

        let stem = post_stem(relative_path)?;
        let source_path = relative_path
            .to_str()
            .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?
            .replace('\\', "/");

        for label in &frontmatter.tags {
            if crate::tag::normalize(label).is_empty() {
                return Err(Error::EmptyTag(label.clone()));
            }
        }

        let rendered = markdown::render(self.site_root, &source_path, body)?;
        let slug = format!("/{}/", stem);
        let post = Post {
            title: match frontmatter.title {
                Some(title) if !title.trim().is_empty() => title,
                _ => slug.clone(),
            },
            date: parse_date(&frontmatter.date)?,
            url: self.site_root.join(&format!("{}/", stem))?,
            file_path: self.output_directory.join(&stem).join("index.html"),
            slug,
            excerpt: rendered.excerpt,
            body: rendered.html,
            reading_time: rendered.reading_time,
            tags: dedup_tags(frontmatter.tags.iter().map(String::as_str)),
        };
        debug!(slug = %post.slug, tags = post.tags.len(), "parsed post");
        Ok(Some(post))
    }

    /// Searches a provided `source_directory` for post files (extension =
    /// `.md`) and bundles (directories with an `index.md` file) and returns
    /// the list of [`Post`] objects sorted by date (most recent first) along
    /// with the bundle assets that need to be copied. Posts with the same date
    /// stay in file name order. Each post file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title`, `date`, and optionally `tags`
    ///    and `draft`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// tags: [greet]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Posts> {
        let mut entries = read_dir(source_directory)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut posts = Vec::new();
        let mut static_files = Vec::new();
        for entry in entries {
            // should never fail
            let relative_path = entry
                .path()
                .strip_prefix(source_directory)
                .map_err(|_| InvalidFileNameError(entry.path()))?
                .to_owned();
            let post = if Self::is_bundle(&entry)? {
                self.parse_post_bundle(source_directory, &relative_path, &mut static_files)?
            } else if entry.file_type()?.is_file()
                && relative_path.extension().map_or(false, |e| e == MARKDOWN_EXTENSION)
            {
                self.parse_post(source_directory, &relative_path)?
            } else {
                None
            };
            posts.extend(post);
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date));
        info!(
            posts = posts.len(),
            assets = static_files.len(),
            "parsed posts from {}",
            source_directory.display()
        );
        Ok((posts, static_files))
    }

    fn is_bundle(entry: &std::fs::DirEntry) -> std::io::Result<bool> {
        Ok(entry.file_type()?.is_dir() && entry.path().join(BUNDLE_INDEX).is_file())
    }
}

/// Splits a post source into its YAML frontmatter and its Markdown body.
fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    match input[FENCE.len()..].find(FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => {
            let yaml_stop = FENCE.len() + offset;
            Ok((&input[FENCE.len()..yaml_stop], &input[yaml_stop + FENCE.len()..]))
        }
    }
}

/// `foo.md` → `foo`, `foo/index.md` → `foo`.
fn post_stem(relative_path: &Path) -> Result<String> {
    let path = if relative_path.ends_with(BUNDLE_INDEX) {
        relative_path.parent()
    } else {
        Some(relative_path)
    };
    path.and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
        .ok_or_else(|| Error::InvalidFileName(InvalidFileNameError(relative_path.to_owned())))
}

/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps; the time of day is dropped.
fn parse_date(date: &str) -> Result<NaiveDate> {
    let date = date.trim();
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => Ok(d),
        Err(_) => DateTime::parse_from_rfc3339(date)
            .map(|d| d.naive_utc().date())
            .map_err(|err| Error::InvalidDate(date.to_owned(), err)),
    }
}

#[derive(Deserialize, Clone)]
struct Frontmatter {
    /// The title of the post. Falls back to the slug.
    #[serde(default)]
    pub title: Option<String>,

    /// The date of the post.
    pub date: String,

    /// The tags associated with the post.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Drafts are not published.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {
    /// Implements the [`std::error::Error`] trait for [`InvalidFileNameError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

pub type Posts = (Vec<Post>, Vec<StaticFile>);

/// A bundle asset: its source path and its destination path.
pub type StaticFile = (PathBuf, PathBuf);

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the frontmatter `date` is neither `YYYY-MM-DD` nor an
    /// RFC 3339 timestamp.
    InvalidDate(String, chrono::ParseError),

    /// Returned when a tag has no canonical form (e.g. `"---"`), since there
    /// would be no URL for its tag page.
    EmptyTag(String),

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file isn't valid UTF-8.
    InvalidFileName(InvalidFileNameError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidDate(date, err) => {
                write!(f, "invalid date `{}`: {}", date, err)
            }
            Error::EmptyTag(tag) => write!(f, "tag {:?} has no letters or digits", tag),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate(_, err) => Some(err),
            Error::EmptyTag(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_testdata() -> Result<Posts> {
        let site_root = Url::parse("https://example.com/")?;
        let output_directory = Path::new("/tmp/out");
        Parser::new(&site_root, output_directory).parse_posts(Path::new("./testdata/posts/"))
    }

    #[test]
    fn test_parse_posts() -> Result<()> {
        let (posts, _) = parse_testdata()?;
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();

        // newest first; `draft.md` is skipped; `also-simple` and `simple`
        // share a date and keep file name order
        assert_eq!(vec!["/bundle/", "/also-simple/", "/simple/"], slugs);

        let simple = &posts[2];
        assert_eq!("Simple", simple.title);
        assert_eq!(NaiveDate::from_ymd(2019, 8, 10), simple.date);
        assert_eq!("https://example.com/simple/", simple.url.as_str());
        assert_eq!(PathBuf::from("/tmp/out/simple/index.html"), simple.file_path);
        assert_eq!(
            "<p>Today is the first day of the rest of the blog.</p>\n",
            simple.body
        );
        assert_eq!("Today is the first day of the rest of the blog.", simple.excerpt);
        assert_eq!("1 min read", simple.reading_time);
        let labels: Vec<&str> = simple.tags.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(vec!["Go", "Rust Lang"], labels);
        Ok(())
    }

    #[test]
    fn test_parse_bundle() -> Result<()> {
        let (posts, static_files) = parse_testdata()?;
        let bundle = &posts[0];
        assert_eq!(NaiveDate::from_ymd(2020, 1, 2), bundle.date);
        assert!(bundle.body.contains("https://example.com/simple/"));
        assert_eq!(
            vec![(
                PathBuf::from("./testdata/posts/bundle/image.txt"),
                PathBuf::from("/tmp/out/bundle/image.txt"),
            )],
            static_files
        );
        Ok(())
    }

    #[test]
    fn test_title_falls_back_to_slug() -> Result<()> {
        let (posts, _) = parse_testdata()?;
        assert_eq!("/also-simple/", posts[1].title);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter() -> Result<()> {
        let (yaml, body) = split_frontmatter("---\ntitle: x\n---\nbody")?;
        assert_eq!("\ntitle: x\n", yaml);
        assert_eq!("\nbody", body);
        assert!(matches!(
            split_frontmatter("title: x"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            split_frontmatter("---\ntitle: x"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        Ok(())
    }

    #[test]
    fn test_parse_date() -> Result<()> {
        assert_eq!(NaiveDate::from_ymd(2019, 8, 10), parse_date("2019-08-10")?);
        assert_eq!(
            NaiveDate::from_ymd(2019, 8, 10),
            parse_date("2019-08-10T22:12:03.284Z")?
        );
        assert!(matches!(parse_date("last tuesday"), Err(Error::InvalidDate(_, _))));
        Ok(())
    }

    #[test]
    fn test_post_stem() -> Result<()> {
        assert_eq!("foo", post_stem(Path::new("foo.md"))?);
        assert_eq!("foo", post_stem(Path::new("foo/index.md"))?);
        Ok(())
    }

    #[test]
    fn test_empty_tag_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("bad.md"),
            "---\ntitle: Bad\ndate: 2020-01-01\ntags: [ok, \"!!\"]\n---\nbody\n",
        )?;
        let site_root = Url::parse("https://example.com/")?;
        let result = Parser::new(&site_root, Path::new("/tmp/out")).parse_posts(dir.path());
        match result {
            Err(Error::Annotated(_, err)) => assert!(matches!(*err, Error::EmptyTag(ref t) if t == "!!")),
            Err(err) => panic!("unexpected error: {}", err),
            Ok(_) => panic!("expected an error"),
        }
        Ok(())
    }
}
