//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::parser`]), rendering listing, tag and post pages
//! ([`crate::write`]), and copying the static source directory and the post
//! bundle assets into the output directory.

use crate::config::Config;
use crate::parser::{Error as ParseError, Parser as PostParser, StaticFile};
use crate::subscribe::Prompt;
use crate::write::{Error as WriteError, Templates, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Left in every output directory so a later build knows it's safe to delete.
pub const MARKER_FILE: &str = ".skald";

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`] and [`Writer::write_posts`] which do the
/// heavy-lifting. This function also copies the static assets from source
/// directory to the output directory.
pub fn build_site(config: &Config) -> Result<()> {
    let post_parser = PostParser::new(&config.site.site_root, &config.root_output_directory);

    // collect all posts
    let (posts, bundle_files) = post_parser.parse_posts(&config.posts_source_directory)?;

    // Parse the template files.
    let templates = Templates {
        index: parse_template(config.index_template.iter())?,
        post: parse_template(config.post_template.iter())?,
        tags: parse_template(config.tags_template.iter())?,
        tag: parse_template(config.tag_template.iter())?,
    };

    let prompt = match &config.subscribe {
        Some(subscribe) => Some(Prompt {
            title: subscribe.title.clone(),
            cta: subscribe.cta.clone(),
            action: Some(Url::parse(&subscribe.endpoint.trim().replace("&amp;", "&"))?),
        }),
        None => None,
    };

    // Blow away the previous build so we don't have any collisions. Only
    // directories we created ourselves (marked with `MARKER_FILE`) or empty
    // ones are touched.
    clean(&config.root_output_directory)?;

    // write the listing, tag and post pages
    let writer = Writer {
        templates: &templates,
        site: &config.site,
        theme: config.theme,
        index_page_size: config.index_page_size,
        popular_tags: config.popular_tags,
        output_directory: &config.root_output_directory,
        static_url: &config.static_url,
        subscribe: prompt.as_ref(),
    };
    writer.write_posts(&posts)?;

    // copy static directory
    if config.static_source_directory.is_dir() {
        copy_dir(
            &config.static_source_directory,
            &config.static_output_directory,
        )?;
    }

    copy_bundle_files(&bundle_files)?;

    info!(
        posts = posts.len(),
        output = %config.root_output_directory.display(),
        "built site"
    );
    Ok(())
}

fn clean(dir: &Path) -> Result<()> {
    if dir.exists() {
        let managed = dir.join(MARKER_FILE).exists();
        let empty = std::fs::read_dir(dir)
            .map_err(|err| Error::Clean {
                path: dir.to_owned(),
                err,
            })?
            .next()
            .is_none();
        if !managed && !empty {
            return Err(Error::Unmanaged(dir.to_owned()));
        }
        rmdir(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    File::create(dir.join(MARKER_FILE))?;
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&src.join(entry.file_name()), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(src.join(entry.file_name()), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

fn copy_bundle_files(files: &[StaticFile]) -> Result<()> {
    for (src, dst) in files {
        if let Some(dir) = dst.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(src, dst)?;
        debug!(src = %src.display(), dst = %dst.display(), "copied bundle file");
    }
    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// cleaning output directories, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the output directory has files in it but wasn't created
    /// by a previous build.
    Unmanaged(PathBuf),

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned when the subscribe endpoint isn't a valid URL.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Unmanaged(path) => write!(
                f,
                "Refusing to overwrite '{}': it isn't empty and has no `{}` file",
                path.display(),
                MARKER_FILE
            ),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::UrlParse(err) => write!(f, "Invalid subscribe endpoint: {}", err),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::Unmanaged(_) => None,
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
