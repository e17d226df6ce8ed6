//! Turns parsed posts into pages and writes them to disk. Every page is a
//! [`Page`]: a template plus the value it's rendered with. The routes are:
//!
//! * `/`, `/2/`, `/3/`, ...: the listing, newest posts first
//! * `/tags/`: every tag with its post count
//! * `/tags/{canonical}/`: the posts carrying one tag
//! * `/{slug}/`: one post

use crate::config::Site;
use crate::index::{PostIndex, TagGroup};
use crate::layout::{self, Theme, ThemeContext};
use crate::listing::listing;
use crate::post::Post;
use crate::share::{self, SocialConfig};
use crate::subscribe::{Attempt, Prompt};
use crate::value;
use gtmpl::{Template, Value};
use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// The parsed templates, one per kind of page.
pub struct Templates {
    pub index: Template,
    pub post: Template,
    pub tags: Template,
    pub tag: Template,
}

/// Responsible for indexing, templating, and writing HTML pages to disk from
/// [`Post`] sources.
pub struct Writer<'a> {
    pub templates: &'a Templates,

    /// Site metadata, exposed to every template as `site`.
    pub site: &'a Site,

    /// The theme pages are first rendered with.
    pub theme: Theme,

    /// The number of posts per listing page.
    pub index_page_size: usize,

    /// The number of tags in the popular-tags panel.
    pub popular_tags: usize,

    /// The directory the site is written to. Page files are laid out to
    /// mirror their URL paths, e.g. `{output_directory}/tags/rust/index.html`.
    pub output_directory: &'a Path,

    /// The URL for the static assets, typically used for the theme's
    /// stylesheet.
    pub static_url: &'a Url,

    /// The subscribe form shown on post pages. No form when `None`.
    pub subscribe: Option<&'a Prompt>,
}

impl Writer<'_> {
    /// Builds every page for `posts`, checks that no two pages share an output
    /// file, then templates and writes them.
    pub fn write_posts(&self, posts: &[Post]) -> Result<()> {
        let pages = self.pages(posts)?;
        check_collisions(&pages)?;

        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for page in &pages {
            if let Some(dir) = page.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.render_page(page, &mut std::fs::File::create(&page.file_path)?)?;
        }
        debug!(pages = pages.len(), "wrote pages");
        Ok(())
    }

    /// Templates a single [`Page`] into `w`.
    pub fn render_page<W: Write>(&self, page: &Page, w: &mut W) -> Result<()> {
        let mut data = page.to_value();
        if let Value::Object(obj) = &mut data {
            let mut insert = |k: &str, v: Value| {
                obj.insert(k.to_owned(), v);
            };
            insert("site", self.site.to_value());
            insert("home_page", value::url(&self.site.site_root));
            insert("static_url", value::url(self.static_url));
            insert("theme", value::string(self.theme.name()));
            insert(
                "header",
                value::string(layout::header(
                    &page.path,
                    &self.site.title,
                    &self.site.site_root,
                    &ThemeContext::new(self.theme),
                )),
            );
        }
        page.template.execute(w, &gtmpl::Context::from(data)?)?;
        Ok(())
    }

    /// Creates every [`Page`] of the site: the listing pages, the all-tags
    /// page, one page per tag, and one page per post.
    pub fn pages<'t>(&'t self, posts: &[Post]) -> Result<Vec<Page<'t>>> {
        let index = PostIndex::new(posts);
        let site_root = &self.site.site_root;
        let popular = index.popular(self.popular_tags);

        let mut pages = Vec::new();
        for listing_page in listing(
            &index,
            self.index_page_size,
            site_root,
            self.output_directory,
        )? {
            pages.push(Page {
                path: listing_page.url.path().to_owned(),
                item: listing_page.to_value(&popular, site_root)?,
                file_path: listing_page.file_path.clone(),
                prev: listing_page.prev.clone(),
                next: listing_page.next.clone(),
                template: &self.templates.index,
            });
        }

        pages.push(self.tags_page(&index)?);
        for group in index.groups() {
            pages.push(self.tag_page(&index, group)?);
        }
        pages.extend(self.post_pages(index.chronological())?);
        Ok(pages)
    }

    fn tags_page<'t>(&'t self, index: &PostIndex) -> Result<Page<'t>> {
        let site_root = &self.site.site_root;
        let url = site_root.join("tags/")?;
        Ok(Page {
            path: url.path().to_owned(),
            item: value::object(vec![(
                "tags",
                Value::Array(
                    index
                        .groups()
                        .map(|g| g.to_value(site_root))
                        .collect::<std::result::Result<Vec<Value>, url::ParseError>>()?,
                ),
            )]),
            file_path: self.output_directory.join("tags").join("index.html"),
            prev: None,
            next: None,
            template: &self.templates.tags,
        })
    }

    fn tag_page<'t>(&'t self, index: &PostIndex, group: &TagGroup) -> Result<Page<'t>> {
        let site_root = &self.site.site_root;
        let detail = index.detail(&group.tag.canonical);
        let url = group.tag.url(site_root)?;
        Ok(Page {
            path: url.path().to_owned(),
            item: value::object(vec![
                ("tag", value::string(detail.tag.as_str())),
                ("label", value::text(&group.tag.label)),
                ("total", value::count(detail.total)),
                (
                    "posts",
                    Value::Array(
                        detail
                            .posts
                            .iter()
                            .map(|p| p.summarize(site_root))
                            .collect::<std::result::Result<Vec<Value>, url::ParseError>>()?,
                    ),
                ),
                ("tags_url", value::url(&site_root.join("tags/")?)),
            ]),
            file_path: self
                .output_directory
                .join("tags")
                .join(&detail.tag)
                .join("index.html"),
            prev: None,
            next: None,
            template: &self.templates.tag,
        })
    }

    /// Creates the post pages. `posts` is newest first, so a post's
    /// `previous` is the one after it (older) and its `next` the one before it
    /// (newer).
    fn post_pages<'t>(&'t self, posts: &[&Post]) -> Result<Vec<Page<'t>>> {
        let site_root = &self.site.site_root;
        posts
            .iter()
            .enumerate()
            .map(|(i, post)| {
                let older = posts.get(i + 1).copied();
                let newer = match i {
                    0 => None,
                    _ => posts.get(i - 1).copied(),
                };

                let mut item = post.to_value(site_root)?;
                if let Value::Object(obj) = &mut item {
                    obj.insert(
                        "share".to_owned(),
                        share::to_value(&SocialConfig {
                            url: post.url.clone(),
                            title: post.title.clone(),
                            twitter: self.site.social.twitter.clone(),
                        })?,
                    );
                    obj.insert(
                        "subscribe".to_owned(),
                        match self.subscribe {
                            Some(prompt) => value::string(Attempt::default().render(prompt)),
                            None => Value::Nil,
                        },
                    );
                    obj.insert("previous".to_owned(), neighbor(older));
                    obj.insert("next".to_owned(), neighbor(newer));
                }

                Ok(Page {
                    path: post.url.path().to_owned(),
                    item,
                    file_path: post.file_path.clone(),
                    prev: older.map(|p| p.url.clone()),
                    next: newer.map(|p| p.url.clone()),
                    template: &self.templates.post,
                })
            })
            .collect()
    }
}

fn neighbor(post: Option<&Post>) -> Value {
    match post {
        Some(post) => value::object(vec![
            ("title", value::text(&post.title)),
            ("url", value::url(&post.url)),
        ]),
        None => Value::Nil,
    }
}

fn check_collisions(pages: &[Page]) -> Result<()> {
    let mut seen: HashSet<&Path> = HashSet::with_capacity(pages.len());
    for page in pages {
        if !seen.insert(page.file_path.as_path()) {
            return Err(Error::Collision(page.file_path.clone()));
        }
    }
    Ok(())
}

/// An object representing an output HTML file. A [`Page`] can be converted to a
/// [`Value`] and thus rendered in a template via [`Page::to_value`].
pub struct Page<'a> {
    /// The URL path of the page, e.g. `/tags/rust/`.
    pub path: String,

    /// The main item for the page.
    pub item: Value,

    /// The target location on disk for the output file.
    pub file_path: PathBuf,

    /// The URL for the previous page, if any.
    pub prev: Option<Url>,

    /// The URL for the next page, if any.
    pub next: Option<Url>,

    /// The template with which the page will be rendered.
    pub template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a [`Value::Object`]
    /// with fields `item`, `prev`, and `next` (see [`Page`] for descriptions).
    fn to_value(&self) -> Value {
        value::object(vec![
            ("item", self.item.clone()),
            ("prev", value::opt_url(self.prev.as_ref())),
            ("next", value::opt_url(self.next.as_ref())),
        ])
    }
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error writing the output files.
    Io(io::Error),

    /// An error building a page URL.
    UrlParse(url::ParseError),

    /// Two pages would be written to the same file, e.g. a post with the slug
    /// `tags`.
    Collision(PathBuf),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Collision(path) => {
                write!(f, "More than one page maps to '{}'", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Collision(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Social;
    use crate::post::fixture::post;

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    fn templates() -> Templates {
        Templates {
            index: template(
                "{{.header}}{{range .item.posts}}[{{.title}}]{{end}}{{range .item.popular}}#{{.tag}}={{.count}}{{end}}{{if .next}} next={{.next}}{{end}}",
            ),
            post: template(
                "{{.item.title}}{{if .item.previous}} prev={{.item.previous.title}}{{end}}{{if .item.next}} next={{.item.next.title}}{{end}}{{if .item.subscribe}} {{.item.subscribe}}{{end}}",
            ),
            tags: template("{{range .item.tags}}{{.tag}}:{{.count}} {{end}}"),
            tag: template("{{.item.label}}/{{.item.total}}"),
        }
    }

    fn site() -> Site {
        Site {
            title: "Blog".to_owned(),
            author: "Jo".to_owned(),
            description: String::new(),
            site_root: Url::parse("https://example.org/").unwrap(),
            social: Social {
                twitter: "@jo".to_owned(),
            },
            menu_links: Vec::new(),
        }
    }

    fn sample() -> Vec<Post> {
        vec![
            post("a", "2019-01-01", &["Rust", "Go"]),
            post("b", "2021-06-01", &["rust"]),
            post("c", "2020-03-15", &[]),
        ]
    }

    fn render(writer: &Writer, page: &Page) -> Result<String> {
        let mut out = Vec::new();
        writer.render_page(page, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn writer<'a>(
        templates: &'a Templates,
        site: &'a Site,
        static_url: &'a Url,
        subscribe: Option<&'a Prompt>,
    ) -> Writer<'a> {
        Writer {
            templates,
            site,
            theme: Theme::Light,
            index_page_size: 2,
            popular_tags: 4,
            output_directory: Path::new("/out"),
            static_url,
            subscribe,
        }
    }

    #[test]
    fn test_pages() -> Result<()> {
        let (templates, site) = (templates(), site());
        let static_url = site.site_root.join("static/")?;
        let writer = writer(&templates, &site, &static_url, None);
        let posts = sample();
        let pages = writer.pages(&posts)?;

        let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            vec!["/", "/2/", "/tags/", "/tags/go/", "/tags/rust/", "/b/", "/c/", "/a/"],
            paths
        );
        assert_eq!(PathBuf::from("/out/tags/rust/index.html"), pages[4].file_path);
        Ok(())
    }

    #[test]
    fn test_render_listing() -> Result<()> {
        let (templates, site) = (templates(), site());
        let static_url = site.site_root.join("static/")?;
        let writer = writer(&templates, &site, &static_url, None);
        let posts = sample();
        let pages = writer.pages(&posts)?;

        let html = render(&writer, &pages[0])?;
        assert!(html.starts_with("<header"));
        assert!(html.contains("<h1 "));
        assert!(html.contains("[B][C]"));
        assert!(html.contains("#rust=2#go=1"));
        assert!(html.contains("next=https://example.org/2/"));
        Ok(())
    }

    #[test]
    fn test_render_tags() -> Result<()> {
        let (templates, site) = (templates(), site());
        let static_url = site.site_root.join("static/")?;
        let writer = writer(&templates, &site, &static_url, None);
        let posts = sample();
        let pages = writer.pages(&posts)?;

        assert_eq!("go:1 rust:2 ", render(&writer, &pages[2])?);
        assert_eq!("rust/2", render(&writer, &pages[4])?);
        Ok(())
    }

    #[test]
    fn test_render_post_neighbors() -> Result<()> {
        let (templates, site) = (templates(), site());
        let static_url = site.site_root.join("static/")?;
        let prompt = Prompt {
            title: "Never Miss a Post".to_owned(),
            cta: "Get articles like this one in your inbox".to_owned(),
            action: None,
        };
        let writer = writer(&templates, &site, &static_url, Some(&prompt));
        let posts = sample();
        let pages = writer.pages(&posts)?;

        // newest
        let html = render(&writer, &pages[5])?;
        assert!(html.starts_with("B prev=C"));
        assert!(!html.contains("next="));
        assert!(html.contains(r#"<div class="subscribe">"#));

        // middle
        assert!(render(&writer, &pages[6])?.starts_with("C prev=A next=B"));

        // oldest
        let html = render(&writer, &pages[7])?;
        assert!(html.starts_with("A next=C"));
        Ok(())
    }

    #[test]
    fn test_no_subscribe_form() -> Result<()> {
        let (templates, site) = (templates(), site());
        let static_url = site.site_root.join("static/")?;
        let writer = writer(&templates, &site, &static_url, None);
        let posts = sample();
        let pages = writer.pages(&posts)?;
        assert_eq!("B prev=C", render(&writer, &pages[5])?);
        Ok(())
    }

    #[test]
    fn test_collision() -> Result<()> {
        let (templates, site) = (templates(), site());
        let static_url = site.site_root.join("static/")?;
        let writer = writer(&templates, &site, &static_url, None);

        let mut tags = post("tags", "2020-01-01", &[]);
        tags.file_path = PathBuf::from("/out/tags/index.html");
        let posts = vec![tags];
        let pages = writer.pages(&posts)?;
        match check_collisions(&pages) {
            Err(Error::Collision(path)) => {
                assert_eq!(PathBuf::from("/out/tags/index.html"), path)
            }
            other => panic!("expected a collision, got {:?}", other),
        }
        Ok(())
    }
}
