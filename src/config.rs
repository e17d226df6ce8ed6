//! Loads the project configuration (`skald.yaml`) and the theme manifest
//! (`theme/theme.yaml`). A project directory looks like this:
//!
//! ```text
//! skald.yaml
//! posts/        Markdown posts and post bundles
//! static/       copied verbatim to `{output}/static/`
//! theme/
//!   theme.yaml  lists the template files for each kind of page
//!   *.html      gtmpl templates
//! ```

use crate::layout::Theme;
use crate::value;
use anyhow::{anyhow, Result};
use gtmpl::Value;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const PROJECT_FILE: &str = "skald.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct PopularTags(usize);
impl Default for PopularTags {
    fn default() -> Self {
        PopularTags(crate::index::POPULAR_TAGS)
    }
}

/// A navigation entry, e.g. `{name: Tags, link: /tags}`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct MenuLink {
    pub name: String,
    pub link: String,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Social {
    /// The author's Twitter handle, credited on shared links.
    #[serde(default)]
    pub twitter: String,
}

/// Settings for the subscribe form on post pages.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SubscribeConfig {
    /// The mailing list's embedded-form endpoint.
    pub endpoint: String,

    #[serde(default = "default_subscribe_title")]
    pub title: String,

    #[serde(default = "default_subscribe_cta")]
    pub cta: String,
}

fn default_subscribe_title() -> String {
    "Never Miss a Post".to_owned()
}

fn default_subscribe_cta() -> String {
    "Get articles like this one in your inbox".to_owned()
}

#[derive(Deserialize)]
struct Project {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub site_root: Url,
    #[serde(default)]
    pub social: Social,
    #[serde(default)]
    pub menu_links: Vec<MenuLink>,
    #[serde(default)]
    pub index_page_size: PageSize,
    #[serde(default)]
    pub popular_tags: PopularTags,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub subscribe: Option<SubscribeConfig>,
}

#[derive(Deserialize)]
struct ThemeFiles {
    index_template: Vec<PathBuf>,
    post_template: Vec<PathBuf>,
    tags_template: Vec<PathBuf>,
    tag_template: Vec<PathBuf>,
}

/// Site-wide metadata, available to every template as `site`.
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub title: String,
    pub author: String,
    pub description: String,

    /// The URL of the home page. Always ends in a slash.
    pub site_root: Url,
    pub social: Social,
    pub menu_links: Vec<MenuLink>,
}

impl Site {
    pub fn to_value(&self) -> Value {
        value::object(vec![
            ("title", value::text(&self.title)),
            ("author", value::text(&self.author)),
            ("description", value::text(&self.description)),
            ("url", value::url(&self.site_root)),
            ("twitter", value::string(self.social.twitter.as_str())),
            (
                "menu_links",
                Value::Array(
                    self.menu_links
                        .iter()
                        .map(|l| {
                            value::object(vec![
                                ("name", value::text(&l.name)),
                                ("link", value::text(&l.link)),
                            ])
                        })
                        .collect(),
                ),
            ),
        ])
    }
}

pub struct Config {
    pub site: Site,
    pub posts_source_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub index_template: Vec<PathBuf>,
    pub post_template: Vec<PathBuf>,
    pub tags_template: Vec<PathBuf>,
    pub tag_template: Vec<PathBuf>,
    pub index_page_size: usize,
    pub popular_tags: usize,
    pub theme: Theme,
    pub subscribe: Option<SubscribeConfig>,
    pub root_output_directory: PathBuf,
    pub static_output_directory: PathBuf,
    pub static_url: Url,
}

impl Config {
    /// Finds `skald.yaml` in `dir` or the nearest parent directory that has
    /// one and loads it.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path, output_directory) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(dir) => Config::from_directory(dir, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        use crate::util::open;
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        if project.index_page_size.0 == 0 {
            return Err(anyhow!("`index_page_size` must be at least 1"));
        }

        let theme_dir = project_root.join("theme");
        let theme: ThemeFiles = serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
        let in_theme = |files: Vec<PathBuf>| -> Vec<PathBuf> {
            files.iter().map(|relpath| theme_dir.join(relpath)).collect()
        };

        let site_root = with_trailing_slash(project.site_root);
        Ok(Config {
            static_url: site_root.join("static/")?,
            site: Site {
                title: project.title,
                author: project.author,
                description: project.description,
                site_root,
                social: project.social,
                menu_links: project.menu_links,
            },
            posts_source_directory: project_root.join("posts"),
            static_source_directory: project_root.join("static"),
            index_template: in_theme(theme.index_template),
            post_template: in_theme(theme.post_template),
            tags_template: in_theme(theme.tags_template),
            tag_template: in_theme(theme.tag_template),
            index_page_size: project.index_page_size.0,
            popular_tags: project.popular_tags.0,
            theme: project.theme,
            subscribe: project.subscribe,
            root_output_directory: output_directory.to_owned(),
            static_output_directory: output_directory.join("static"),
        })
    }
}

/// Relative URLs are resolved against the site root, so it has to look like a
/// directory.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
