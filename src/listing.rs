//! The home page listing: posts newest first, split into numbered pages, each
//! topped with the popular-tags panel.

use crate::index::{PostIndex, TagGroup};
use crate::post::Post;
use crate::value;
use gtmpl::Value;
use std::path::{Path, PathBuf};
use url::{ParseError, Url};

/// One page of the listing.
#[derive(Clone, Debug)]
pub struct ListingPage<'a> {
    /// 1-based page number.
    pub number: usize,

    /// Total number of pages in the listing.
    pub total: usize,

    pub posts: Vec<&'a Post>,

    pub url: Url,
    pub file_path: PathBuf,
    pub prev: Option<Url>,
    pub next: Option<Url>,
}

/// The URL of listing page `number`: the site root for the first page,
/// `{site_root}{number}/` for the rest.
pub fn page_url(site_root: &Url, number: usize) -> Result<Url, ParseError> {
    match number {
        0 | 1 => Ok(site_root.clone()),
        n => site_root.join(&format!("{}/", n)),
    }
}

fn page_file(output_directory: &Path, number: usize) -> PathBuf {
    match number {
        0 | 1 => output_directory.join("index.html"),
        n => output_directory.join(n.to_string()).join("index.html"),
    }
}

/// Splits `posts` into pages of `page_size` posts. There's always at least
/// one page, so an empty blog still gets a home page.
pub fn paginate<'a>(
    posts: &[&'a Post],
    page_size: usize,
    site_root: &Url,
    output_directory: &Path,
) -> Result<Vec<ListingPage<'a>>, ParseError> {
    let page_size = page_size.max(1);
    let total = ((posts.len() + page_size - 1) / page_size).max(1);

    let mut chunks: Vec<Vec<&'a Post>> = posts.chunks(page_size).map(<[_]>::to_vec).collect();
    if chunks.is_empty() {
        chunks.push(Vec::new());
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, posts)| {
            let number = i + 1;
            Ok(ListingPage {
                number,
                total,
                posts,
                url: page_url(site_root, number)?,
                file_path: page_file(output_directory, number),
                prev: match number {
                    1 => None,
                    _ => Some(page_url(site_root, number - 1)?),
                },
                next: match number < total {
                    true => Some(page_url(site_root, number + 1)?),
                    false => None,
                },
            })
        })
        .collect()
}

impl<'a> ListingPage<'a> {
    /// Converts the page into a template value with the fields `posts`,
    /// `popular` (the popular-tags panel), `tags_url` (the all-tags page),
    /// `page`, `pages`, and `page_links` (one `{number, url, current}` per
    /// page).
    pub fn to_value(&self, popular: &[&TagGroup], site_root: &Url) -> Result<Value, ParseError> {
        Ok(value::object(vec![
            (
                "posts",
                Value::Array(
                    self.posts
                        .iter()
                        .map(|p| p.summarize(site_root))
                        .collect::<Result<Vec<Value>, ParseError>>()?,
                ),
            ),
            (
                "popular",
                Value::Array(
                    popular
                        .iter()
                        .map(|g| g.to_value(site_root))
                        .collect::<Result<Vec<Value>, ParseError>>()?,
                ),
            ),
            ("tags_url", value::url(&site_root.join("tags/")?)),
            ("page", value::count(self.number)),
            ("pages", value::count(self.total)),
            (
                "page_links",
                Value::Array(
                    (1..=self.total)
                        .map(|n| {
                            Ok(value::object(vec![
                                ("number", value::count(n)),
                                ("url", value::url(&page_url(site_root, n)?)),
                                ("current", Value::Bool(n == self.number)),
                            ]))
                        })
                        .collect::<Result<Vec<Value>, ParseError>>()?,
                ),
            ),
        ]))
    }
}

/// Builds every listing page for the index, newest posts first.
pub fn listing<'a>(
    index: &PostIndex<'a>,
    page_size: usize,
    site_root: &Url,
    output_directory: &Path,
) -> Result<Vec<ListingPage<'a>>, ParseError> {
    paginate(index.chronological(), page_size, site_root, output_directory)
}
