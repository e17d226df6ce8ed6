//! Indexes a collection of [`Post`]s by tag. The [`PostIndex`] is a derived,
//! read-only view: it borrows the posts and never modifies them. It answers
//! the three questions every listing page asks:
//!
//! 1. Which posts carry a given tag, and how many are there
//!    ([`PostIndex::group`], [`PostIndex::detail`])?
//! 2. Which tags are the most popular ([`PostIndex::popular`])?
//! 3. What are the posts, newest first ([`PostIndex::chronological`])?
//!
//! Tags are grouped by their canonical form (see [`crate::tag::normalize`]),
//! so `Rust Lang` and `rust-lang` land in the same group and on the same
//! `/tags/rust-lang/` page.

use crate::post::Post;
use crate::tag::{normalize, Chip, Tag};
use crate::value;
use gtmpl::Value;
use std::collections::BTreeMap;
use url::{ParseError, Url};

/// The default number of tags in the popular-tags panel.
pub const POPULAR_TAGS: usize = 4;

/// The posts sharing one canonical tag, newest first.
#[derive(Clone, Debug)]
pub struct TagGroup<'a> {
    /// The group's tag. Its label is the one authored on the most recent post
    /// in the group.
    pub tag: Tag,

    pub posts: Vec<&'a Post>,
}

impl<'a> TagGroup<'a> {
    /// The number of posts carrying the tag.
    pub fn count(&self) -> usize {
        self.posts.len()
    }

    /// Converts the group into a template value with the fields `label`,
    /// `tag` (the canonical form), `count`, `url`, and `chip`.
    pub fn to_value(&self, site_root: &Url) -> Result<Value, ParseError> {
        Ok(value::object(vec![
            ("label", value::text(&self.tag.label)),
            ("tag", value::string(self.tag.canonical.as_str())),
            ("count", value::count(self.count())),
            ("url", value::url(&self.tag.url(site_root)?)),
            ("chip", Chip::new(&self.tag.label, site_root)?.to_value()),
        ]))
    }
}

/// The posts for one tag page.
#[derive(Clone, Debug)]
pub struct TagDetail<'a> {
    /// The canonical form of the requested tag.
    pub tag: String,

    /// The posts carrying the tag, newest first.
    pub posts: Vec<&'a Post>,

    /// The number of matching posts.
    pub total: usize,
}

/// Returns the posts carrying `tag`, newest first, with their count. `tag`
/// may be given in any form: membership compares canonical forms, the same
/// way tag links are generated. No match is not an error; the result is just
/// empty.
pub fn tag_detail<'a>(posts: &'a [Post], tag: &str) -> TagDetail<'a> {
    let canonical = normalize(tag);
    let mut matches: Vec<&'a Post> = posts.iter().filter(|p| p.has_tag(&canonical)).collect();
    matches.sort_by(|a, b| b.date.cmp(&a.date));
    TagDetail {
        total: matches.len(),
        tag: canonical,
        posts: matches,
    }
}

pub struct PostIndex<'a> {
    /// Keyed by canonical tag. Iteration order (ascending canonical tag) is
    /// the grouping order used to break ties between equally popular tags.
    groups: BTreeMap<String, TagGroup<'a>>,

    /// All posts, newest first. Posts with the same date keep their order
    /// in the source collection.
    chronological: Vec<&'a Post>,
}

impl<'a> PostIndex<'a> {
    /// Indexes `posts`. Posts without tags only show up in
    /// [`PostIndex::chronological`].
    pub fn new(posts: &'a [Post]) -> PostIndex<'a> {
        let mut chronological: Vec<&'a Post> = posts.iter().collect();
        // `sort_by` is stable, which keeps same-day posts in source order.
        chronological.sort_by(|a, b| b.date.cmp(&a.date));

        let mut groups: BTreeMap<String, TagGroup<'a>> = BTreeMap::new();
        for post in chronological.iter().copied() {
            for tag in &post.tags {
                groups
                    .entry(tag.canonical.clone())
                    .or_insert_with(|| TagGroup {
                        tag: tag.clone(),
                        posts: Vec::new(),
                    })
                    .posts
                    .push(post);
            }
        }

        PostIndex {
            groups,
            chronological,
        }
    }

    /// Looks up the group for a canonical tag.
    pub fn group(&self, canonical: &str) -> Option<&TagGroup<'a>> {
        self.groups.get(canonical)
    }

    /// All distinct tags with their posts, in ascending canonical order.
    pub fn groups(&self) -> impl Iterator<Item = &TagGroup<'a>> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The `limit` tags with the most posts, most popular first. Tags with
    /// the same count keep their grouping order.
    pub fn popular(&self, limit: usize) -> Vec<&TagGroup<'a>> {
        let mut groups: Vec<&TagGroup<'a>> = self.groups.values().collect();
        groups.sort_by(|a, b| b.count().cmp(&a.count()));
        groups.truncate(limit);
        groups
    }

    /// All posts, newest first.
    pub fn chronological(&self) -> &[&'a Post] {
        &self.chronological
    }

    /// Like [`tag_detail`] but answered from the index.
    pub fn detail(&self, tag: &str) -> TagDetail<'a> {
        let canonical = normalize(tag);
        let posts = match self.groups.get(&canonical) {
            Some(group) => group.posts.clone(),
            None => Vec::new(),
        };
        TagDetail {
            total: posts.len(),
            tag: canonical,
            posts,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::fixture::post;

    fn sample() -> Vec<Post> {
        vec![
            post("a", "2019-01-01", &["Rust", "Go"]),
            post("b", "2021-06-01", &["rust", "Angular"]),
            post("c", "2020-03-15", &[]),
            post("d", "2020-03-15", &["Go", "React", "Rust Lang"]),
            post("e", "2018-12-31", &["Angular", "Gatsby"]),
        ]
    }

    fn slugs(posts: &[&Post]) -> Vec<String> {
        posts.iter().map(|p| p.slug.clone()).collect()
    }

    #[test]
    fn test_group_counts_sum_to_pairs() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        let pairs: usize = posts.iter().map(|p| p.tags.len()).sum();
        let counted: usize = index.groups().map(TagGroup::count).sum();
        assert_eq!(pairs, counted);
        assert_eq!(9, counted);
    }

    #[test]
    fn test_groups_by_canonical_form() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        let canonical: Vec<&str> = index.groups().map(|g| g.tag.canonical.as_str()).collect();
        assert_eq!(
            vec!["angular", "gatsby", "go", "react", "rust", "rust-lang"],
            canonical
        );

        let rust = index.group("rust").unwrap();
        assert_eq!(2, rust.count());
        // newest post's casing wins
        assert_eq!("rust", rust.tag.label);
        assert_eq!(vec!["/b/", "/a/"], slugs(&rust.posts));
        assert!(index.group("Rust").is_none());
    }

    #[test]
    fn test_duplicate_tags_on_one_post() {
        let posts = vec![
            post("one", "2020-01-01", &["Go", "go"]),
            post("two", "2020-01-02", &["go"]),
        ];
        let index = PostIndex::new(&posts);
        assert_eq!(1, index.len());
        assert_eq!(2, index.group("go").unwrap().count());
    }

    #[test]
    fn test_popular() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        let popular: Vec<(&str, usize)> = index
            .popular(POPULAR_TAGS)
            .iter()
            .map(|g| (g.tag.canonical.as_str(), g.count()))
            .collect();
        // ties are broken by canonical order
        assert_eq!(
            vec![("angular", 2), ("go", 2), ("rust", 2), ("gatsby", 1)],
            popular
        );
    }

    #[test]
    fn test_popular_bounds() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        for limit in 0..10 {
            let popular = index.popular(limit);
            assert!(popular.len() <= limit);
            assert!(popular.len() <= index.len());
            assert!(popular.windows(2).all(|w| w[0].count() >= w[1].count()));
        }
    }

    #[test]
    fn test_chronological_any_input_order() {
        let mut posts = sample();
        for _ in 0..posts.len() {
            posts.rotate_left(1);
            let index = PostIndex::new(&posts);
            let chronological = index.chronological();
            assert_eq!(posts.len(), chronological.len());
            assert!(chronological.windows(2).all(|w| w[0].date >= w[1].date));
        }
    }

    #[test]
    fn test_chronological_ties_keep_source_order() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        assert_eq!(
            vec!["/b/", "/c/", "/d/", "/a/", "/e/"],
            slugs(index.chronological())
        );
        let reversed: Vec<Post> = posts.into_iter().rev().collect();
        let index = PostIndex::new(&reversed);
        assert_eq!(
            vec!["/b/", "/d/", "/c/", "/a/", "/e/"],
            slugs(index.chronological())
        );
    }

    #[test]
    fn test_untagged_posts() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        assert!(index.groups().all(|g| g.posts.iter().all(|p| p.slug != "/c/")));
        assert!(index.chronological().iter().any(|p| p.slug == "/c/"));
    }

    #[test]
    fn test_empty_collection() {
        let posts: Vec<Post> = Vec::new();
        let index = PostIndex::new(&posts);
        assert!(index.is_empty());
        assert!(index.popular(POPULAR_TAGS).is_empty());
        assert!(index.chronological().is_empty());
        let detail = index.detail("rust");
        assert!(detail.posts.is_empty());
        assert_eq!(0, detail.total);
    }

    #[test]
    fn test_tag_detail() {
        let posts = sample();
        let detail = tag_detail(&posts, "go");
        assert_eq!("go", detail.tag);
        assert_eq!(2, detail.total);
        assert_eq!(vec!["/d/", "/a/"], slugs(&detail.posts));

        let detail = tag_detail(&posts, "Rust Lang");
        assert_eq!("rust-lang", detail.tag);
        assert_eq!(vec!["/d/"], slugs(&detail.posts));
    }

    #[test]
    fn test_tag_detail_no_match() {
        let posts = sample();
        let detail = tag_detail(&posts, "cobol");
        assert!(detail.posts.is_empty());
        assert_eq!(0, detail.total);
    }

    #[test]
    fn test_index_detail_agrees_with_tag_detail() {
        let posts = sample();
        let index = PostIndex::new(&posts);
        for tag in &["rust", "Go", "angular", "react", "cobol"] {
            let from_index = index.detail(tag);
            let direct = tag_detail(&posts, tag);
            assert_eq!(direct.total, from_index.total);
            assert_eq!(slugs(&direct.posts), slugs(&from_index.posts));
        }
    }

    #[test]
    fn test_group_value() -> Result<(), ParseError> {
        let posts = sample();
        let index = PostIndex::new(&posts);
        let root = Url::parse("https://example.org/")?;
        match index.group("rust-lang").unwrap().to_value(&root)? {
            Value::Object(m) => {
                assert_eq!(
                    Some(&Value::String("https://example.org/tags/rust-lang/".to_owned())),
                    m.get("url")
                );
                assert_eq!(Some(&value::count(1)), m.get("count"));
            }
            other => panic!("unexpected value: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_group_label_is_escaped() -> Result<(), ParseError> {
        let posts = vec![post("a", "2020-01-01", &["<Generics>"])];
        let index = PostIndex::new(&posts);
        let root = Url::parse("https://example.org/")?;
        match index.group("generics").unwrap().to_value(&root)? {
            Value::Object(m) => assert_eq!(
                Some(&Value::String("&lt;Generics&gt;".to_owned())),
                m.get("label")
            ),
            other => panic!("unexpected value: {:?}", other),
        }
        Ok(())
    }
}
