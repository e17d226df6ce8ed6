//! Outbound share links for a post. Each destination runs its own share flow;
//! all we produce is the link that starts it.

use crate::util::escape;
use crate::value;
use gtmpl::Value;
use url::{ParseError, Url};

/// What to share and on whose behalf.
#[derive(Clone, Debug)]
pub struct SocialConfig {
    /// The absolute URL of the shared page.
    pub url: Url,

    /// The title of the shared page.
    pub title: String,

    /// The author's Twitter handle, with or without the leading `@`.
    pub twitter: String,
}

/// The supported share destinations, in the order they're rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Facebook,
    Twitter,
    Linkedin,
    Reddit,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Facebook,
        Network::Twitter,
        Network::Linkedin,
        Network::Reddit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Network::Facebook => "facebook",
            Network::Twitter => "twitter",
            Network::Linkedin => "linkedin",
            Network::Reddit => "reddit",
        }
    }

    /// Builds the share link for `config`. Facebook only needs the URL,
    /// Twitter also takes the title and the handle to credit (`via`), and
    /// the others take the URL and the title.
    pub fn link(self, config: &SocialConfig) -> Result<Url, ParseError> {
        let url = config.url.as_str();
        let title = config.title.as_str();
        match self {
            Network::Facebook => {
                Url::parse_with_params("https://www.facebook.com/sharer/sharer.php", &[("u", url)])
            }
            Network::Twitter => {
                let via = config.twitter.replace('@', "");
                Url::parse_with_params(
                    "https://twitter.com/share",
                    &[("url", url), ("text", title), ("via", via.as_str())],
                )
            }
            Network::Linkedin => Url::parse_with_params(
                "https://linkedin.com/shareArticle",
                &[("url", url), ("mini", "true"), ("title", title)],
            ),
            Network::Reddit => Url::parse_with_params(
                "https://www.reddit.com/submit",
                &[("url", url), ("title", title)],
            ),
        }
    }
}

/// A share link for one destination.
#[derive(Clone, Debug)]
pub struct ShareLink {
    pub network: Network,
    pub href: Url,
}

/// One share link per supported destination.
pub fn links(config: &SocialConfig) -> Result<Vec<ShareLink>, ParseError> {
    Network::ALL
        .iter()
        .map(|&network| {
            Ok(ShareLink {
                network,
                href: network.link(config)?,
            })
        })
        .collect()
}

/// Renders the share buttons.
pub fn render(config: &SocialConfig) -> Result<String, ParseError> {
    let mut html = String::from(r#"<div class="post-social">"#);
    for link in links(config)? {
        let name = link.network.name();
        html.push_str(&format!(
            r#"<div class="social-icon"><a class="share-button {name}" href="{href}" target="_blank" rel="noopener noreferrer" aria-label="share on {name}">{name}</a></div>"#,
            name = name,
            href = escape(link.href.as_str()),
        ));
    }
    html.push_str("</div>");
    Ok(html)
}

/// The share links as a template value: an object keyed by destination name
/// plus an `html` field with the rendered buttons.
pub fn to_value(config: &SocialConfig) -> Result<Value, ParseError> {
    let links = links(config)?;
    let mut pairs: Vec<(&str, Value)> = links
        .iter()
        .map(|l| (l.network.name(), value::url(&l.href)))
        .collect();
    pairs.push(("html", value::string(render(config)?)));
    Ok(value::object(pairs))
}
