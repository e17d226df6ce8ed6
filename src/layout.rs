//! The page header shared by every page, and the light/dark theme it toggles.

use crate::util::escape;
use serde::Deserialize;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Theme {
        Theme::Light
    }
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// The current theme, handed explicitly to whatever renders the layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThemeContext {
    theme: Theme,
}

impl ThemeContext {
    pub fn new(theme: Theme) -> ThemeContext {
        ThemeContext { theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn request(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Applies the toggle switch: checked means dark.
    pub fn toggle(&mut self, checked: bool) {
        self.request(if checked { Theme::Dark } else { Theme::Light });
    }
}

/// Whether `path` is the home page or one of its numbered pages (`/2/`,
/// `/3/`, ...). These get the large header.
pub fn is_listing_path(path: &str, home: &Url) -> bool {
    if path == home.path() {
        return true;
    }
    match path.split('/').filter(|s| !s.is_empty()).last() {
        Some(last) => last.chars().all(|c| c.is_ascii_digit()),
        None => true,
    }
}

/// Renders the site header for the page at `path`: the site title linking
/// home (an `h1` on listing pages, an `h3` elsewhere) and the theme toggle.
pub fn header(path: &str, title: &str, home: &Url, theme: &ThemeContext) -> String {
    let heading = if is_listing_path(path, home) { "h1" } else { "h3" };
    format!(
        concat!(
            r#"<header class="site-header">"#,
            r#"<{h} class="site-title"><a href="{home}">{title}</a></{h}>"#,
            r#"<label class="dark-mode-toggle">"#,
            r#"<input type="checkbox" aria-label="switch between light and dark mode" data-theme="{theme}"{checked}>"#,
            r#"</label>"#,
            r#"</header>"#,
        ),
        h = heading,
        home = escape(home.as_str()),
        title = escape(title),
        theme = theme.theme().name(),
        checked = if theme.theme() == Theme::Dark { " checked" } else { "" },
    )
}
