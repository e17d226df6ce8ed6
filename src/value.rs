//! Small helpers for building [`Value`] trees for templates.

use crate::util::escape;
use gtmpl::Value;
use std::collections::HashMap;
use url::Url;

/// Builds a [`Value::Object`] from key/value pairs.
pub fn object(pairs: Vec<(&str, Value)>) -> Value {
    let mut m: HashMap<String, Value> = HashMap::with_capacity(pairs.len());
    for (k, v) in pairs {
        m.insert(k.to_owned(), v);
    }
    Value::Object(m)
}

pub fn string<S: Into<String>>(s: S) -> Value {
    Value::String(s.into())
}

/// Plain text that ends up in HTML, escaped. Templates print values verbatim.
pub fn text(s: &str) -> Value {
    Value::String(escape(s))
}

pub fn url(url: &Url) -> Value {
    Value::String(url.to_string())
}

/// `None` becomes [`Value::Nil`] so templates can test it with `if`.
pub fn opt_url(url: Option<&Url>) -> Value {
    match url {
        Some(url) => Value::String(url.to_string()),
        None => Value::Nil,
    }
}

pub fn count(n: usize) -> Value {
    Value::from(n as u64)
}
