//! A [`MailingList`] backed by a Mailchimp audience's embedded-form endpoint
//! (`https://<dc>.list-manage.com/subscribe/post?u=...&id=...`).

use crate::subscribe::{Fields, MailingList, Reply, TransportError};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Shown to the reader when the call itself fails. The underlying error is
/// logged instead, since it can contain URLs and other internals.
pub const UNAVAILABLE: &str = "The mailing list could not be reached. Please try again later.";

pub struct Mailchimp {
    endpoint: Url,
    agent: ureq::Agent,
}

impl Mailchimp {
    /// Creates a client for an embedded-form endpoint as copied from the
    /// Mailchimp form builder. HTML-escaped query separators (`&amp;`) are
    /// accepted.
    pub fn new(endpoint: &str) -> Result<Mailchimp, Error> {
        Ok(Mailchimp {
            endpoint: json_endpoint(endpoint)?,
            agent: ureq::Agent::new_with_defaults(),
        })
    }

    /// The endpoint the calls go to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, email: &str, fields: &Fields) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("EMAIL", email);
            for (name, value) in fields.merge_fields() {
                query.append_pair(name, value);
            }
        }
        url
    }

    fn send(&self, url: &Url) -> Result<Reply, Error> {
        let mut response = self.agent.get(url.as_str()).call()?;
        let body = response.body_mut().read_to_string()?;
        debug!(status = %response.status(), "mailing list replied");
        parse_reply(&body)
    }
}

impl MailingList for Mailchimp {
    fn subscribe(&self, email: &str, fields: &Fields) -> Result<Reply, TransportError> {
        self.send(&self.request_url(email, fields)).map_err(|err| {
            warn!(error = %err, "mailing list call failed");
            TransportError(UNAVAILABLE.to_owned())
        })
    }
}

/// Rewrites the embedded-form endpoint (`.../subscribe/post`) into the one
/// that answers with JSON (`.../subscribe/post-json`).
pub fn json_endpoint(endpoint: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&endpoint.trim().replace("&amp;", "&"))?;
    if url.path().ends_with("/post") {
        let path = format!("{}-json", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parses `{"result": ..., "msg": ...}`, bare or wrapped in a JSONP callback.
fn parse_reply(body: &str) -> Result<Reply, Error> {
    let body = body.trim();
    let json = if body.starts_with('{') {
        body
    } else {
        match (body.find('('), body.rfind(')')) {
            (Some(start), Some(end)) if start < end => &body[start + 1..end],
            _ => body,
        }
    };
    Ok(serde_json::from_str(json)?)
}

/// Represents a failed call to the mailing list.
#[derive(Debug)]
pub enum Error {
    /// Returned when the endpoint isn't a valid URL.
    UrlParse(url::ParseError),

    /// Returned when the HTTP call fails or returns an error status.
    Http(ureq::Error),

    /// Returned when the reply isn't the expected JSON.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UrlParse(err) => write!(f, "invalid mailing list endpoint: {}", err),
            Error::Http(err) => err.fmt(f),
            Error::Json(err) => write!(f, "unexpected mailing list reply: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UrlParse(err) => Some(err),
            Error::Http(err) => Some(err),
            Error::Json(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Error {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subscribe::Status;

    const ENDPOINT: &str =
        "https://example.us19.list-manage.com/subscribe/post?u=aea5acb0&amp;id=bb8fb444";

    #[test]
    fn test_json_endpoint() -> Result<(), url::ParseError> {
        assert_eq!(
            "https://example.us19.list-manage.com/subscribe/post-json?u=aea5acb0&id=bb8fb444",
            json_endpoint(ENDPOINT)?.as_str()
        );
        Ok(())
    }

    #[test]
    fn test_json_endpoint_already_json() -> Result<(), url::ParseError> {
        let endpoint = "https://example.list-manage.com/subscribe/post-json?u=1&id=2";
        assert_eq!(endpoint, json_endpoint(endpoint)?.as_str());
        Ok(())
    }

    #[test]
    fn test_request_url() -> Result<(), Error> {
        let list = Mailchimp::new(ENDPOINT)?;
        let url = list.request_url(
            "jo+blog@example.net",
            &Fields {
                first_name: "Jo".to_owned(),
                email: "jo+blog@example.net".to_owned(),
            },
        );
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            vec![
                ("u".to_owned(), "aea5acb0".to_owned()),
                ("id".to_owned(), "bb8fb444".to_owned()),
                ("EMAIL".to_owned(), "jo+blog@example.net".to_owned()),
                ("FNAME".to_owned(), "Jo".to_owned()),
            ],
            pairs
        );
        Ok(())
    }

    #[test]
    fn test_parse_reply() -> Result<(), Error> {
        assert_eq!(
            Reply {
                status: Status::Success,
                msg: "Thank you for subscribing!".to_owned(),
            },
            parse_reply(r#"{"result":"success","msg":"Thank you for subscribing!"}"#)?
        );
        assert_eq!(
            Reply {
                status: Status::Error,
                msg: "jo@example.net is already subscribed".to_owned(),
            },
            parse_reply(
                r#"__jp0({"result":"error","msg":"jo@example.net is already subscribed"})"#
            )?
        );
        Ok(())
    }

    #[test]
    fn test_parse_reply_unknown_result() -> Result<(), Error> {
        assert_eq!(Status::Error, parse_reply(r#"{"result":"pending"}"#)?.status);
        Ok(())
    }

    #[test]
    fn test_parse_reply_garbage() {
        assert!(matches!(parse_reply("<html>oops</html>"), Err(Error::Json(_))));
    }
}
