//! The subscribe form: a small state machine wrapped around a mailing-list
//! call.
//!
//! ```text
//! Subscribe --submit--> Submitting --ok--> Subscribed
//!     ^                     |
//!     |                     +--rejected/transport--> Error --submit--> Submitting
//! ```
//!
//! The transitions live in the pure [`reduce`] function so they can be tested
//! without a mailing list. [`Widget`] owns one [`Attempt`], feeds it events,
//! and makes exactly one [`MailingList::subscribe`] call per accepted submit.

use crate::util::escape;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use url::Url;

/// A form field captured by the widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    FirstName,
    Email,
}

impl Field {
    /// The merge-field name the mailing list expects.
    pub fn name(self) -> &'static str {
        match self {
            Field::FirstName => "FNAME",
            Field::Email => "EMAIL",
        }
    }
}

impl FromStr for Field {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FNAME" | "FIRST_NAME" => Ok(Field::FirstName),
            "EMAIL" => Ok(Field::Email),
            _ => Err(UnknownFieldError(s.to_owned())),
        }
    }
}

/// Parses a `NAME=VALUE` assignment such as `FNAME=Jo`.
pub fn parse_assignment(arg: &str) -> Result<(Field, String), UnknownFieldError> {
    match arg.find('=') {
        Some(i) => Ok((arg[..i].trim().parse()?, arg[i + 1..].to_owned())),
        None => Err(UnknownFieldError(arg.to_owned())),
    }
}

#[derive(Debug, PartialEq)]
pub struct UnknownFieldError(pub String);

impl fmt::Display for UnknownFieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown subscribe form field `{}`", self.0)
    }
}

impl std::error::Error for UnknownFieldError {}

/// The values typed into the form so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields {
    pub first_name: String,
    pub email: String,
}

impl Fields {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::FirstName => self.first_name = value,
            Field::Email => self.email = value,
        }
    }

    /// The merge fields sent along with the email address. Empty fields are
    /// left out.
    pub fn merge_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = Vec::with_capacity(1);
        if !self.first_name.is_empty() {
            fields.push((Field::FirstName.name(), self.first_name.as_str()));
        }
        fields
    }
}

/// Why a subscription failed. Both variants are shown to the reader.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The mailing list answered but refused the subscription (e.g. the
    /// address is already subscribed). Carries the list's message verbatim.
    Rejected(String),

    /// The call didn't complete. Carries whatever detail the
    /// [`MailingList`] implementation chose to surface.
    Transport(String),
}

impl Error {
    pub fn detail(&self) -> &str {
        match self {
            Error::Rejected(msg) => msg,
            Error::Transport(detail) => detail,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Rejected(msg) => write!(f, "subscription rejected: {}", msg),
            Error::Transport(detail) => write!(f, "subscription failed: {}", detail),
        }
    }
}

impl std::error::Error for Error {}

/// Where the widget is in its lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    /// Waiting for the reader to fill in and submit the form.
    Subscribe,

    /// The mailing-list call is in flight.
    Submitting,

    /// Done. The form is gone for good.
    Subscribed { message: String },

    /// The last submit failed; the form is shown again.
    Error { detail: String },
}

impl Default for Mode {
    fn default() -> Mode {
        Mode::Subscribe
    }
}

/// The state of one widget: its mode and the captured form fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attempt {
    pub mode: Mode,
    pub fields: Fields,
}

/// Everything that can happen to an [`Attempt`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A form field changed.
    Edit(Field, String),

    /// The form was submitted.
    Submit,

    /// The mailing-list call finished, with the list's success message or
    /// the failure.
    Resolved(Result<String, Error>),
}

/// Applies `event` to `attempt`.
///
/// * Edits only touch the fields, never the mode.
/// * A submit moves `Subscribe` and `Error` to `Submitting`. It's ignored
///   while a call is already in flight and once subscribed.
/// * A resolution moves to `Subscribed` or `Error`.
pub fn reduce(attempt: Attempt, event: Event) -> Attempt {
    let Attempt { mode, mut fields } = attempt;
    let mode = match (mode, event) {
        (mode, Event::Edit(field, value)) => {
            fields.set(field, value);
            mode
        }
        (Mode::Subscribe, Event::Submit) | (Mode::Error { .. }, Event::Submit) => {
            Mode::Submitting
        }
        (mode, Event::Submit) => mode,
        (_, Event::Resolved(Ok(message))) => Mode::Subscribed { message },
        (_, Event::Resolved(Err(err))) => Mode::Error {
            detail: err.detail().to_owned(),
        },
    };
    Attempt { mode, fields }
}

/// The heading, call to action and form target shown around the form.
#[derive(Clone, Debug)]
pub struct Prompt {
    pub title: String,
    pub cta: String,

    /// Where the plain HTML form posts to, typically the mailing list's
    /// embed endpoint. On a generated page nothing intercepts the submit, so
    /// the browser navigates to the endpoint; only [`Widget`] (used by
    /// `skald subscribe`) runs the in-place state machine.
    pub action: Option<Url>,
}

impl Attempt {
    /// Whether a submit would be accepted.
    pub fn accepts_submit(&self) -> bool {
        matches!(self.mode, Mode::Subscribe | Mode::Error { .. })
    }

    /// The form is shown in every mode except `Subscribed`.
    pub fn shows_form(&self) -> bool {
        !matches!(self.mode, Mode::Subscribed { .. })
    }

    /// The error detail, only in `Error` mode.
    pub fn error(&self) -> Option<&str> {
        match &self.mode {
            Mode::Error { detail } => Some(detail),
            _ => None,
        }
    }

    /// The success message, only in `Subscribed` mode.
    pub fn message(&self) -> Option<&str> {
        match &self.mode {
            Mode::Subscribed { message } => Some(message),
            _ => None,
        }
    }

    pub fn render(&self, prompt: &Prompt) -> String {
        let mut html = format!(
            r#"<div class="subscribe"><div class="subscribe-cta"><h2 class="title">{}</h2><p>{}</p></div><div class="subscribe-form">"#,
            escape(&prompt.title),
            escape(&prompt.cta),
        );
        if let Some(detail) = self.error() {
            html.push_str(&format!(r#"<p class="error">{}</p>"#, escape(detail)));
        }
        if self.shows_form() {
            match &prompt.action {
                Some(action) => html.push_str(&format!(
                    r#"<form method="post" action="{}">"#,
                    escape(action.as_str())
                )),
                None => html.push_str(r#"<form method="post">"#),
            }
            html.push_str(&format!(
                r#"<label for="{fname}">First Name<input type="text" placeholder="First name" name="{fname}" id="{fname}" value="{first_name}"></label>"#,
                fname = Field::FirstName.name(),
                first_name = escape(&self.fields.first_name),
            ));
            html.push_str(&format!(
                r#"<label for="{email_name}">Email<input type="email" placeholder="email" name="{email_name}" id="{email_name}" value="{email}"></label>"#,
                email_name = Field::Email.name(),
                email = escape(&self.fields.email),
            ));
            match self.mode {
                Mode::Submitting => {
                    html.push_str(r#"<button type="submit" disabled>Subscribe</button>"#)
                }
                _ => html.push_str(r#"<button type="submit">Subscribe</button>"#),
            }
            html.push_str("</form>");
        }
        if let Some(message) = self.message() {
            html.push_str(&format!(
                r#"<div><p class="success">{}</p></div>"#,
                escape(message)
            ));
        }
        html.push_str("</div></div>");
        html
    }
}

/// The status a mailing list reports for a subscribe call.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    #[serde(other)]
    Error,
}

/// A mailing list's answer to a subscribe call.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Reply {
    #[serde(rename = "result")]
    pub status: Status,
    #[serde(default)]
    pub msg: String,
}

/// The subscribe call didn't complete (network trouble, bad gateway, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for TransportError {}

/// A mailing list that can subscribe an address. Implementations decide how
/// much of a transport failure to reveal in [`TransportError`]; whatever they
/// return is shown to the reader.
pub trait MailingList {
    fn subscribe(&self, email: &str, fields: &Fields) -> Result<Reply, TransportError>;
}

impl<L: MailingList + ?Sized> MailingList for &L {
    fn subscribe(&self, email: &str, fields: &Fields) -> Result<Reply, TransportError> {
        (**self).subscribe(email, fields)
    }
}

/// A subscribe form bound to a mailing list. Each widget owns its attempt;
/// nothing is shared between widgets.
pub struct Widget<L> {
    list: L,
    attempt: Attempt,
}

impl<L: MailingList> Widget<L> {
    pub fn new(list: L) -> Widget<L> {
        Widget {
            list,
            attempt: Attempt::default(),
        }
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    /// Records a field edit. Edits are applied one at a time, in order.
    pub fn edit(&mut self, field: Field, value: impl Into<String>) {
        self.dispatch(Event::Edit(field, value.into()));
    }

    /// Submits the form: one call to the mailing list, no retries. Does
    /// nothing if the attempt doesn't accept a submit right now.
    pub fn submit(&mut self) -> &Attempt {
        if !self.attempt.accepts_submit() {
            debug!(mode = ?self.attempt.mode, "ignoring submit");
            return &self.attempt;
        }
        self.dispatch(Event::Submit);

        let fields = &self.attempt.fields;
        let outcome = match self.list.subscribe(&fields.email, fields) {
            Ok(Reply {
                status: Status::Success,
                msg,
            }) => {
                info!("subscribed");
                Ok(msg)
            }
            Ok(Reply { msg, .. }) => {
                warn!(msg = %msg, "subscription rejected");
                Err(Error::Rejected(msg))
            }
            Err(err) => {
                warn!(err = %err, "subscription failed");
                Err(Error::Transport(err.0))
            }
        };
        self.dispatch(Event::Resolved(outcome));
        &self.attempt
    }

    fn dispatch(&mut self, event: Event) {
        let attempt = std::mem::take(&mut self.attempt);
        self.attempt = reduce(attempt, event);
    }
}
