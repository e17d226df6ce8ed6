//! The library code for the `skald` blog generator. The architecture can be
//! generally broken down into two distinct steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`])
//! 2. Converting the posts into output files on disk ([`crate::write`])
//!
//! The second step is built from views over the parsed posts, all of which
//! only borrow them:
//!
//! * [`crate::index`] groups posts by canonical tag and ranks the popular tags
//! * [`crate::listing`] paginates the home page
//! * [`crate::tag`], [`crate::share`] and [`crate::layout`] render the small
//!   HTML fragments (tag chips, share buttons, the page header)
//!
//! [`crate::subscribe`] holds the subscribe form's state machine. It talks to a
//! [`crate::subscribe::MailingList`], of which [`crate::mailchimp`] is the
//! HTTP implementation.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod index;
pub mod layout;
pub mod listing;
pub mod mailchimp;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod share;
pub mod subscribe;
pub mod tag;
pub mod url;
mod util;
mod value;
pub mod write;
