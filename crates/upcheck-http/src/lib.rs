//! HTTP collaborators for upcheck: a blocking `reqwest` feed source with a
//! JSON feed parser, and a probe that asks the connected server for its
//! version.

mod feed;
mod probe;
mod source;

pub use feed::parse_feed;
pub use probe::{HttpEligibilityProbe, ProbeSettings, interpret_probe_response};
pub use source::{ClientBuildError, HttpFeedSource, HttpSettings};
