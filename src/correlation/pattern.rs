//! Cloud run URL recognition in free text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cypress Cloud web host.
pub const DEFAULT_CLOUD_URL: &str = "https://cloud.cypress.io";

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    build(DEFAULT_CLOUD_URL).expect("default cloud url pattern is valid")
});

fn build(cloud_url: &str) -> Result<Regex, regex::Error> {
    let host = regex::escape(cloud_url.trim_end_matches('/'));
    Regex::new(&format!(r"{host}/projects/[a-z0-9]+/runs/\d+"))
}

/// Matches `<cloud host>/projects/<id>/runs/<n>`.
#[derive(Debug, Clone)]
pub struct CloudUrlPattern {
    regex: Regex,
}

impl CloudUrlPattern {
    /// Pattern for a specific cloud web host.
    pub fn new(cloud_url: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: build(cloud_url)?,
        })
    }

    /// First cloud run URL in `text`.
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

impl Default for CloudUrlPattern {
    fn default() -> Self {
        Self {
            regex: DEFAULT_PATTERN.clone(),
        }
    }
}
