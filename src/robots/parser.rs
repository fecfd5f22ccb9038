//! Robots.txt rules backed by the robotstxt crate

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Rules of one host's robots.txt
///
/// An empty body, or a host whose robots.txt could not be retrieved,
/// allows everything.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    body: String,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            body: content.to_string(),
        }
    }

    /// Rules that allow every path
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks whether `url` may be fetched by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check
    /// * `user_agent` - Product token of the crawler (e.g. "tankobon")
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.body.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, user_agent, url)
    }

    /// `Crawl-delay` that applies to `user_agent`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group.
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    if seconds < 0.0 || !seconds.is_finite() {
                        continue;
                    }
                    let delay = Duration::from_secs_f64(seconds);
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard)
    }
}
