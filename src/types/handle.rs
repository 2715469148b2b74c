//! diaspora* handles (`user@pod.tld`)

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::Error;

static HANDLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9_.-]*)@([a-z0-9.-]+\.[a-z]+(?::[0-9]+)?)$")
        .expect("handle pattern is valid")
});

/// A user address split into its user and pod parts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    user: String,
    pod: String,
}

impl Handle {
    pub fn parse(handle: &str) -> crate::Result<Self> {
        handle.parse()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Pod host, possibly with a port
    pub fn pod(&self) -> &str {
        &self.pod
    }
}

impl FromStr for Handle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = HANDLE_PATTERN
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidHandle(s.to_string()))?;
        Ok(Self {
            user: caps[1].to_string(),
            pod: caps[2].to_string(),
        })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.pod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_handle() {
        let handle = Handle::parse("alice@pod.example.org").unwrap();
        assert_eq!(handle.user(), "alice");
        assert_eq!(handle.pod(), "pod.example.org");
        assert_eq!(handle.to_string(), "alice@pod.example.org");
    }

    #[test]
    fn test_parse_handle_with_port() {
        let handle = Handle::parse("bob_1@localhost.dev:3000").unwrap();
        assert_eq!(handle.pod(), "localhost.dev:3000");
    }

    #[rstest]
    #[case("")]
    #[case("alice")]
    #[case("@pod.example.org")]
    #[case("alice@pod")]
    #[case("1alice@pod.example.org")]
    fn test_invalid_handles(#[case] input: &str) {
        assert!(matches!(Handle::parse(input), Err(Error::InvalidHandle(_))));
    }
}
