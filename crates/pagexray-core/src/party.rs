use regex::Regex;

/// URL pattern identifying the site under test
///
/// The pattern is a regular expression searched anywhere in the asset URL,
/// so `example\.com` matches both `https://example.com/` and
/// `https://cdn.example.com/app.js`.
#[derive(Debug, Clone)]
pub struct FirstPartyPattern(Regex);

impl FirstPartyPattern {
    pub fn parse(pattern: &str) -> crate::Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            crate::Error::InvalidPattern(format!("Invalid regex '{}': {}", pattern, e))
        })?;
        Ok(FirstPartyPattern(regex))
    }

    /// Check if an asset URL belongs to the first party
    pub fn matches(&self, url: &str) -> bool {
        self.0.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_anywhere_in_url() {
        let pattern = FirstPartyPattern::parse(r"example\.com").unwrap();
        assert!(pattern.matches("https://example.com/"));
        assert!(pattern.matches("https://cdn.example.com/app.js"));
        assert!(!pattern.matches("https://tracker.net/pixel.gif"));
    }

    #[test]
    fn test_alternation() {
        let pattern = FirstPartyPattern::parse(r"^https://(www|static)\.example\.org/").unwrap();
        assert!(pattern.matches("https://www.example.org/index.html"));
        assert!(pattern.matches("https://static.example.org/main.css"));
        assert!(!pattern.matches("https://ads.example.org/x.js"));
        assert_eq!(pattern.as_str(), r"^https://(www|static)\.example\.org/");
    }

    #[test]
    fn test_invalid_pattern() {
        let result = FirstPartyPattern::parse("(unclosed");
        assert!(matches!(result, Err(crate::Error::InvalidPattern(_))));
    }
}
