//! Engine configuration.

use std::time::Duration;

use crate::compiler::syntax::Operator;

/// A character that cannot serve as the tag indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' cannot be used as a tag indicator")]
pub struct InvalidTagIndicator(pub char);

/// Rendering configuration shared by a renderer's pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// The character that introduces a directive. Default `#`.
    pub tag_indicator: char,
    /// Cached documents whose average serialization time is below this
    /// threshold render synchronously on the calling task. This is a
    /// fast-path policy, not a deadline. Default 50 ms.
    pub block_limit: Duration,
}

impl Config {
    /// The default configuration with a different tag indicator.
    ///
    /// Identifier characters, whitespace, operator characters, and the
    /// structural characters of the parameter grammar are rejected.
    pub fn with_tag_indicator(indicator: char) -> Result<Self, InvalidTagIndicator> {
        const STRUCTURAL: &[char] = &['(', ')', '[', ']', ',', ':', '"', '\\'];
        if indicator.is_alphanumeric()
            || indicator == '_'
            || indicator.is_whitespace()
            || Operator::starts_operator(indicator)
            || STRUCTURAL.contains(&indicator)
        {
            return Err(InvalidTagIndicator(indicator));
        }
        Ok(Self {
            tag_indicator: indicator,
            ..Self::default()
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_indicator: '#',
            block_limit: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_indicator_and_limit() {
        let config = Config::default();
        assert_eq!(config.tag_indicator, '#');
        assert_eq!(config.block_limit, Duration::from_millis(50));
    }

    #[test]
    fn at_sign_is_a_valid_indicator() {
        assert!(Config::with_tag_indicator('@').is_ok());
    }

    #[test]
    fn grammar_characters_are_rejected() {
        for c in ['a', '1', '_', ' ', '(', '"', '.', '+', '$', '\\'] {
            assert_eq!(
                Config::with_tag_indicator(c),
                Err(InvalidTagIndicator(c)),
                "{c:?} should be rejected"
            );
        }
    }
}
