use serde::Deserializer;
use serde::de::{Error, Unexpected, Visitor};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// [`LogFilter`] is a wrapper for [`EnvFilter`] that can be read from the configuration.
#[derive(Debug)]
pub struct LogFilter(pub EnvFilter);

impl Display for LogFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Clone for LogFilter {
    fn clone(&self) -> Self {
        LogFilter(EnvFilter::new(self.0.to_string()))
    }
}

impl FromStr for LogFilter {
    type Err = tracing_subscriber::filter::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LogFilter(EnvFilter::try_new(s)?))
    }
}

/// Deserializer for [LogFilter] from a filter directive. E.g. `info,gettext_anywhere=debug`.
pub fn parse_log_filter<'de, D>(deserializer: D) -> Result<LogFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct LogFilterVisitor;

    impl Visitor<'_> for LogFilterVisitor {
        type Value = LogFilter;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            write!(formatter, "a log filter directive")
        }

        fn visit_str<E>(self, value: &str) -> Result<LogFilter, E>
        where
            E: Error,
        {
            LogFilter::from_str(value)
                .map_err(|_| Error::invalid_value(Unexpected::Str(value), &"log filter directive"))
        }
    }

    deserializer.deserialize_str(LogFilterVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_directives() {
        let filter = LogFilter::from_str("info,gettext_anywhere=debug").unwrap();
        let cloned = filter.clone();
        assert_eq!(filter.to_string(), cloned.to_string());
    }

    #[test]
    fn reject_invalid_directive() {
        assert!(LogFilter::from_str("gettext_anywhere=verbose").is_err());
    }
}
