use serde::{Deserialize, Serialize};

/// The severity of a log message, ordered from least to most severe.
///
/// These map to syslog message severities, as specified in RFC-5424.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(LoggingLevel::Debug < LoggingLevel::Info);
        assert!(LoggingLevel::Warning < LoggingLevel::Error);
        assert!(LoggingLevel::Alert < LoggingLevel::Emergency);
    }

    #[test]
    fn test_level_wire_names() {
        let level: LoggingLevel = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, LoggingLevel::Warning);
        assert_eq!(serde_json::to_string(&LoggingLevel::Notice).unwrap(), "\"notice\"");
    }
}
