use serde::{Deserialize, Serialize};

/// Severity reported by a plugin, taken straight from its exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum StatusCode {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl StatusCode {
    /// Order in which report sections list their entries
    pub const REPORT_ORDER: [StatusCode; 4] =
        [StatusCode::Critical, StatusCode::Warning, StatusCode::Unknown, StatusCode::Ok];

    /// Map a process exit code; anything outside 0..=3 is unknown
    pub fn from_exit_code(code: i32) -> Self {
        Self::from(i64::from(code))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Warning => "WARNING",
            StatusCode::Critical => "CRITICAL",
            StatusCode::Unknown => "UNKNOWN",
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == StatusCode::Ok
    }
}

impl From<i64> for StatusCode {
    fn from(code: i64) -> Self {
        match code {
            0 => StatusCode::Ok,
            1 => StatusCode::Warning,
            2 => StatusCode::Critical,
            _ => StatusCode::Unknown,
        }
    }
}

impl From<StatusCode> for i64 {
    fn from(status: StatusCode) -> Self {
        status as i64
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_map_one_to_one() {
        assert_eq!(StatusCode::from_exit_code(0), StatusCode::Ok);
        assert_eq!(StatusCode::from_exit_code(1), StatusCode::Warning);
        assert_eq!(StatusCode::from_exit_code(2), StatusCode::Critical);
        assert_eq!(StatusCode::from_exit_code(3), StatusCode::Unknown);
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        assert_eq!(StatusCode::from_exit_code(-1), StatusCode::Unknown);
        assert_eq!(StatusCode::from_exit_code(4), StatusCode::Unknown);
        assert_eq!(StatusCode::from_exit_code(127), StatusCode::Unknown);
    }

    #[test]
    fn test_serialized_as_integer() {
        assert_eq!(serde_json::to_string(&StatusCode::Critical).unwrap(), "2");
        let status: StatusCode = serde_json::from_str("42").unwrap();
        assert_eq!(status, StatusCode::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Warning.to_string(), "WARNING");
        assert!(StatusCode::Ok < StatusCode::Unknown);
    }
}
