//! Errors reported at the public construction and configuration boundary.
//!
//! Per-block processing never fails: degenerate data is expressed through
//! `Option`s and flags, and pipeline misconfiguration inside the crate is a
//! debug assertion.

use derive_more::{Display, Error, From};

/// Errors returned by [`EchoControl::new`](crate::EchoControl::new) and
/// [`EchoControlConfig::from_json`](crate::EchoControlConfig::from_json).
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Zero channels, or a channel count above the supported maximum.
    #[display("bad number of {kind} channels: {count}")]
    #[from(skip)]
    BadNumberChannels { kind: &'static str, count: usize },
    /// Downmixing and adaptive selection were both requested.
    #[display("{kind} alignment mixing cannot both downmix and select adaptively")]
    #[from(skip)]
    InvalidAlignmentMixing { kind: &'static str },
    /// The delay search decimation factor is not one of 2, 4, 8 or 16.
    #[display("unsupported down-sampling factor: {factor}")]
    #[from(skip)]
    BadDownSamplingFactor { factor: usize },
    /// The JSON document could not be parsed.
    #[display("invalid echo control config JSON: {_0}")]
    Json(#[error(source)] serde_json::Error),
    /// The JSON document has no top-level `aec3` object.
    #[display("missing \"aec3\" section in echo control config JSON")]
    #[from(skip)]
    MissingAec3Section,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = Error::BadNumberChannels {
            kind: "render",
            count: 0,
        };
        assert_eq!(e.to_string(), "bad number of render channels: 0");

        let e = Error::InvalidAlignmentMixing { kind: "capture" };
        assert_eq!(
            e.to_string(),
            "capture alignment mixing cannot both downmix and select adaptively"
        );

        let e = Error::BadDownSamplingFactor { factor: 3 };
        assert_eq!(e.to_string(), "unsupported down-sampling factor: 3");

        assert_eq!(
            Error::MissingAec3Section.to_string(),
            "missing \"aec3\" section in echo control config JSON"
        );
    }

    #[test]
    fn json_errors_convert_and_keep_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Json(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
