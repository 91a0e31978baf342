//! Verdict classification.

use codebox_core::Verdict;

/// Map an isolation-layer status code to a verdict.
///
/// Total and side-effect-free: every possible status code — including an
/// absent one and arbitrary unrecognized strings — produces exactly one
/// verdict. `UnknownStatus` is the defensive catch-all for codes not yet
/// enumerated here; it must never be replaced with a panic or an error.
pub fn classify(status: Option<&str>) -> Verdict {
    match status {
        None => Verdict::Success,
        Some("XX") => Verdict::InternalError,
        Some("TO") => Verdict::Timeout,
        Some("RE") => Verdict::RuntimeError,
        Some("SG") => Verdict::Crashed,
        Some(_) => Verdict::UnknownStatus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_their_verdicts() {
        assert_eq!(classify(None), Verdict::Success);
        assert_eq!(classify(Some("XX")), Verdict::InternalError);
        assert_eq!(classify(Some("TO")), Verdict::Timeout);
        assert_eq!(classify(Some("RE")), Verdict::RuntimeError);
        assert_eq!(classify(Some("SG")), Verdict::Crashed);
    }

    #[test]
    fn anything_else_is_unknown_status() {
        for junk in ["", "ZZ", "to", "xx ", "TIMEOUT", "☃", "RE\n", "0"] {
            assert_eq!(classify(Some(junk)), Verdict::UnknownStatus, "{:?}", junk);
        }
    }
}
