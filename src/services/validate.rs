//! Pure validation predicates for inbound image content.

/// Extensions the pipeline accepts. Anything else is skipped.
pub const ALLOWED_FORMATS: [&str; 5] = ["gif", "jpeg", "jpg", "png", "bmp"];

/// Hard ceiling on stored content size: 5 MiB.
pub const MAX_IMAGE_BYTES: i64 = 5_242_880;

/// Membership test against the format allowlist.
///
/// Callers lowercase the extension before calling; the comparison here is
/// still case-insensitive so a missed fold cannot widen the allowlist.
pub fn is_allowed_format(extension: &str) -> bool {
    ALLOWED_FORMATS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(extension))
}

/// True iff `size_bytes` is a known, non-negative size within the ceiling.
///
/// Unknown sizes are modeled as negative values by callers and fail the
/// check; a real size must be obtained before content is accepted.
pub fn is_within_size_limit(size_bytes: i64) -> bool {
    (0..=MAX_IMAGE_BYTES).contains(&size_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_membership() {
        for ok in ["gif", "jpeg", "jpg", "png", "bmp", "PNG", "Jpeg"] {
            assert!(is_allowed_format(ok), "{ok}");
        }
        for bad in ["exe", "svg", "webp", "tiff", "", "pn g"] {
            assert!(!is_allowed_format(bad), "{bad}");
        }
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        assert!(is_within_size_limit(0));
        assert!(is_within_size_limit(MAX_IMAGE_BYTES));
        assert!(!is_within_size_limit(MAX_IMAGE_BYTES + 1));
    }

    #[test]
    fn unknown_or_negative_size_is_invalid() {
        assert!(!is_within_size_limit(-1));
        assert!(!is_within_size_limit(i64::MIN));
    }
}
