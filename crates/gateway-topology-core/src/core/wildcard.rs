// crates/gateway-topology-core/src/core/wildcard.rs
// ============================================================================
// Module: Wildcard Matching
// Description: `*` glob matching for policy actions and scope ARNs.
// Purpose: Share one matcher between identity statements and grants.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Platform policy languages treat `*` as "any run of characters" and `?` as
//! "any single character". Matching is case-sensitive and iterative, so
//! adversarial patterns cannot trigger exponential backtracking.

/// Returns true when `value` matches `pattern`.
#[must_use]
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    let (mut p, mut v) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = v;
            p += 1;
        } else if let Some(star_at) = star {
            p = star_at + 1;
            resume += 1;
            v = resume;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic_in_result_fn,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test assertions may panic inside Result-returning tests."
    )]

    use super::wildcard_match;

    #[test]
    fn star_matches_any_run() {
        assert!(wildcard_match("logs:*", "logs:PutLogEvents"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("arn:*:prod/*/{proxy+}", "arn:aws:prod/GET/{proxy+}"));
        assert!(!wildcard_match("logs:Create*", "logs:PutLogEvents"));
    }

    #[test]
    fn literal_requires_exact_match() {
        assert!(wildcard_match("lambda:InvokeFunction", "lambda:InvokeFunction"));
        assert!(!wildcard_match("lambda:InvokeFunction", "lambda:InvokeFunctionUrl"));
        assert!(wildcard_match("a?c", "abc"));
    }
}
