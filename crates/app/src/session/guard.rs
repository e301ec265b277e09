//! Route guard: should the auth prompt be shown for a path?
//!
//! Pure derived state - no I/O. Recomputed by the UI layer on every
//! navigation and on every change to the identity or site settings.

use crate::models::SiteSettings;

/// Path prefixes that never require authentication.
///
/// Everything not listed here is gated when the site-wide `require_auth`
/// flag is on.
pub const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/find",
    "/deals",
    "/blog",
    "/about",
    "/how-it-works",
    "/contact",
    "/faq",
    "/terms",
    "/privacy",
    "/email-preview",
    "/demo",
];

/// Whether a navigation path falls outside the public allow-list.
///
/// Matching is by path prefix on whole segments, so `/deals/123` is public
/// but `/dealsroom` is not. The bare home path only matches itself.
#[must_use]
pub fn requires_auth(path: &str) -> bool {
    !PUBLIC_PATHS.iter().any(|prefix| {
        if *prefix == "/" {
            return path == "/";
        }
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
    })
}

/// Whether the auth prompt must be shown right now.
///
/// True only when the site-wide flag gates the site, the path is not
/// public, and nobody is signed in. Settings still in flight (`None`)
/// fail open.
#[must_use]
pub fn should_prompt(settings: Option<SiteSettings>, path: &str, identity_present: bool) -> bool {
    settings.is_some_and(|s| s.require_auth) && requires_auth(path) && !identity_present
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATED: Option<SiteSettings> = Some(SiteSettings { require_auth: true });
    const OPEN: Option<SiteSettings> = Some(SiteSettings {
        require_auth: false,
    });

    #[test]
    fn test_public_paths_do_not_require_auth() {
        assert!(!requires_auth("/"));
        assert!(!requires_auth("/find"));
        assert!(!requires_auth("/find?market=austin"));
        assert!(!requires_auth("/deals/123"));
        assert!(!requires_auth("/blog/2026-market-outlook"));
        assert!(!requires_auth("/email-preview/welcome"));
    }

    #[test]
    fn test_private_paths_require_auth() {
        assert!(requires_auth("/inbox"));
        assert!(requires_auth("/dashboard"));
        assert!(requires_auth("/settings/profile"));
    }

    #[test]
    fn test_prefix_matches_whole_segments_only() {
        assert!(requires_auth("/dealsroom"));
        assert!(requires_auth("/findings"));
    }

    #[test]
    fn test_prompt_decision_table() {
        // Gated site, private path, signed out -> prompt.
        assert!(should_prompt(GATED, "/inbox", false));
        // Gated site, public path, signed out -> no prompt.
        assert!(!should_prompt(GATED, "/find", false));
        // Gated site, private path, signed in -> no prompt.
        assert!(!should_prompt(GATED, "/inbox", true));
        // Open site, any path, signed out -> no prompt.
        assert!(!should_prompt(OPEN, "/inbox", false));
        // Settings not yet loaded fail open.
        assert!(!should_prompt(None, "/inbox", false));
    }
}
