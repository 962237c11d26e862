//! URL-token convention for route observers.
//!
//! A fragment (`#TOKEN` or `#/TOKEN`) or a single-segment path (`/TOKEN`)
//! longer than 10 characters with no `/` is treated as a transport token
//! and offered to the authenticator before the normal session check.

use crate::auth::Authenticator;

/// Candidates must be strictly longer than this.
pub const MIN_TOKEN_SEGMENT_LEN: usize = 10;

/// What the boundary should do after inspecting a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A token in the URL logged in; go to `/` and drop the token.
    RedirectToRoot,
    /// An existing session is still valid.
    Authenticated,
    /// Show the login entry point.
    LoginRequired,
}

/// Pull a candidate transport token out of a URL or path.
pub fn extract_candidate_token(url: &str) -> Option<String> {
    let without_scheme = match url.find("://") {
        Some(idx) => {
            let rest = &url[idx + 3..];
            match rest.find(['/', '#']) {
                Some(start) => &rest[start..],
                None => "",
            }
        }
        None => url,
    };

    let (before_fragment, fragment) = match without_scheme.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (without_scheme, None),
    };

    if let Some(candidate) = fragment.and_then(|f| candidate_segment(f.trim_start_matches('/'))) {
        return Some(candidate);
    }

    let path = before_fragment
        .split_once('?')
        .map_or(before_fragment, |(path, _)| path);
    candidate_segment(path.trim_start_matches('/'))
}

fn candidate_segment(segment: &str) -> Option<String> {
    let segment = segment.split_once('?').map_or(segment, |(s, _)| s);
    if segment.chars().count() > MIN_TOKEN_SEGMENT_LEN && !segment.contains('/') {
        Some(segment.to_string())
    } else {
        None
    }
}

/// Offer any URL token to the authenticator, then fall back to the
/// existing session.
pub fn resolve_route(auth: &Authenticator, url: &str) -> RouteOutcome {
    if let Some(token) = extract_candidate_token(url) {
        if auth.login_with_hex(&token) {
            return RouteOutcome::RedirectToRoot;
        }
    }

    if auth.is_authenticated() {
        RouteOutcome::Authenticated
    } else {
        RouteOutcome::LoginRequired
    }
}
