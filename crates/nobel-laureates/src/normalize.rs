//! URL normalization for links discovered inside extracted markup.

use url::Url;

/// Resolve `candidate` into an absolute, scheme-qualified URL.
///
/// - Protocol-relative (`//host/path`) is forced to `https`.
/// - Three or more leading slashes carry no host and are treated as a single
///   absolute path on the base host.
/// - Anything without a host (path-relative, absolute-path, query- or
///   fragment-only) is resolved against `base`.
/// - Absolute URLs come back as-is.
///
/// Returns `None` only when the candidate cannot be parsed as a URL at all
/// (e.g. an invalid host). Applying the function to its own output returns
/// the same URL.
pub fn normalize(candidate: &str, base: &Url) -> Option<Url> {
    let candidate = candidate.trim();
    if let Some(rest) = candidate.strip_prefix("//") {
        if !rest.starts_with('/') {
            return Url::parse(&format!("https:{candidate}")).ok();
        }
        let path = format!("/{}", rest.trim_start_matches('/'));
        return base.join(&path).ok();
    }
    base.join(candidate).ok()
}
