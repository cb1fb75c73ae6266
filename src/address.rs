//! Address-shape checks used before grouping.
//!
//! Only a pragmatic RFC subset is enforced: the goal is to drop input that
//! could never be probed (no `@`, illegal characters, broken domain labels),
//! not to be a full 5321/5322 validator.

/// Split `email` into `(local, ascii_domain)` when it has a plausible
/// mailbox shape. Returns `None` for anything malformed; callers drop such
/// input silently.
pub(crate) fn split_valid(email: &str) -> Option<(String, String)> {
    if email.is_empty() || email.len() > 254 {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if domain.contains('@') {
        return None;
    }
    if local.is_empty() || local.len() > 64 || !is_local_part(local) {
        return None;
    }
    let ascii_domain = normalize_domain(domain)?;
    Some((local.to_string(), ascii_domain))
}

/// atext ASCII plus `.`, with no leading/trailing/double dot.
fn is_local_part(s: &str) -> bool {
    if s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#'
                    | '$'
                    | '%'
                    | '&'
                    | '\''
                    | '*'
                    | '+'
                    | '-'
                    | '/'
                    | '='
                    | '?'
                    | '^'
                    | '_'
                    | '`'
                    | '{'
                    | '|'
                    | '}'
                    | '~'
                    | '.'
            )
    })
}

/// IDNA conversion plus label checks. The returned ASCII form (lowercased,
/// punycoded) is what grouping keys and DNS queries use.
fn normalize_domain(domain: &str) -> Option<String> {
    let ascii = idna::domain_to_ascii(domain).ok()?;
    if ascii.is_empty() || ascii.len() > 253 || !ascii.contains('.') {
        return None;
    }
    for label in ascii.split('.') {
        if label.is_empty() || label.len() > 63 {
            return None;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return None;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
    }
    Some(ascii)
}
