/// Canonicalize a raw URL string into a stable, comparable form.
///
/// The transform is pure and idempotent: applying it twice yields the same
/// string. An empty (or whitespace-only) input returns an empty string and
/// must be skipped by the caller.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let with_scheme = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let Some(separator) = with_scheme.find("://") else {
        return with_scheme;
    };
    let scheme = with_scheme[..separator].to_ascii_lowercase();
    let rest = &with_scheme[separator + 3..];

    // Fragment is dropped entirely; query is kept verbatim.
    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
    let (before_query, query) = match rest.split_once('?') {
        Some((before, query)) => (before, Some(query)),
        None => (rest, None),
    };

    let (authority, raw_path) = match before_query.find('/') {
        Some(index) => (&before_query[..index], &before_query[index..]),
        None => (before_query, ""),
    };
    let host = strip_default_port(&scheme, &authority.to_ascii_lowercase());
    let path = canonical_path(&raw_path.to_ascii_lowercase());

    // Canonical scheme is https: two spellings of the same page must compare
    // equal regardless of which scheme the caller typed.
    let mut output = format!("https://{host}{path}");
    if let Some(query) = query {
        output.push('?');
        output.push_str(query);
    }
    output
}

/// Host portion of a URL: no scheme, no port, no path, lowercased.
pub fn host_of(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map_or(url, |(_, after)| after);
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, after)| after);
    let host = host.split_once(':').map_or(host, |(before, _)| before);
    host.to_ascii_lowercase()
}

/// Last non-empty path segment of a URL, if any.
pub fn last_path_segment(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, after)| after);
    let rest = rest.split(['?', '#']).next().unwrap_or("");
    let path = rest.split_once('/').map_or("", |(_, path)| path);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn strip_default_port(scheme: &str, authority: &str) -> String {
    let authority = if scheme == "http" {
        authority.strip_suffix(":80").unwrap_or(authority)
    } else {
        authority
    };
    // The canonical scheme is https, so :443 is a default port either way.
    authority.strip_suffix(":443").unwrap_or(authority).to_string()
}

fn canonical_path(raw: &str) -> String {
    let mut path = String::with_capacity(raw.len().max(1));
    for ch in raw.chars() {
        if ch == '/' && path.ends_with('/') {
            continue;
        }
        path.push(ch);
    }
    if path.is_empty() {
        path.push('/');
    }

    for index_page in ["index.html", "index.htm"] {
        if let Some(stem) = path.strip_suffix(index_page)
            && stem.ends_with('/')
        {
            path = stem.to_string();
            break;
        }
    }

    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}
