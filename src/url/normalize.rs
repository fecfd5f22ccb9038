use url::Url;

/// Query parameters that never change which document a URL points to
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Computes the key under which a URL is deduplicated within one crawl
///
/// Two URLs with the same key are treated as the same logical fetch. The key:
///
/// 1. Lowercases the host (the `url` crate already does this for
///    special schemes)
/// 2. Drops the default port
/// 3. Collapses empty and `.` path segments, resolves `..`
/// 4. Drops a trailing slash (except for the root path)
/// 5. Drops the fragment
/// 6. Drops tracking query parameters and sorts the remaining ones
///
/// The scheme and any `www.` prefix are kept: the key must never make two
/// different hosts look alike.
///
/// # Examples
///
/// ```
/// use tankobon::url::dedup_key;
/// use url::Url;
///
/// let a = Url::parse("http://www.mangahere.co/manga/a/?utm_source=x#top").unwrap();
/// let b = Url::parse("http://www.mangahere.co/manga/a").unwrap();
/// assert_eq!(dedup_key(&a), dedup_key(&b));
/// ```
pub fn dedup_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);

    let path = normalize_path(key.path());
    key.set_path(&path);

    if key.query().is_some() {
        let params = filter_and_sort_query_params(&key);
        if params.is_empty() {
            key.set_query(None);
        } else {
            // Pairs come back decoded; re-encode so `%26` stays distinct from `&`.
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            key.set_query(Some(&query));
        }
    }

    key.to_string()
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
