use url::Url;

/// Query parameters that only carry referral/analytics data and never select a listing.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "msclkid", "ref", "referrer", "campaign", "mkevt", "mkcid"];

/// Derive the identity key of a listing from its source URL.
///
/// Fragment and tracking parameters are dropped, remaining parameters are sorted and
/// a trailing slash is removed, so the same physical item keeps one key across fetches.
/// Strings that are not absolute URLs are trimmed of whitespace and trailing slashes.
pub fn listing_key(raw_url: &str) -> String {
    let trimmed = raw_url.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_string();
    };

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    url.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
