/// Checks if a host falls inside an allowed-domain pattern
///
/// Patterns follow the usual crawler allow-list convention:
/// 1. "example.com" matches the bare domain and every subdomain of it
/// 2. "*.example.com" is accepted as an explicit spelling of the same rule
/// 3. Hosts such as "127.0.0.1" only match themselves
///
/// Both sides are compared case-insensitively.
///
/// # Examples
///
/// ```
/// use tankobon::url::domain_matches;
///
/// assert!(domain_matches("mangahere.co", "mangahere.co"));
/// assert!(domain_matches("mangahere.co", "www.mangahere.co"));
/// assert!(domain_matches("*.mangahere.co", "m.mangahere.co"));
/// assert!(!domain_matches("mangahere.co", "notmangahere.co"));
/// ```
pub fn domain_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim().trim_start_matches("*.").to_ascii_lowercase();
    let host = host.trim().to_ascii_lowercase();

    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    host == pattern || host.ends_with(&format!(".{}", pattern))
}
