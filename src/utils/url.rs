//! URL utilities for consistent URL handling
//!
//! Endpoints are configured by hand, so trailing slashes are common. These
//! helpers keep function URLs free of double slashes.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use scanlens::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://demo.supabase.co/functions/v1"), "https://demo.supabase.co/functions/v1");
/// assert_eq!(normalize_base_url("https://demo.supabase.co/functions/v1///"), "https://demo.supabase.co/functions/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Construct the URL of a hosted function from the base URL and its name
///
/// # Examples
///
/// ```
/// use scanlens::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://demo.supabase.co/functions/v1/", "analyze-image"),
///     "https://demo.supabase.co/functions/v1/analyze-image"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://fn.example.com/v1"),
            "https://fn.example.com/v1"
        );
        assert_eq!(
            normalize_base_url("https://fn.example.com/v1/"),
            "https://fn.example.com/v1"
        );
        assert_eq!(
            normalize_base_url("  https://fn.example.com/  "),
            "https://fn.example.com"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("https://fn.example.com/v1", "chat-with-ai"),
            "https://fn.example.com/v1/chat-with-ai"
        );
        assert_eq!(
            construct_api_url("https://fn.example.com/v1/", "/translate"),
            "https://fn.example.com/v1/translate"
        );
        assert_eq!(
            construct_api_url("https://fn.example.com/v1///", "///analyze-image"),
            "https://fn.example.com/v1/analyze-image"
        );
    }
}
