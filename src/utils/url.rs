//! Backend URL helpers.

/// Strip trailing slashes so endpoints can be appended safely.
///
/// ```
/// use chatops::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// This function normalizes the base URL and safely appends the endpoint,
/// ensuring there are no double slashes in the result.
///
/// # Examples
///
/// ```
/// use chatops::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000", "api/chat/chat"),
///     "http://localhost:8000/api/chat/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/api/users"),
///     "http://localhost:8000/api/users"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Port the routing backend listens on when only a host is known.
pub const BACKEND_PORT: u16 = 8000;

/// Derive the backend URL from a host name.
///
/// Loopback hosts always map to `localhost`.
///
/// ```
/// use chatops::utils::url::backend_base_url;
///
/// assert_eq!(backend_base_url("127.0.0.1"), "http://localhost:8000");
/// assert_eq!(backend_base_url("ops.example.com"), "http://ops.example.com:8000");
/// ```
pub fn backend_base_url(host: &str) -> String {
    let host = host.trim();
    match host {
        "" | "localhost" | "127.0.0.1" => format!("http://localhost:{BACKEND_PORT}"),
        other => format!("http://{other}:{BACKEND_PORT}"),
    }
}
