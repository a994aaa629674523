//! Google Cloud Storage URL handling and prefix derivation

use crate::error::{LogmineError, LogmineResult};

/// Hosts accepted for the HTTPS form of an object URL
const GCS_HTTP_HOSTS: [&str; 2] = ["storage.googleapis.com", "storage.cloud.google.com"];

/// Path boundary tokens used to cut an object path back to the dataset prefix
const PREFIX_MARKERS: [&str; 3] = ["/report/", "/store/", "/log/"];

/// A parsed bucket/object location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsLocation {
    pub bucket: String,
    pub object: String,
}

impl GcsLocation {
    /// Parse a `gs://bucket/path` or `https://<gcs-host>/bucket/path` URL.
    /// Any other scheme or host is a configuration error.
    pub fn parse(url: &str) -> LogmineResult<Self> {
        if let Some(rest) = url.strip_prefix("gs://") {
            let (bucket, object) = rest
                .split_once('/')
                .ok_or_else(|| LogmineError::config(format!("Invalid GCS url: {url}")))?;
            if bucket.is_empty() || object.is_empty() {
                return Err(LogmineError::config(format!("Invalid GCS url: {url}")));
            }
            return Ok(Self {
                bucket: bucket.to_string(),
                object: object.to_string(),
            });
        }

        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| LogmineError::config(format!("Unsupported artefact url scheme: {url}")))?;
        let (host, path) = rest
            .split_once('/')
            .ok_or_else(|| LogmineError::config(format!("Invalid GCS HTTP url: {url}")))?;
        if !GCS_HTTP_HOSTS.contains(&host) {
            return Err(LogmineError::config(format!(
                "Unsupported GCS HTTP url: {url}"
            )));
        }
        let (bucket, object) = path
            .split_once('/')
            .ok_or_else(|| LogmineError::config(format!("Invalid GCS HTTP url: {url}")))?;
        if bucket.is_empty() || object.is_empty() {
            return Err(LogmineError::config(format!("Invalid GCS HTTP url: {url}")));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    }

    /// Plain HTTPS form of this location, suitable for a direct GET
    pub fn https_url(&self) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.bucket, self.object)
    }
}

/// Turn any supported artefact URL into a directly fetchable HTTPS URL.
/// Already-HTTP URLs (including signed ones) pass through untouched.
pub fn fetchable_url(url: &str) -> LogmineResult<String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(url.to_string());
    }
    Ok(GcsLocation::parse(url)?.https_url())
}

/// Derive the dataset's bucket, base prefix and chat-log folder from a
/// reference object URL (normally the report file).
///
/// The prefix is everything before the first `/report/`, `/store/` or `/log/`
/// boundary in the object path (matched case-insensitively). Without a
/// boundary it falls back to the parent path of the object. Both the prefix
/// and the chat-log folder come back trailing-slash-normalized.
pub fn derive_prefix(
    reference_url: &str,
    suggested_folder: Option<&str>,
    default_folder: &str,
) -> LogmineResult<(String, String, String)> {
    let location = GcsLocation::parse(reference_url)?;
    let path = &location.object;
    // The markers are pure ASCII; ASCII lowercasing keeps byte offsets
    // stable even when the path itself contains multi-byte characters.
    let lowered = path.to_ascii_lowercase();

    let base_dir = PREFIX_MARKERS
        .iter()
        .find_map(|marker| lowered.find(marker).map(|idx| &path[..idx]))
        .unwrap_or_else(|| match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        });

    let prefix = normalize_folder(base_dir);
    let chat_logs_folder = normalize_folder(suggested_folder.unwrap_or(default_folder));
    Ok((location.bucket, prefix, chat_logs_folder))
}

/// Strip surrounding slashes and append exactly one trailing slash.
/// An empty segment stays empty.
pub fn normalize_folder(segment: &str) -> String {
    let trimmed = segment.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gs_url() {
        let location = GcsLocation::parse("gs://my-bucket/proj/report/report.json").unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.object, "proj/report/report.json");
    }

    #[test]
    fn test_parse_https_url() {
        let location =
            GcsLocation::parse("https://storage.googleapis.com/my-bucket/proj/store.json").unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.object, "proj/store.json");
    }

    #[test]
    fn test_parse_rejects_unknown_scheme_and_host() {
        assert!(matches!(
            GcsLocation::parse("s3://bucket/key"),
            Err(LogmineError::Config(_))
        ));
        assert!(matches!(
            GcsLocation::parse("https://example.com/bucket/key"),
            Err(LogmineError::Config(_))
        ));
        assert!(GcsLocation::parse("gs://bucket-only").is_err());
    }

    #[test]
    fn test_https_url_round_trip() {
        let location = GcsLocation::parse("gs://b/p/file.xes").unwrap();
        assert_eq!(location.https_url(), "https://storage.googleapis.com/b/p/file.xes");
    }

    #[test]
    fn test_fetchable_url_passthrough() {
        let signed = "https://storage.googleapis.com/b/p/file.xes?X-Goog-Signature=abc";
        assert_eq!(fetchable_url(signed).unwrap(), signed);
    }

    #[test]
    fn test_derive_prefix_with_marker() {
        let (bucket, prefix, folder) =
            derive_prefix("gs://b/proj/report/report.json", None, "chat_logs/").unwrap();
        assert_eq!(bucket, "b");
        assert_eq!(prefix, "proj/");
        assert_eq!(folder, "chat_logs/");
    }

    #[test]
    fn test_derive_prefix_marker_is_case_insensitive() {
        let (_, prefix, _) =
            derive_prefix("gs://b/proj/Report/report.json", None, "chat_logs/").unwrap();
        assert_eq!(prefix, "proj/");
    }

    #[test]
    fn test_derive_prefix_handles_non_ascii_paths() {
        let (bucket, prefix, _) =
            derive_prefix("gs://b/İİİİİİİİİ/report/é.json", None, "chat_logs/").unwrap();
        assert_eq!(bucket, "b");
        assert_eq!(prefix, "İİİİİİİİİ/");

        let (_, prefix, _) =
            derive_prefix("gs://b/données/résultats/é.json", None, "chat_logs/").unwrap();
        assert_eq!(prefix, "données/résultats/");
    }

    #[test]
    fn test_derive_prefix_without_marker_uses_parent() {
        let (_, prefix, _) =
            derive_prefix("gs://b/proj/result/report.json", None, "chat_logs/").unwrap();
        assert_eq!(prefix, "proj/result/");
    }

    #[test]
    fn test_derive_prefix_honors_suggested_folder() {
        let (_, _, folder) = derive_prefix(
            "gs://b/proj/report/report.json",
            Some("/conversations/"),
            "chat_logs/",
        )
        .unwrap();
        assert_eq!(folder, "conversations/");
    }

    #[test]
    fn test_normalize_folder() {
        assert_eq!(normalize_folder("chat_logs"), "chat_logs/");
        assert_eq!(normalize_folder("/chat_logs/"), "chat_logs/");
        assert_eq!(normalize_folder(""), "");
    }
}
