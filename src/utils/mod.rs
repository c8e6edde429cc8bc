use regex::Regex;

pub mod logging;

const SUPPORTED_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];

/// Purely syntactic check: the URL mentions one of the supported hosts.
pub fn is_supported_url(url: &str) -> bool {
    SUPPORTED_HOSTS.iter().any(|host| url.contains(host))
}

/// Extract the 11-character video id from a watch, short or embed URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let re = Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .ok()?;
    re.captures(url).map(|caps| caps[1].to_string())
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_url() {
        assert!(is_supported_url("https://youtu.be/abc123"));
        assert!(is_supported_url("see www.youtube.com somewhere"));
        assert!(!is_supported_url("not-a-url"));
        assert!(!is_supported_url("https://vimeo.com/123"));
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=x&v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_video_id("https://youtu.be/abc123"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.mp4"), "test_file.mp4");
        assert_eq!(sanitize_filename("normal-name.mp4"), "normal-name.mp4");
        assert_eq!(sanitize_filename(" .hidden. "), "hidden");
    }
}
