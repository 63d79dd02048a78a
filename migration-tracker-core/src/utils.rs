use chrono::{DateTime, FixedOffset};
use encoding_rs::UTF_8;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// start a steady spinner for long git operations
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// decode file bytes as utf-8, falling back to lossy conversion
pub fn decode_content(content: &[u8]) -> String {
    let (cow, had_errors) = UTF_8.decode_without_bom_handling(content);
    if had_errors {
        String::from_utf8_lossy(content).to_string()
    } else {
        cow.into_owned()
    }
}

/// does the path end with one of the candidate suffixes
pub fn has_candidate_extension(path: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| path.ends_with(ext.as_str()))
}

/// format a timestamp as yyyy-mm-dd
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// first seven characters of a commit id
pub fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_handles_invalid_utf8() {
        assert_eq!(decode_content("héllo".as_bytes()), "héllo");
        assert_eq!(decode_content(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn candidate_extensions() {
        let extensions = vec![".js".to_string(), ".html".to_string()];
        assert!(has_candidate_extension("a/b.controller.js", &extensions));
        assert!(has_candidate_extension("a/b.html", &extensions));
        assert!(!has_candidate_extension("a/b.json", &extensions));
    }

    #[test]
    fn short_ids_and_dates() {
        assert_eq!(short_id("0123456789abcdef"), "0123456");
        assert_eq!(short_id("abc"), "abc");
        let date = DateTime::parse_from_rfc3339("2024-01-09T10:00:00+02:00").unwrap();
        assert_eq!(format_date(&date), "2024-01-09");
    }
}
