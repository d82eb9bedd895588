//! Terminal styling: emoji-prefixed, color-coded status lines.
//!
//! Mirrors the semantic message helpers used throughout the CLI surface:
//! callers reach for `error_message`/`success_message`/etc. rather than
//! hand-rolling ANSI codes, so every diagnostic line gets consistent
//! formatting regardless of which module emits it.

use std::sync::atomic::{AtomicU8, Ordering};

use color_print::cformat;

/// Progress emoji: `cformat!("{PROGRESS_EMOJI} <cyan>message</>")`
pub const PROGRESS_EMOJI: &str = "🔄";
/// Success emoji.
pub const SUCCESS_EMOJI: &str = "✅";
/// Error emoji.
pub const ERROR_EMOJI: &str = "❌";
/// Warning emoji.
pub const WARNING_EMOJI: &str = "🟡";
/// Hint emoji.
pub const HINT_EMOJI: &str = "💡";
/// Info emoji, for neutral status lines.
pub const INFO_EMOJI: &str = "⚪";
/// Prompt emoji, for questions requiring user confirmation.
pub const PROMPT_EMOJI: &str = "❓";

/// Format an error message with emoji and red styling.
pub fn error_message(content: impl AsRef<str>) -> String {
    cformat!("{ERROR_EMOJI} <red>{}</>", content.as_ref())
}

/// Format a hint message with emoji and dim styling.
pub fn hint_message(content: impl AsRef<str>) -> String {
    cformat!("{HINT_EMOJI} <dim>{}</>", content.as_ref())
}

/// Format a warning message with emoji and yellow styling.
pub fn warning_message(content: impl AsRef<str>) -> String {
    cformat!("{WARNING_EMOJI} <yellow>{}</>", content.as_ref())
}

/// Format a success message with emoji and green styling.
pub fn success_message(content: impl AsRef<str>) -> String {
    cformat!("{SUCCESS_EMOJI} <green>{}</>", content.as_ref())
}

/// Format a progress message with emoji and cyan styling.
pub fn progress_message(content: impl AsRef<str>) -> String {
    cformat!("{PROGRESS_EMOJI} <cyan>{}</>", content.as_ref())
}

/// Format an info message with emoji, no color (neutral status).
pub fn info_message(content: impl AsRef<str>) -> String {
    cformat!("{INFO_EMOJI} {}", content.as_ref())
}

/// Format a section heading: cyan, bold, with an optional dim suffix.
pub fn format_heading(title: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => cformat!("<cyan,bold>{}</> <dim>{}</>", title, suffix),
        None => cformat!("<cyan,bold>{}</>", title),
    }
}

/// Verbosity level: 0 = normal, 1 = `--verbose`, 2 = `--debug`.
static VERBOSITY: AtomicU8 = AtomicU8::new(0);

pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

pub fn is_verbose() -> bool {
    verbosity() >= 1
}

pub fn is_debug() -> bool {
    verbosity() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_constants_are_stable() {
        assert_eq!(PROGRESS_EMOJI, "🔄");
        assert_eq!(SUCCESS_EMOJI, "✅");
        assert_eq!(ERROR_EMOJI, "❌");
        assert_eq!(WARNING_EMOJI, "🟡");
        assert_eq!(HINT_EMOJI, "💡");
        assert_eq!(INFO_EMOJI, "⚪");
        assert_eq!(PROMPT_EMOJI, "❓");
    }

    #[test]
    fn message_helpers_include_emoji() {
        assert!(error_message("boom").contains(ERROR_EMOJI));
        assert!(success_message("done").contains(SUCCESS_EMOJI));
        assert!(warning_message("careful").contains(WARNING_EMOJI));
        assert!(hint_message("try this").contains(HINT_EMOJI));
        assert!(progress_message("working").contains(PROGRESS_EMOJI));
        assert!(info_message("fyi").contains(INFO_EMOJI));
    }

    #[test]
    fn verbosity_round_trips() {
        set_verbosity(2);
        assert!(is_verbose());
        assert!(is_debug());
        set_verbosity(0);
        assert!(!is_verbose());
        assert!(!is_debug());
    }
}
