use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Calculates the display width of a string in fixed-pitch columns.
///
/// CJK characters and most emoji occupy two columns, combining marks zero.
///
/// ```
/// use newsticker::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("日本"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Removes markup tags (`<...>`) from a feed fragment.
///
/// Feed summaries routinely carry `<p>`, `<br/>` and `<img ...>` even after
/// entity decoding. Tags are replaced by a single space so that adjacent
/// words separated only by markup do not run together; callers collapse the
/// extra whitespace afterwards.
///
/// Only closed, non-empty `<...>` runs count as tags. Decoded text such as
/// `<2%` with no closing `>` is kept as is, and so is a bare `<>`.
pub fn strip_html_tags(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 1..];
        match candidate.find('>') {
            Some(0) => {
                out.push_str("<>");
                rest = &candidate[1..];
            }
            Some(end) => {
                out.push(' ');
                rest = &candidate[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Strips control characters and ANSI escape sequences.
///
/// Feed text ends up on a terminal in preview mode, so CSI (`ESC [ ... final`)
/// and OSC (`ESC ] ... BEL|ST`) sequences are dropped whole. Tab, newline and
/// carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    fn is_stripped(c: char) -> bool {
        c == '\u{1b}' || c == '\u{7f}' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'))
    }

    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            if !is_stripped(c) {
                out.push(c);
            }
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\u{07}' {
                        break;
                    }
                    if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Cow::Owned(out)
}

/// Turns a feed-supplied fragment into one line of plain text.
///
/// Strips markup and control sequences, then collapses every run of
/// whitespace (including newlines) into a single space.
pub fn clean_feed_text(s: &str) -> String {
    let without_tags = strip_html_tags(s);
    let safe = strip_control_chars(&without_tags);
    safe.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the part of `text` that is visible in a window of `columns` columns
/// when the text is shifted left by `offset` columns.
///
/// A negative offset pushes the text right, leaving leading blank columns.
/// A wide character straddling the left edge is replaced by a space so that
/// everything after it stays column-aligned.
///
/// ```
/// use newsticker::util::column_window;
///
/// assert_eq!(column_window("abcdef", 2, 3), "cde");
/// assert_eq!(column_window("abc", -2, 4), "  ab");
/// ```
pub fn column_window(text: &str, offset: i64, columns: usize) -> String {
    let mut out = String::with_capacity(columns);
    let mut used = 0usize;

    if offset < 0 {
        let lead = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX).min(columns);
        out.extend(std::iter::repeat(' ').take(lead));
        used = lead;
    }

    let mut skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    for c in text.chars() {
        if used >= columns {
            break;
        }
        let width = UnicodeWidthChar::width(c).unwrap_or(0);
        if skip > 0 {
            if width > skip {
                // Straddles the left edge: pad the visible remainder.
                let remainder = (width - skip).min(columns - used);
                out.extend(std::iter::repeat(' ').take(remainder));
                used += remainder;
                skip = 0;
            } else {
                skip -= width;
            }
            continue;
        }
        if used + width > columns {
            break;
        }
        out.push(c);
        used += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_width_mixed() {
        assert_eq!(display_width(""), 0);
        assert_eq!(display_width("NHK ニュース"), 4 + 8);
    }

    #[test]
    fn test_strip_tags_clean_text_is_borrowed() {
        let result = strip_html_tags("plain text");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_tags_replaces_markup_with_space() {
        assert_eq!(strip_html_tags("a<br/>b"), "a b");
        assert_eq!(
            strip_html_tags(r#"<p>Hi <a href="x">there</a></p>"#),
            " Hi  there  "
        );
    }

    #[test]
    fn test_strip_tags_keeps_unclosed_angle_bracket() {
        assert_eq!(
            strip_html_tags("Inflation <2% for third month"),
            "Inflation <2% for third month"
        );
        assert_eq!(strip_html_tags("keep <img src="), "keep <img src=");
        assert_eq!(strip_html_tags("a <> b"), "a <> b");
        assert_eq!(strip_html_tags("x<b>y</b> <3"), "x y  <3");
    }

    #[test]
    fn test_strip_control_chars_removes_ansi_and_controls() {
        assert_eq!(strip_control_chars("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_control_chars("\x1b]0;title\x07safe"), "safe");
        assert_eq!(strip_control_chars("\x1b]0;title\x1b\\safe"), "safe");
        assert_eq!(strip_control_chars("a\x00b\x7fc"), "abc");
        assert_eq!(strip_control_chars("tab\tline\n"), "tab\tline\n");
    }

    #[test]
    fn test_clean_feed_text_collapses_whitespace() {
        assert_eq!(
            clean_feed_text("  <p>First\n\nline</p>\t<p>second</p> "),
            "First line second"
        );
    }

    #[test]
    fn test_clean_feed_text_empty() {
        assert_eq!(clean_feed_text(""), "");
        assert_eq!(clean_feed_text("<br/>"), "");
    }

    #[test]
    fn test_column_window_positive_offset() {
        assert_eq!(column_window("abcdef", 0, 4), "abcd");
        assert_eq!(column_window("abcdef", 4, 4), "ef");
        assert_eq!(column_window("abcdef", 10, 4), "");
    }

    #[test]
    fn test_column_window_negative_offset() {
        assert_eq!(column_window("abc", -4, 4), "    ");
        assert_eq!(column_window("abc", -1, 4), " abc");
        assert_eq!(column_window("abc", -9, 4), "    ");
    }

    #[test]
    fn test_column_window_wide_chars() {
        // Each CJK glyph is two columns.
        assert_eq!(column_window("日本語", 0, 4), "日本");
        assert_eq!(column_window("日本語", 1, 4), " 本");
        assert_eq!(column_window("日本語", 0, 3), "日");
    }
}
