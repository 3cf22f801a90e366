use std::borrow::Cow;

/// Ellipsis appended by [`truncate_chars`].
const ELLIPSIS: &str = "...";

/// Truncates a string to at most `max_chars` characters.
///
/// If truncation is necessary, the result is `max_chars - 3` characters
/// followed by `"..."`, so the total never exceeds `max_chars`. Counting is
/// by Unicode scalar value, so multi-byte text never splits mid-codepoint.
///
/// # Examples
///
/// ```
/// use account_brief::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 8), "Hello...");
/// assert_eq!(truncate_chars("Test", 2), "Te");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    // Fast path: byte length bounds char count from above
    if s.len() <= max_chars {
        return Cow::Borrowed(s);
    }

    let Some((cut_at_max, _)) = s.char_indices().nth(max_chars) else {
        return Cow::Borrowed(s);
    };

    // Too narrow for "x...": hard cut without ellipsis
    if max_chars <= ELLIPSIS.len() {
        return Cow::Owned(s[..cut_at_max].to_string());
    }

    let keep = max_chars - ELLIPSIS.len();
    let cut = s
        .char_indices()
        .nth(keep)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len());
    Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escapes the three characters Slack treats as control sequences in mrkdwn.
///
/// Slack requires `&`, `<` and `>` to be HTML-entity encoded; inside a link
/// label `|` would also terminate the label early, so it is replaced too.
pub fn escape_mrkdwn(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '|']) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '|' => out.push('¦'),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Strip control characters and ANSI escape sequences from text.
///
/// Headlines and descriptions come from third-party publishers and end up in
/// log lines, prompts and Slack messages.
///
/// Strips:
/// - ASCII control chars: 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL 0x07 or ST `\x1b\\`)
/// - Bare ESC (0x1b) not followed by `[` or `]`
///
/// Preserves: tab (0x09), newline (0x0A), carriage return (0x0D).
///
/// Returns `Cow::Borrowed` when the input contains no control characters (common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    let is_stripped =
        |b: u8| b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d);

    if !bytes.iter().any(|&b| is_stripped(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            if i + 1 < len && bytes[i + 1] == b'[' {
                // CSI: parameter/intermediate bytes until the final byte
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            } else if i + 1 < len && bytes[i + 1] == b']' {
                // OSC: everything until BEL or ST
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && i + 1 < len && bytes[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_stripped(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_stripped(bytes[i]) {
                i += 1;
            }
            // Only ASCII control bytes end a run, and those never appear
            // mid-codepoint in valid UTF-8, so the slice is valid.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}
