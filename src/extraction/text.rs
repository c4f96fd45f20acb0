//! Normalization of raw PDF text.

/// Normalize raw extractor output.
///
/// - Line endings become `\n`; runs of blank lines collapse to one blank line.
/// - Horizontal whitespace inside a line collapses to single spaces; lines are trimmed.
/// - Control, zero-width, and soft-hyphen characters are dropped.
/// - Words hyphenated across a line break are rejoined (`exam-` + `ple` -> `example`).
pub fn clean_text(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = false;

    for line in normalized.split('\n') {
        let visible: String = line.chars().filter(|c| !is_invisible(*c)).collect();
        let collapsed = visible.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() {
            if !previous_blank && !lines.is_empty() {
                lines.push(String::new());
            }
            previous_blank = true;
            continue;
        }

        if !previous_blank {
            if let Some(last) = lines.last_mut() {
                if ends_with_word_hyphen(last) && starts_lowercase(&collapsed) {
                    last.pop();
                    last.push_str(&collapsed);
                    continue;
                }
            }
        }

        lines.push(collapsed);
        previous_blank = false;
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn is_invisible(c: char) -> bool {
    (c.is_control() && !c.is_whitespace())
        || matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}' | '\u{00AD}')
}

fn ends_with_word_hyphen(line: &str) -> bool {
    let mut chars = line.chars().rev();
    matches!(
        (chars.next(), chars.next()),
        (Some('-'), Some(prev)) if prev.is_alphabetic()
    )
}

fn starts_lowercase(line: &str) -> bool {
    line.chars().next().is_some_and(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_blank_runs() {
        let raw = "  Deep   Learning \r\n\r\n\r\n\tfor   Cats  \n\n";
        assert_eq!(clean_text(raw), "Deep Learning\n\nfor Cats");
    }

    #[test]
    fn drops_invisible_characters() {
        let raw = "zero\u{200B}width\u{FEFF} and\u{0007} bell";
        assert_eq!(clean_text(raw), "zerowidth and bell");
    }

    #[test]
    fn keeps_non_ascii_letters() {
        assert_eq!(clean_text("Jürgen Schmidhuber"), "Jürgen Schmidhuber");
    }

    #[test]
    fn rejoins_hyphenated_words() {
        assert_eq!(clean_text("a robust exam-\nple here"), "a robust example here");
        assert_eq!(clean_text("state-of-the-\nArt"), "state-of-the-\nArt");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_text(" \n \r\n "), "");
    }
}
