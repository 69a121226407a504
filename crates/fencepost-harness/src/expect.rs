//! Expected-output matching with `???` wildcards.
//!
//! A pattern line that is exactly `???` matches any run of output lines,
//! including none. Inside any other line `???` matches any substring.

/// The wildcard token.
pub const WILDCARD: &str = "???";

/// Match one output line against one pattern line.
#[must_use]
pub fn line_matches(pattern: &str, line: &str) -> bool {
    let parts: Vec<&str> = pattern.split(WILDCARD).collect();
    let [first, middle @ .., last] = parts.as_slice() else {
        return pattern == line;
    };
    let Some(mut rest) = line.strip_prefix(first) else {
        return false;
    };
    for piece in middle {
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Match output lines against pattern lines.
#[must_use]
pub fn lines_match<P: AsRef<str>, L: AsRef<str>>(patterns: &[P], lines: &[L]) -> bool {
    let nl = lines.len();
    // reach[j]: the patterns seen so far consume exactly lines[..j].
    let mut reach = vec![false; nl + 1];
    reach[0] = true;
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let mut next = vec![false; nl + 1];
        if pattern == WILDCARD {
            let mut open = false;
            for j in 0..=nl {
                open |= reach[j];
                next[j] = open;
            }
        } else {
            for j in 0..nl {
                if reach[j] && line_matches(pattern, lines[j].as_ref()) {
                    next[j + 1] = true;
                }
            }
        }
        reach = next;
    }
    reach[nl]
}
