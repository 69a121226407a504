//! Line diff for failed scenarios.

use crate::expect::line_matches;

/// Render expected-vs-actual line by line, marking lines that disagree.
///
/// Wildcard-aware per line but positional, so after a `???` pattern line
/// the markers are approximate.
#[must_use]
pub fn render_diff(expected: &[String], actual: &[String]) -> String {
    let mut out = String::from("--- expected\n+++ actual\n");
    let rows = expected.len().max(actual.len());
    for i in 0..rows {
        match (expected.get(i), actual.get(i)) {
            (Some(e), Some(a)) if line_matches(e, a) => {
                out.push_str(&format!(" {a}\n"));
            }
            (Some(e), Some(a)) => {
                out.push_str(&format!("@@ line {} @@\n-{e}\n+{a}\n", i + 1));
            }
            (Some(e), None) => out.push_str(&format!("-{e}\n")),
            (None, Some(a)) => out.push_str(&format!("+{a}\n")),
            (None, None) => {}
        }
    }
    out
}
