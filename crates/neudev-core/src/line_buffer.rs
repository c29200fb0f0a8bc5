//! Reassembly of output lines from arbitrarily split fragments.
//!
//! The backend streams raw text with no alignment to line boundaries. A
//! fragment may end mid-line, carry several newlines, or be empty. [`feed`]
//! folds one fragment into the caller's pending tail and returns the lines
//! that became complete.
//!
//! Appending `'\n'` to every completed line and then the final pending tail
//! reproduces the received text exactly.

/// Result of folding one fragment into the pending tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    /// Lines whose terminating newline has now been observed, in order.
    pub completed: Vec<String>,
    /// Text after the last newline, awaiting more data or termination.
    pub pending: String,
}

/// Fold `fragment` into `pending` and split out completed lines.
pub fn feed(pending: &str, fragment: &str) -> Feed {
    let mut buffer = String::with_capacity(pending.len() + fragment.len());
    buffer.push_str(pending);
    buffer.push_str(fragment);

    let mut pieces: Vec<&str> = buffer.split('\n').collect();
    let last = pieces.pop().unwrap_or_default();
    let mut completed: Vec<String> = pieces.into_iter().map(str::to_owned).collect();

    if fragment.ends_with('\n') {
        if !last.is_empty() {
            completed.push(last.to_owned());
        }
        Feed {
            completed,
            pending: String::new(),
        }
    } else {
        Feed {
            completed,
            pending: last.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed_all(fragments: &[&str]) -> (Vec<String>, String) {
        let mut lines = Vec::new();
        let mut pending = String::new();
        for fragment in fragments {
            let fed = feed(&pending, fragment);
            lines.extend(fed.completed);
            pending = fed.pending;
        }
        (lines, pending)
    }

    fn reconstruct(lines: &[String], pending: &str) -> String {
        let mut out = String::new();
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(pending);
        out
    }

    #[test]
    fn test_partial_fragment_stays_pending() {
        let fed = feed("", "Hello, ");
        assert!(fed.completed.is_empty());
        assert_eq!(fed.pending, "Hello, ");
    }

    #[test]
    fn test_pending_completed_by_next_fragment() {
        let fed = feed("Hello, ", "World\n");
        assert_eq!(fed.completed, vec!["Hello, World"]);
        assert_eq!(fed.pending, "");
    }

    #[test]
    fn test_embedded_newlines() {
        let fed = feed("", "one\ntwo\nthr");
        assert_eq!(fed.completed, vec!["one", "two"]);
        assert_eq!(fed.pending, "thr");
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let fed = feed("", "a\n\nb\n");
        assert_eq!(fed.completed, vec!["a", "", "b"]);
        assert_eq!(fed.pending, "");
    }

    #[test]
    fn test_empty_fragment_is_noop() {
        let fed = feed("tail", "");
        assert!(fed.completed.is_empty());
        assert_eq!(fed.pending, "tail");
    }

    #[test]
    fn test_lone_newline_flushes_pending() {
        let fed = feed("Enter a number: ", "\n");
        assert_eq!(fed.completed, vec!["Enter a number: "]);
        assert_eq!(fed.pending, "");
    }

    #[test]
    fn test_split_invariance_example() {
        let whole = feed_all(&["AB\n"]);
        let split = feed_all(&["A", "B\n", ""]);
        assert_eq!(whole, split);
        assert_eq!(whole.0, vec!["AB"]);
    }

    proptest! {
        #[test]
        fn prop_reconstruction_is_lossless(fragments in prop::collection::vec("[ab\\n ]{0,6}", 0..12)) {
            let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
            let (lines, pending) = feed_all(&refs);
            prop_assert_eq!(reconstruct(&lines, &pending), fragments.concat());
        }

        #[test]
        fn prop_split_invariance(fragments in prop::collection::vec("[ab\\n]{0,6}", 0..12)) {
            let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
            let joined = fragments.concat();
            prop_assert_eq!(feed_all(&refs), feed_all(&[joined.as_str()]));
        }

        #[test]
        fn prop_pending_never_contains_newline(pending in "[ab]{0,4}", fragment in "[ab\\n]{0,8}") {
            let fed = feed(&pending, &fragment);
            prop_assert!(!fed.pending.contains('\n'));
        }
    }
}
