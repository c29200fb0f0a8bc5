//! Test-case synthesis from a finished transcript.

use neudev_types::{TestCase, TranscriptLine};

/// Join the output-bearing lines of a transcript and trim the result.
///
/// The termination marker is excluded.
pub fn expected_output(lines: &[TranscriptLine]) -> String {
    let joined = lines
        .iter()
        .filter(|line| line.is_output())
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    joined.trim().to_string()
}

/// Build a test case from a clean run's output.
///
/// Returns `None` when there is nothing to expect. Identical output from two
/// runs yields two independent test cases.
pub fn synthesize(output: &str) -> Option<TestCase> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(TestCase::new(trimmed))
    }
}
