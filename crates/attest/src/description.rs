//! Test descriptions and the external test-case identifiers embedded in them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static TEST_ID: LazyLock<Regex> = LazyLock::new(compile_test_id_pattern);

#[expect(
    clippy::expect_used,
    reason = "the pattern is a compile-time constant covered by unit tests"
)]
fn compile_test_id_pattern() -> Regex {
    Regex::new(r"\[([A-Za-z0-9][A-Za-z0-9_.:\-]*)\]").expect("test-id pattern must compile")
}

/// A free-form test description plus the ids parsed out of it.
///
/// Ids are bracketed identifiers such as `[C1234]`. They are kept in order
/// of first appearance with duplicates collapsed. A description without ids
/// describes an untracked test.
///
/// # Examples
///
/// ```
/// use attest::TestDescription;
///
/// let description = TestDescription::parse("[C2345][C3344] demo [C2345]");
/// assert_eq!(description.test_ids(), ["C2345", "C3344"]);
/// assert!(!description.is_untracked());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestDescription {
    text: String,
    test_ids: Vec<String>,
}

impl TestDescription {
    /// Parses a description, extracting its test ids.
    #[must_use]
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut test_ids: Vec<String> = Vec::new();
        for capture in TEST_ID.captures_iter(&text) {
            let Some(id) = capture.get(1) else { continue };
            if !test_ids.iter().any(|known| known == id.as_str()) {
                test_ids.push(id.as_str().to_owned());
            }
        }
        Self { text, test_ids }
    }

    /// Returns the original description text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the unique ids in order of first appearance.
    #[must_use]
    pub fn test_ids(&self) -> &[String] {
        &self.test_ids
    }

    /// Returns `true` when the description carries no ids.
    #[must_use]
    pub fn is_untracked(&self) -> bool {
        self.test_ids.is_empty()
    }

    /// Returns `true` when `id` was parsed from this description.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.test_ids.iter().any(|known| known == id)
    }
}

impl fmt::Display for TestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for TestDescription {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for TestDescription {
    fn from(text: String) -> Self {
        Self::parse(text)
    }
}
