//! Pure predicates comparing an actual value against an expectation.
//!
//! Values are compared as JSON snapshots: sequences are order-sensitive and
//! mappings compare by key set and per-key value. Matchers compose with
//! [`Matcher::all_of`], [`Matcher::any_of`], and [`Matcher::not`].

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::verification::VerificationResult;

/// Caller-supplied predicate over a value snapshot.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// An expectation that a value can be checked against.
///
/// # Examples
///
/// ```
/// use attest::Matcher;
/// use serde_json::json;
///
/// let matcher = Matcher::all_of([
///     Matcher::containing("ok"),
///     Matcher::satisfying("is short", |v| v.as_str().is_some_and(|s| s.len() < 10)),
/// ]);
/// assert!(matcher.evaluate(json!("ok then")).passed());
/// assert!(!matcher.evaluate(json!("not at all ok")).passed());
/// ```
#[derive(Clone)]
pub enum Matcher {
    /// Deep structural equality.
    Equaling(Value),
    /// Substring, element, or key/value subset containment.
    Containing(Value),
    /// A named predicate.
    Satisfying {
        /// Text used in failure messages.
        description: String,
        /// The predicate itself.
        predicate: Predicate,
    },
    /// Every inner matcher must hold.
    AllOf(Vec<Matcher>),
    /// At least one inner matcher must hold.
    AnyOf(Vec<Matcher>),
    /// The inner matcher must not hold.
    Not(Box<Matcher>),
}

impl Matcher {
    /// Matches values deeply equal to `expected`.
    #[must_use]
    pub fn equaling(expected: impl Into<Value>) -> Self {
        Self::Equaling(expected.into())
    }

    /// Matches strings containing a substring, arrays containing an element
    /// (or every element of an expected array), and objects containing every
    /// expected key with an equal value.
    #[must_use]
    pub fn containing(expected: impl Into<Value>) -> Self {
        Self::Containing(expected.into())
    }

    /// Matches values for which `predicate` returns `true`.
    #[must_use]
    pub fn satisfying(
        description: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Satisfying {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Logical AND of `matchers`. An empty set always holds.
    #[must_use]
    pub fn all_of(matchers: impl IntoIterator<Item = Self>) -> Self {
        Self::AllOf(matchers.into_iter().collect())
    }

    /// Logical OR of `matchers`. An empty set never holds.
    #[must_use]
    pub fn any_of(matchers: impl IntoIterator<Item = Self>) -> Self {
        Self::AnyOf(matchers.into_iter().collect())
    }

    /// Negation of `matcher`.
    #[must_use]
    pub fn not(matcher: Self) -> Self {
        Self::Not(Box::new(matcher))
    }

    /// JSON description of the expectation, used as the `expected` snapshot.
    #[must_use]
    pub fn describe(&self) -> Value {
        match self {
            Self::Equaling(expected) => expected.clone(),
            Self::Containing(expected) => json!({ "containing": expected }),
            Self::Satisfying { description, .. } => json!({ "satisfying": description }),
            Self::AllOf(inner) => {
                json!({ "allOf": inner.iter().map(Self::describe).collect::<Vec<_>>() })
            }
            Self::AnyOf(inner) => {
                json!({ "anyOf": inner.iter().map(Self::describe).collect::<Vec<_>>() })
            }
            Self::Not(inner) => json!({ "not": inner.describe() }),
        }
    }

    /// Checks `actual`, producing a [`VerificationResult`].
    #[must_use]
    pub fn evaluate(&self, actual: Value) -> VerificationResult {
        let expected = self.describe();
        if let Some(message) = self.mismatch(&actual) {
            return VerificationResult::failed_with(actual, expected, message);
        }
        VerificationResult::passed_with(actual, expected)
    }

    fn mismatch(&self, actual: &Value) -> Option<String> {
        match self {
            Self::Equaling(expected) => {
                if actual == expected {
                    return None;
                }
                let summary = format!("expected {actual} to equal {expected}");
                // A scalar mismatch at the root is already fully described.
                let located = first_difference(actual, expected, "$".to_owned())
                    .filter(|diff| !(diff.path == "$" && diff.detail.starts_with("expected ")));
                Some(located.map_or_else(
                    || summary.clone(),
                    |diff| format!("{summary} ({}: {})", diff.path, diff.detail),
                ))
            }
            Self::Containing(expected) => (!contains(actual, expected))
                .then(|| format!("expected {actual} to contain {expected}")),
            Self::Satisfying {
                description,
                predicate,
            } => (!predicate(actual)).then(|| format!("expected {actual} to satisfy {description}")),
            Self::AllOf(inner) => inner.iter().find_map(|matcher| matcher.mismatch(actual)),
            Self::AnyOf(inner) => {
                let mut reasons = Vec::with_capacity(inner.len());
                for matcher in inner {
                    match matcher.mismatch(actual) {
                        None => return None,
                        Some(reason) => reasons.push(reason),
                    }
                }
                if reasons.is_empty() {
                    Some(format!("expected {actual} to match at least one matcher"))
                } else {
                    Some(format!("expected any of: {}", reasons.join("; ")))
                }
            }
            Self::Not(inner) => inner
                .mismatch(actual)
                .is_none()
                .then(|| format!("expected {actual} not to match {}", inner.describe())),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.describe())
    }
}

/// Checks `actual` against `matcher`.
///
/// # Examples
///
/// ```
/// use attest::{Matcher, evaluate};
/// use serde_json::json;
///
/// assert!(evaluate(json!([1, 2, 3]), &Matcher::containing(2)).passed());
/// ```
#[must_use]
pub fn evaluate(actual: Value, matcher: &Matcher) -> VerificationResult {
    matcher.evaluate(actual)
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (Value::Array(items), Value::Array(wanted)) => {
            wanted.iter().all(|want| items.contains(want))
        }
        (Value::Array(items), want) => items.contains(want),
        (Value::Object(fields), Value::Object(wanted)) => wanted
            .iter()
            .all(|(key, want)| fields.get(key).is_some_and(|have| have == want)),
        _ => false,
    }
}

struct Difference {
    path: String,
    detail: String,
}

fn first_difference(actual: &Value, expected: &Value, path: String) -> Option<Difference> {
    match (actual, expected) {
        (Value::Object(have), Value::Object(want)) => object_difference(have, want, &path),
        (Value::Array(have), Value::Array(want)) => {
            for (index, (a, e)) in have.iter().zip(want).enumerate() {
                if let Some(diff) = first_difference(a, e, format!("{path}[{index}]")) {
                    return Some(diff);
                }
            }
            (have.len() != want.len()).then(|| Difference {
                detail: format!("length {} differs from expected {}", have.len(), want.len()),
                path,
            })
        }
        _ => (actual != expected).then(|| Difference {
            detail: format!("expected {expected}, found {actual}"),
            path,
        }),
    }
}

fn object_difference(
    have: &Map<String, Value>,
    want: &Map<String, Value>,
    path: &str,
) -> Option<Difference> {
    if let Some(key) = want.keys().find(|key| !have.contains_key(*key)) {
        return Some(Difference {
            path: path.to_owned(),
            detail: format!("missing key '{key}'"),
        });
    }
    if let Some(key) = have.keys().find(|key| !want.contains_key(*key)) {
        return Some(Difference {
            path: path.to_owned(),
            detail: format!("unexpected key '{key}'"),
        });
    }
    want.iter().find_map(|(key, e)| {
        have.get(key)
            .and_then(|a| first_difference(a, e, format!("{path}.{key}")))
    })
}
