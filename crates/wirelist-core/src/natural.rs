//! # Natural Name Ordering
//!
//! Connector and designator names are free text, but most of them are
//! plain integers ("1", "12", "J3" is the exception). Reports and
//! renumbering order names numerically where they parse as integers and
//! lexically otherwise, numeric names first.

use std::cmp::Ordering;

/// Integer value of a name, when the whole name parses as one.
#[must_use]
pub fn numeric_value(name: &str) -> Option<i64> {
    name.parse().ok()
}

/// Sort key of a single name: numeric names by value, then the rest
/// lexically. Equal numeric values fall back to the text ("01" vs "1").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameKey<'a> {
    number: Option<i64>,
    text: &'a str,
}

impl<'a> NameKey<'a> {
    /// Build the key of `name`.
    #[must_use]
    pub fn of(name: &'a str) -> Self {
        Self {
            number: numeric_value(name),
            text: name,
        }
    }
}

impl Ord for NameKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_number = match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_number.then_with(|| self.text.cmp(other.text))
    }
}

impl PartialOrd for NameKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two optional values with `None` after every `Some`.
pub(crate) fn none_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_names_sort_by_value() {
        let mut names = vec!["10", "2", "J1", "1", "A"];
        names.sort_by_key(|n| NameKey::of(n));
        assert_eq!(names, ["1", "2", "10", "A", "J1"]);
    }

    #[test]
    fn leading_zero_ties_break_lexically() {
        assert!(NameKey::of("01") < NameKey::of("1"));
        assert_eq!(numeric_value("01"), Some(1));
    }

    #[test]
    fn partial_numbers_are_not_numeric() {
        assert_eq!(numeric_value("12A"), None);
        assert_eq!(numeric_value("-3"), Some(-3));
    }

    #[test]
    fn none_sorts_last() {
        assert_eq!(none_last(&Some(5), &None), Ordering::Less);
        assert_eq!(none_last::<i64>(&None, &None), Ordering::Equal);
    }
}
