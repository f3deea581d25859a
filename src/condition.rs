//! Condition evaluation against event properties.

use crate::event::Event;
use crate::rules::{Condition, Operator};

impl Operator {
    /// Apply the operator with the event value on the left.
    ///
    /// Numeric operators parse both sides as `f64`; if either side does
    /// not parse the test is simply false.
    pub fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            Operator::Equals => actual == expected,
            Operator::Contains => actual.contains(expected),
            Operator::StartsWith => actual.starts_with(expected),
            Operator::EndsWith => actual.ends_with(expected),
            Operator::Greater => compare(actual, expected, |a, b| a > b),
            Operator::Less => compare(actual, expected, |a, b| a < b),
        }
    }
}

fn compare(actual: &str, expected: &str, op: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => op(a, b),
        _ => false,
    }
}

impl Condition {
    /// A condition on a property the event does not carry is false.
    pub fn matches(&self, event: &Event) -> bool {
        event
            .property(&self.property)
            .is_some_and(|actual| self.operator.test(actual, &self.value))
    }
}

/// True if every condition holds, in order, stopping at the first failure.
/// An empty list always matches.
pub fn matches(conditions: &[Condition], event: &Event) -> bool {
    conditions.iter().all(|c| c.matches(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(property: &str, operator: Operator, value: &str) -> Condition {
        Condition {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    fn open(class: &str) -> Event {
        Event::parse(&format!("openwindow>>0x1,3,{},Title", class)).unwrap()
    }

    #[test]
    fn empty_list_matches() {
        assert!(matches(&[], &open("anything")));
    }

    #[test]
    fn equals_is_case_sensitive() {
        let c = [cond("class", Operator::Equals, "spotify")];
        assert!(matches(&c, &open("spotify")));
        assert!(!matches(&c, &open("Spotify")));
        assert!(!matches(&c, &open("spotify-beta")));
    }

    #[test]
    fn string_operators() {
        assert!(Operator::Contains.test("Mozilla Firefox", "Fire"));
        assert!(!Operator::Contains.test("Mozilla Firefox", "chrome"));
        assert!(Operator::StartsWith.test("org.gnome.Nautilus", "org.gnome"));
        assert!(!Operator::StartsWith.test("org.gnome.Nautilus", "gnome"));
        assert!(Operator::EndsWith.test("kitty.desktop", ".desktop"));
        assert!(!Operator::EndsWith.test("kitty.desktop", "kitty"));
    }

    #[test]
    fn numeric_operators() {
        assert!(Operator::Greater.test("10", "9"));
        assert!(!Operator::Greater.test("9", "10"));
        assert!(!Operator::Greater.test("5", "5"));
        assert!(Operator::Less.test("2.5", "3"));
        assert!(Operator::Less.test("-1", "0"));
        assert!(!Operator::Less.test("3", "3"));
    }

    #[test]
    fn numeric_parse_failure_is_false() {
        assert!(!Operator::Greater.test("abc", "1"));
        assert!(!Operator::Less.test("1", "abc"));
        assert!(!Operator::Less.test("", "1"));
    }

    #[test]
    fn numeric_compare_on_workspace_id() {
        let ev = Event::parse("workspacev2>>dev,7").unwrap();
        assert!(matches(&[cond("id", Operator::Greater, "5")], &ev));
        assert!(!matches(&[cond("id", Operator::Less, "5")], &ev));
        assert!(!matches(&[cond("name", Operator::Greater, "5")], &ev));
    }

    #[test]
    fn absent_property_fails() {
        let ev = Event::parse("workspace>>Code").unwrap();
        assert!(!matches(&[cond("class", Operator::Equals, "Code")], &ev));
    }

    #[test]
    fn all_conditions_must_hold() {
        let ev = Event::parse("openwindow>>0x2,1,firefox,Mozilla Firefox").unwrap();
        let ok = [
            cond("class", Operator::Equals, "firefox"),
            cond("title", Operator::Contains, "Mozilla"),
        ];
        let bad = [
            cond("class", Operator::Equals, "firefox"),
            cond("workspace", Operator::Equals, "2"),
        ];
        assert!(matches(&ok, &ev));
        assert!(!matches(&bad, &ev));
    }
}
