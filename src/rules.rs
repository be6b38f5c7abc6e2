//! Ordered rule tables
//!
//! A rule is a named `(predicate, message builder)` pair over some context
//! type, or a single function that yields the message when the rule holds.
//! A table is evaluated top to bottom and the first matching rule produces
//! the message. No match is a normal outcome.

enum Check<C> {
    Gated {
        predicate: fn(&C) -> bool,
        message: fn(&C) -> String,
    },
    Derived(fn(&C) -> Option<String>),
}

/// A single named rule over context `C`
pub struct Rule<C> {
    pub name: &'static str,
    check: Check<C>,
}

impl<C> Rule<C> {
    pub const fn new(name: &'static str, predicate: fn(&C) -> bool, message: fn(&C) -> String) -> Self {
        Rule {
            name,
            check: Check::Gated { predicate, message },
        }
    }

    /// Rule whose message only exists when it matches
    pub const fn derived(name: &'static str, message: fn(&C) -> Option<String>) -> Self {
        Rule {
            name,
            check: Check::Derived(message),
        }
    }

    /// Message of this rule if it matches
    pub fn apply(&self, context: &C) -> Option<String> {
        match &self.check {
            Check::Gated { predicate, message } => predicate(context).then(|| message(context)),
            Check::Derived(message) => message(context),
        }
    }
}

/// Result of a first-match evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub message: String,
}

/// Evaluate `rules` in order and return the first match
pub fn first_match<C>(rules: &[Rule<C>], context: &C) -> Option<RuleMatch> {
    for rule in rules {
        if let Some(message) = rule.apply(context) {
            tracing::debug!(rule = rule.name, "Rule matched");
            return Some(RuleMatch {
                rule: rule.name,
                message,
            });
        }
    }
    tracing::debug!(rules = rules.len(), "No rule matched");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Rule<i32>> {
        vec![
            Rule::new("negative", |n: &i32| *n < 0, |n: &i32| format!("{} is negative", n)),
            Rule::new("big", |n: &i32| *n > 100, |_: &i32| "big".to_string()),
            Rule::new("even", |n: &i32| n % 2 == 0, |n: &i32| format!("{} is even", n)),
        ]
    }

    #[test]
    fn test_first_match_wins() {
        let hit = first_match(&table(), &-4).unwrap();
        assert_eq!(hit.rule, "negative");
        assert_eq!(hit.message, "-4 is negative");

        let hit = first_match(&table(), &102).unwrap();
        assert_eq!(hit.rule, "big");
    }

    #[test]
    fn test_derived_rule() {
        let rules = [
            Rule::derived("halves", |n: &i32| (n % 2 == 0).then(|| format!("half is {}", n / 2))),
            Rule::new("odd", |_: &i32| true, |n: &i32| format!("{} is odd", n)),
        ];
        assert_eq!(first_match(&rules, &10).unwrap().message, "half is 5");
        assert_eq!(first_match(&rules, &3).unwrap().rule, "odd");
    }

    #[test]
    fn test_no_match_is_silence() {
        assert!(first_match(&table(), &7).is_none());
        assert!(first_match::<i32>(&[], &7).is_none());
    }
}
