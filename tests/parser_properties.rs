use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::test_runner::Config;
use securitytxt_scanner::core::models::Violation;
use securitytxt_scanner::core::scanner::parser::parse;
use securitytxt_scanner::core::scanner::validator::{OrganizationPolicy, PolicyRule, Validator};

const FIELD_NAME: &str = "[A-Za-z][A-Za-z0-9-]{0,15}";

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn one_field_per_non_blank_line(
        fields in prop::collection::btree_map(FIELD_NAME, "[A-Za-z0-9@./:-][ -~]{0,30}", 0..12),
        blank_every in 1_usize..4
    ) {
        let mut body = String::new();
        for (i, (name, value)) in fields.iter().enumerate() {
            if i % blank_every == 0 {
                body.push('\n');
            }
            body.push_str(&format!("{name}: {value}\n"));
        }

        let document = parse(&body);
        prop_assert_eq!(document.len(), fields.len());
        for (name, value) in &fields {
            prop_assert_eq!(document.get(name), Some(value.as_str()));
        }
    }

    #[test]
    fn last_occurrence_wins(
        name in FIELD_NAME,
        values in prop::collection::vec("[A-Za-z0-9@./:-]{1,20}", 1..6)
    ) {
        let body: String = values.iter().map(|v| format!("{name}: {v}\n")).collect();
        let document = parse(&body);
        prop_assert_eq!(document.len(), 1);
        prop_assert_eq!(document.get(&name), values.last().map(String::as_str));
    }

    #[test]
    fn only_the_first_colon_separates(
        name in FIELD_NAME,
        parts in prop::collection::vec("[A-Za-z0-9./]{1,8}", 1..5)
    ) {
        let value = parts.join(":");
        let document = parse(&format!("{name}: {value}"));
        prop_assert_eq!(document.get(&name), Some(value.as_str()));
    }

    #[test]
    fn losing_any_required_substring_is_rejected(
        rules in prop::collection::btree_map(FIELD_NAME, "[a-z]{4,10}", 1..6),
        pick in any::<prop::sample::Index>()
    ) {
        let policy = OrganizationPolicy::new(
            rules.iter().map(|(field, contains)| PolicyRule::new(field, contains)).collect(),
        );
        let line = |field: &str, contains: &str| format!("{field}: mailto:{contains}@example.com\n");

        let body: String = rules.iter().map(|(f, c)| line(f, c)).collect();
        prop_assert!(policy.validate(&parse(&body)));

        let fields: Vec<&String> = rules.keys().collect();
        let broken = fields[pick.index(fields.len())];
        let body: String = rules
            .iter()
            .map(|(f, c)| if f == broken { format!("{f}: 0000\n") } else { line(f, c) })
            .collect();

        let violations = policy.violations(&parse(&body));
        prop_assert!(!policy.validate(&parse(&body)));
        prop_assert_eq!(violations.len(), 1);
        let is_broken_field = matches!(&violations[0], Violation::UnexpectedValue { field, .. } if field == broken);
        prop_assert!(is_broken_field);
    }
}
