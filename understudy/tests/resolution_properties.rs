//! Property tests for setup registration and resolution.

use proptest::prelude::*;

use understudy::{
    CallSignature, MatchEngine, Matcher, Resolution, SetupId, SetupRegistry, Value, ValueKind,
};

fn lookup() -> CallSignature {
    CallSignature::new("Lookup", vec![ValueKind::Int], ValueKind::Int)
}

/// Matchers over small integers, so collisions between setups are common.
fn arb_matcher() -> impl Strategy<Value = Matcher> {
    prop_oneof![
        Just(Matcher::any()),
        (0i64..6).prop_map(|k| Matcher::equal(k)),
        (0i64..6, 0i64..6).prop_map(|(a, b)| Matcher::range(a.min(b), a.max(b))),
        prop::collection::vec(0i64..6, 0..4).prop_map(|ks| Matcher::one_of(ks)),
    ]
}

fn build(matchers: &[Matcher]) -> (SetupRegistry, Vec<SetupId>) {
    let mut registry = SetupRegistry::new();
    let ids = matchers
        .iter()
        .map(|m| registry.register(lookup(), vec![m.clone()]).unwrap())
        .collect();
    (registry, ids)
}

/// Reference answer: the last registered, non-overridden setup that matches.
fn expected(registry: &SetupRegistry, arg: &Value) -> Option<SetupId> {
    registry
        .entries()
        .iter()
        .filter(|s| !s.is_overridden())
        .filter(|s| s.matchers()[0].matches(arg).unwrap())
        .map(|s| s.id())
        .max()
}

proptest! {
    #[test]
    fn resolves_to_newest_matching_setup(
        matchers in prop::collection::vec(arb_matcher(), 0..12),
        arg in 0i64..8,
    ) {
        let (registry, _) = build(&matchers);
        let arg = Value::from(arg);
        let engine = MatchEngine::new(&registry);

        let resolved = engine.resolve_call(&lookup(), &[arg.clone()]).unwrap().setup();
        prop_assert_eq!(resolved, expected(&registry, &arg));
    }

    #[test]
    fn resolution_is_idempotent(
        matchers in prop::collection::vec(arb_matcher(), 0..12),
        arg in 0i64..8,
    ) {
        let (registry, _) = build(&matchers);
        let engine = MatchEngine::new(&registry);
        let args = [Value::from(arg)];

        let first = engine.resolve_call(&lookup(), &args).unwrap();
        for _ in 0..3 {
            prop_assert_eq!(&engine.resolve_call(&lookup(), &args).unwrap(), &first);
        }
    }

    #[test]
    fn only_newest_of_each_shape_stays_active(
        matchers in prop::collection::vec(arb_matcher(), 0..12),
    ) {
        let (registry, ids) = build(&matchers);

        for (i, id) in ids.iter().enumerate() {
            let later_identical = matchers[i + 1..].iter().any(|m| *m == matchers[i]);
            let setup = registry.get(*id).unwrap();
            prop_assert_eq!(setup.is_overridden(), later_identical);
        }
    }

    #[test]
    fn unique_match_is_found(
        keys in prop::collection::btree_set(0i64..100, 1..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let matchers: Vec<_> = keys.iter().map(|&k| Matcher::equal(k)).collect();
        let (registry, ids) = build(&matchers);

        let chosen = pick.index(keys.len());
        let engine = MatchEngine::new(&registry);
        let result = engine.resolve_call(&lookup(), &[Value::from(keys[chosen])]).unwrap();
        prop_assert_eq!(result, Resolution::Resolved(ids[chosen]));
    }
}
