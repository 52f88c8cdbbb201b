use proptest::prelude::*;
use pushgate_registry::{NoopObserver, TokenRegistry};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Upsert { user: u8, token: u8, platform: Option<u8> },
    Remove { user: u8, token: u8 },
    Replace { user: u8, old: Option<u8>, token: u8 },
}

fn user_id(n: u8) -> String {
    format!("user-{n}")
}

fn token_id(n: u8) -> String {
    format!("token-{n}")
}

fn platform(n: u8) -> &'static str {
    ["android", "ios", "web"][usize::from(n % 3)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4u8, 0..8u8, proptest::option::of(0..3u8))
            .prop_map(|(user, token, platform)| Op::Upsert { user, token, platform }),
        (0..4u8, 0..8u8).prop_map(|(user, token)| Op::Remove { user, token }),
        (0..4u8, proptest::option::of(0..8u8), 0..8u8)
            .prop_map(|(user, old, token)| Op::Replace { user, old, token }),
    ]
}

fn apply(registry: &TokenRegistry, op: &Op) {
    match op {
        Op::Upsert { user, token, platform: p } => {
            registry.upsert(&user_id(*user), &token_id(*token), p.map(platform))
        }
        Op::Remove { user, token } => registry.remove(&user_id(*user), &token_id(*token)),
        Op::Replace { user, old, token } => registry.replace(
            &user_id(*user),
            old.map(token_id).as_deref(),
            &token_id(*token),
            None,
        ),
    }
}

proptest! {
    // Any sequence of operations leaves the two indexes in lock-step.
    #[test]
    fn test_indexes_stay_consistent(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let registry = TokenRegistry::with_observer("unknown", Arc::new(NoopObserver));
        for op in &ops {
            apply(&registry, op);
            prop_assert!(registry.is_consistent());
        }
    }

    // Repeating an upsert with identical arguments changes nothing but the timestamp.
    #[test]
    fn test_upsert_is_idempotent(user in 0..4u8, token in 0..8u8, p in proptest::option::of(0..3u8)) {
        let registry = TokenRegistry::with_observer("unknown", Arc::new(NoopObserver));
        let (user, token) = (user_id(user), token_id(token));

        registry.upsert(&user, &token, p.map(platform));
        let tokens_before = registry.tokens_of(&user);
        let before = registry.metadata_of(&token).unwrap();

        registry.upsert(&user, &token, p.map(platform));
        let after = registry.metadata_of(&token).unwrap();

        prop_assert_eq!(registry.tokens_of(&user), tokens_before);
        prop_assert_eq!(&after.user_id, &before.user_id);
        prop_assert_eq!(&after.platform, &before.platform);
        prop_assert!(after.updated_at >= before.updated_at);
    }

    // Upsert followed by remove leaves no trace of the token.
    #[test]
    fn test_remove_is_symmetric(user in 0..4u8, token in 0..8u8) {
        let registry = TokenRegistry::with_observer("unknown", Arc::new(NoopObserver));
        let (user, token) = (user_id(user), token_id(token));

        registry.upsert(&user, &token, None);
        registry.remove(&user, &token);

        prop_assert!(!registry.tokens_of(&user).contains(&token));
        prop_assert!(registry.metadata_of(&token).is_none());
        prop_assert!(!registry.contains_user(&user));
    }

    // The last upsert of a token decides its owner.
    #[test]
    fn test_last_upsert_owns_token(first in 0..4u8, second in 0..4u8, token in 0..8u8) {
        let registry = TokenRegistry::with_observer("unknown", Arc::new(NoopObserver));
        let token = token_id(token);

        registry.upsert(&user_id(first), &token, Some("android"));
        registry.upsert(&user_id(second), &token, Some("android"));

        prop_assert_eq!(registry.metadata_of(&token).unwrap().user_id, user_id(second));
        if first != second {
            prop_assert!(!registry.tokens_of(&user_id(first)).contains(&token));
        }
    }
}

#[test]
fn test_concurrent_mutations_keep_indexes_consistent() {
    let registry = Arc::new(TokenRegistry::with_observer("unknown", Arc::new(NoopObserver)));

    let handles: Vec<_> = (0..8u8)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for round in 0..500u16 {
                    let user = user_id(worker % 3);
                    let token = token_id((round % 16) as u8);
                    match round % 3 {
                        0 => registry.upsert(&user, &token, Some("ios")),
                        1 => registry.remove(&user, &token),
                        _ => registry.replace(&user, Some(&token), &token_id(worker), None),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert!(registry.is_consistent());
}
