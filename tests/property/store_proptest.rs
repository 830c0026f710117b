//! Property-based tests for the entity store

use boardsync::client::{Card, CardField, EntityPatch, EntityStore, UpdateOrigin};
use proptest::collection::vec;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_version_never_decreases(versions in vec(0u64..50, 1..30)) {
        let mut store = EntityStore::<Card>::new();
        let mut highest = 0;

        for (i, version) in versions.into_iter().enumerate() {
            let patch = EntityPatch::new("c1")
                .set(CardField::Title, format!("t{}", i))
                .with_version(version);
            store.upsert(patch, UpdateOrigin::Broadcast);
            highest = highest.max(version);
            prop_assert_eq!(store.get("c1").map(|card| card.version), Some(highest));
        }
    }

    #[test]
    fn test_claimed_field_ignores_broadcasts(titles in vec("[a-z]{1,8}", 1..10)) {
        let mut store = EntityStore::<Card>::new();
        store.upsert(EntityPatch::new("c1").set(CardField::Title, "mine"), UpdateOrigin::Local);
        store.claim("c1", &[CardField::Title]);

        let last = titles.last().cloned();
        for title in titles {
            store.upsert(EntityPatch::new("c1").set(CardField::Title, title), UpdateOrigin::Broadcast);
        }
        prop_assert_eq!(store.get("c1").map(|card| card.title.clone()), Some("mine".to_string()));

        store.release("c1", &[CardField::Title], None);
        prop_assert_eq!(store.get("c1").map(|card| card.title.clone()), last);
    }
}
