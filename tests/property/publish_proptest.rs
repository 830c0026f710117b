//! Property-based tests for outbound payload projection

use boardsync::shared::{PublishModel, Topic};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn to_map(entries: std::collections::BTreeMap<String, i64>) -> Map<String, Value> {
    entries.into_iter().map(|(key, value)| (key, Value::from(value))).collect()
}

proptest! {
    #[test]
    fn test_payload_keys_come_from_allow_list_or_custom_data(
        data in btree_map("[a-e]{1,2}", any::<i64>(), 0..8),
        allowed in vec("[a-e]{1,2}", 0..5),
        custom in btree_map("[c-g]{1,2}", any::<i64>(), 0..4),
    ) {
        let data = to_map(data);
        let custom = to_map(custom);
        let model = PublishModel::new(Topic::BoardCard, "c1", "board:card:details-changed:c1")
            .data_keys(allowed.clone())
            .custom_data(custom.clone());

        let payload = model.outbound_payload(&data);

        for key in payload.keys() {
            prop_assert!(allowed.contains(key) || custom.contains_key(key));
        }
        for (key, value) in &custom {
            prop_assert_eq!(payload.get(key), Some(value));
        }
        for key in &allowed {
            if !custom.contains_key(key) {
                prop_assert_eq!(payload.get(key), data.get(key));
            }
        }
    }

    #[test]
    fn test_no_allow_list_means_only_custom_data(
        data in btree_map("[a-e]{1,3}", any::<i64>(), 0..8),
    ) {
        let model = PublishModel::new(Topic::Board, "b1", "board:updated");
        prop_assert!(model.outbound_payload(&to_map(data)).is_empty());
    }
}
