//! Property-based tests for event name templates

use boardsync::shared::{event_params, format_event_name, EventParams};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_text_without_braces_is_unchanged(text in "[^{}]*") {
        prop_assert_eq!(format_event_name(&text, &EventParams::new()), text);
    }

    #[test]
    fn test_known_placeholder_is_substituted(
        prefix in "[a-z:-]{0,20}",
        key in "[a-z_][a-z0-9_]{0,10}",
        value in "[a-zA-Z0-9-]{0,16}",
    ) {
        let template = format!("{}{{{}}}", prefix, key);
        let name = format_event_name(&template, &event_params([(key.as_str(), value.as_str())]));
        prop_assert_eq!(name, format!("{}{}", prefix, value));
    }

    #[test]
    fn test_missing_placeholder_is_left_verbatim(
        prefix in "[a-z:-]{0,20}",
        key in "[a-z_][a-z0-9_]{0,10}",
        other in "[A-Z]{1,5}",
    ) {
        let template = format!("{}{{{}}}", prefix, key);
        let name = format_event_name(&template, &event_params([(other.as_str(), "x")]));
        prop_assert_eq!(name, template);
    }

    #[test]
    fn test_same_inputs_resolve_identically(
        uid in "[a-z0-9]{1,12}",
        column in "[a-z0-9]{1,12}",
    ) {
        let params = event_params([("uid", uid.as_str()), ("column_uid", column.as_str())]);
        let template = "board:card:moved:{column_uid}:{uid}";
        prop_assert_eq!(format_event_name(template, &params), format_event_name(template, &params.clone()));
        prop_assert_eq!(format_event_name(template, &params), format!("board:card:moved:{}:{}", column, uid));
    }
}
