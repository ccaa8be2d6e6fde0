use fauxtree_core::GraphSnapshot;
use schemars::schema_for;

#[test]
fn json_schema_describes_every_record_kind() {
    let generated = schema_for!(GraphSnapshot);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    let definitions = json
        .get("definitions")
        .and_then(|value| value.as_object())
        .expect("definitions object");
    for name in ["Person", "Family", "Event", "Place", "Media", "Note", "Date"] {
        assert!(definitions.contains_key(name), "missing definition {name}");
    }

    let required = json
        .get("required")
        .and_then(|value| value.as_array())
        .expect("required array");
    assert!(required.contains(&serde_json::Value::String("people".to_string())));
}
