//! Property-based generators using proptest.

use proptest::prelude::*;
use replica_model::{EntitySchema, FieldKind, FieldValue, Record, RecordId};

/// Strategy for record IDs.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    proptest::string::string_regex("[a-z0-9]{8}")
        .expect("valid regex")
        .prop_map(RecordId::new)
}

/// Strategy for values of one declared kind.
pub fn field_value_strategy(kind: FieldKind) -> BoxedStrategy<FieldValue> {
    match kind {
        FieldKind::Bool => any::<bool>().prop_map(FieldValue::Bool).boxed(),
        FieldKind::Int => any::<i64>().prop_map(FieldValue::Int).boxed(),
        FieldKind::Double => (-1.0e9f64..1.0e9).prop_map(FieldValue::Double).boxed(),
        FieldKind::Text => proptest::string::string_regex("[ -~]{0,32}")
            .expect("valid regex")
            .prop_map(FieldValue::Text)
            .boxed(),
        FieldKind::Bytes => proptest::collection::vec(any::<u8>(), 0..64)
            .prop_map(FieldValue::Bytes)
            .boxed(),
    }
}

/// Strategy for records valid under `schema`, with a random subset of
/// fields populated.
pub fn record_strategy(schema: &EntitySchema) -> BoxedStrategy<Record> {
    let fields: Vec<(String, FieldKind)> = schema
        .fields()
        .iter()
        .map(|def| (def.name.clone(), def.kind))
        .collect();

    let field_strategies: Vec<_> = fields
        .into_iter()
        .map(|(name, kind)| {
            (
                Just(name),
                proptest::option::of(field_value_strategy(kind)),
            )
        })
        .collect();

    (record_id_strategy(), field_strategies)
        .prop_map(|(id, fields)| {
            let mut record = Record::with_id(id);
            for (name, value) in fields {
                if let Some(value) = value {
                    record.put(name, value);
                }
            }
            record
        })
        .boxed()
}
