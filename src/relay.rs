//! Relay global identifiers
//!
//! A global ID is `base64("<TypeName>:<raw id>")`. Decoding is type-agnostic:
//! the type name travels inside the ID and is not checked against anything.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::errors::{MutationError, MutationResult};
use crate::model::{pk_to_string, FieldValues, Model};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedGlobalId {
    pub type_name: String,
    pub id: String,
}

pub fn to_global_id(type_name: &str, id: &str) -> String {
    STANDARD.encode(format!("{}:{}", type_name, id))
}

pub fn from_global_id(global_id: &str) -> MutationResult<ResolvedGlobalId> {
    let invalid = || MutationError::InvalidGlobalId(global_id.to_string());

    let bytes = STANDARD.decode(global_id).map_err(|_| invalid())?;
    let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (type_name, id) = decoded.split_once(':').ok_or_else(invalid)?;

    Ok(ResolvedGlobalId {
        type_name: type_name.to_string(),
        id: id.to_string(),
    })
}

/// Copy of `input` with its `id` replaced by the raw id it encodes.
///
/// `_model` is accepted for symmetry with the other per-model helpers; the
/// codec itself does not depend on it. Input without an `id` is returned as
/// an unchanged copy.
pub fn normalize_global_ids(_model: &dyn Model, input: &FieldValues) -> MutationResult<FieldValues> {
    let mut normalized = input.clone();
    match input.get("id") {
        None | Some(Value::Null) => {}
        Some(global_id) => {
            let resolved = from_global_id(&pk_to_string(global_id))?;
            normalized.insert("id".to_string(), Value::String(resolved.id));
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKind, MemoryModel, ModelField};
    use serde_json::json;

    #[test]
    fn encodes_type_and_id() {
        assert_eq!(to_global_id("Book", "1"), "Qm9vazox");
        assert_eq!(
            from_global_id("Qm9vazox").unwrap(),
            ResolvedGlobalId {
                type_name: "Book".to_string(),
                id: "1".to_string()
            }
        );
    }

    #[test]
    fn raw_id_may_contain_colons() {
        let global = to_global_id("Entry", "2024:07:01");
        assert_eq!(from_global_id(&global).unwrap().id, "2024:07:01");
    }

    #[test]
    fn rejects_undecodable_ids() {
        assert!(matches!(
            from_global_id("not base64!"),
            Err(MutationError::InvalidGlobalId(_))
        ));
        // valid base64, but no separator
        assert!(from_global_id(&STANDARD.encode("Book")).is_err());
    }

    #[test]
    fn normalize_leaves_input_untouched() {
        let model = MemoryModel::new("Book", vec![ModelField::auto_id(), ModelField::new("title", FieldKind::String)]);
        let input: FieldValues = [
            ("id".to_string(), json!(to_global_id("Book", "7"))),
            ("title".to_string(), json!("New")),
        ]
        .into_iter()
        .collect();

        let normalized = normalize_global_ids(&model, &input).unwrap();

        assert_eq!(input.get("id"), Some(&json!("Qm9vazo3")));
        assert_eq!(normalized.get("id"), Some(&json!("7")));
        assert_eq!(normalized.get("title"), Some(&json!("New")));
        assert_eq!(normalized.len(), input.len());
    }
}
