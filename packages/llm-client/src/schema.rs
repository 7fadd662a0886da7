//! JSON schemas for strict structured generation.
//!
//! Strict mode on the OpenAI side (and the schema we paste into Anthropic
//! prompts) needs every object closed, every property required, and no
//! `$ref` indirection. `schemars` output is rewritten into that shape.

use serde_json::{Map, Value};

/// Rewrite an arbitrary root schema into strict form.
pub fn strict_schema_from(mut root: Value) -> Value {
    let definitions = match &mut root {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("definitions")
        }
        _ => None,
    };

    if let Some(Value::Object(defs)) = definitions {
        resolve_refs(&mut root, &defs, 0);
    }
    close_objects(&mut root);
    root
}

// Recursive types would loop forever; schemas we generate are shallow.
const MAX_REF_DEPTH: usize = 16;

fn resolve_refs(value: &mut Value, defs: &Map<String, Value>, depth: usize) {
    if depth > MAX_REF_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| defs.get(name))
                .cloned();

            if let Some(mut inlined) = target {
                resolve_refs(&mut inlined, defs, depth + 1);
                *value = inlined;
                return;
            }
            for child in map.values_mut() {
                resolve_refs(child, defs, depth);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_refs(v, defs, depth)),
        _ => {}
    }
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let is_object = match map.get("type") {
                Some(Value::String(t)) => t == "object",
                Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
                _ => false,
            };
            if is_object {
                let required: Vec<Value> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                map.insert("required".into(), Value::Array(required));
                map.insert("additionalProperties".into(), Value::Bool(false));
            }
            map.values_mut().for_each(close_objects);
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::{schema_for, JsonSchema};
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Citation {
        kanda: String,
        sarga: Option<u32>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Basis {
        citations: Vec<Citation>,
        note: Option<String>,
    }

    fn strict<T: JsonSchema>() -> Value {
        strict_schema_from(serde_json::to_value(schema_for!(T)).unwrap())
    }

    fn required_of(schema: &Value) -> Vec<&str> {
        schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    #[test]
    fn test_root_metadata_removed() {
        let schema = strict::<Basis>();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("$schema"));
        assert!(!obj.contains_key("definitions"));
    }

    #[test]
    fn test_optional_fields_are_required() {
        let schema = strict::<Basis>();
        let required = required_of(&schema);
        assert!(required.contains(&"citations"));
        assert!(required.contains(&"note"), "Option<T> fields must still be listed");
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn test_nested_refs_are_inlined_and_closed() {
        let schema = strict::<Basis>();
        let item = &schema["properties"]["citations"]["items"];

        assert!(item.get("$ref").is_none(), "citation item should be inlined: {item}");
        assert_eq!(item["type"], "object");
        assert_eq!(item["additionalProperties"], Value::Bool(false));
        assert_eq!(required_of(item), vec!["kanda", "sarga"]);
    }
}
