//! Conversion of parsed GraphQL values into JSON, with variable
//! substitution. Enum literals become their name as a string; the schema
//! catalog interprets them downstream.

use graphql_parser::query::Value as GqlValue;
use serde_json::{Map, Value as Json};

use crate::error::{QueryError, QueryResult};

/// Resolve one parsed value against the request variables.
pub fn resolve_value(
    value: &GqlValue<'_, String>,
    variables: &Map<String, Json>,
) -> QueryResult<Json> {
    match value {
        GqlValue::Variable(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UndefinedVariable(name.clone())),
        GqlValue::Int(n) => n
            .as_i64()
            .map(Json::from)
            .ok_or_else(|| QueryError::Parse("integer out of range".to_string())),
        GqlValue::Float(f) => Ok(serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null)),
        GqlValue::String(s) => Ok(Json::String(s.clone())),
        GqlValue::Boolean(b) => Ok(Json::Bool(*b)),
        GqlValue::Null => Ok(Json::Null),
        GqlValue::Enum(name) => Ok(Json::String(name.clone())),
        GqlValue::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(item, variables)?);
            }
            Ok(Json::Array(out))
        }
        GqlValue::Object(fields) => {
            let mut out = Map::new();
            for (key, item) in fields {
                out.insert(key.clone(), resolve_value(item, variables)?);
            }
            Ok(Json::Object(out))
        }
    }
}

/// Resolve a field's argument list into a JSON map.
pub fn resolve_arguments(
    arguments: &[(String, GqlValue<'_, String>)],
    variables: &Map<String, Json>,
) -> QueryResult<Map<String, Json>> {
    let mut out = Map::new();
    for (name, value) in arguments {
        out.insert(name.clone(), resolve_value(value, variables)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::parse_query;
    use graphql_parser::query::{Definition, OperationDefinition, Selection};
    use serde_json::json;

    fn first_field_args(query: &str) -> Vec<(String, GqlValue<'static, String>)> {
        let doc = parse_query::<String>(query).unwrap().into_static();
        let Definition::Operation(OperationDefinition::SelectionSet(ss)) =
            doc.definitions.into_iter().next().unwrap()
        else {
            panic!("expected bare selection set");
        };
        let Selection::Field(field) = ss.items.into_iter().next().unwrap() else {
            panic!("expected field");
        };
        field.arguments
    }

    #[test]
    fn literals_resolve() {
        let args = first_field_args(
            r#"{ f(a: 1, b: 2.5, c: "s", d: true, e: null, g: ADMIN, h: [1, 2], i: {x: 1}) }"#,
        );
        let vars = Map::new();
        let resolved = resolve_arguments(&args, &vars).unwrap();
        assert_eq!(resolved["a"], json!(1));
        assert_eq!(resolved["b"], json!(2.5));
        assert_eq!(resolved["c"], json!("s"));
        assert_eq!(resolved["d"], json!(true));
        assert_eq!(resolved["e"], json!(null));
        assert_eq!(resolved["g"], json!("ADMIN"));
        assert_eq!(resolved["h"], json!([1, 2]));
        assert_eq!(resolved["i"], json!({"x": 1}));
    }

    #[test]
    fn variables_substitute() {
        let args = first_field_args("{ f(a: $x) }");
        let mut vars = Map::new();
        vars.insert("x".to_string(), json!({"nested": [1]}));
        let resolved = resolve_arguments(&args, &vars).unwrap();
        assert_eq!(resolved["a"], json!({"nested": [1]}));
    }

    #[test]
    fn missing_variable_is_an_error() {
        let args = first_field_args("{ f(a: $missing) }");
        let err = resolve_arguments(&args, &Map::new()).unwrap_err();
        assert!(matches!(err, QueryError::UndefinedVariable(_)));
    }
}
