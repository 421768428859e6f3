use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use strata_types::CancelToken;

/// One GraphQL request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Option<serde_json::Map<String, Json>>,
    /// Host-side cancellation handle; not part of the wire format.
    #[serde(skip)]
    pub cancel: CancelToken,
}

impl QueryParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_operation(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: serde_json::Map<String, Json>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One GraphQL response: `{data?, errors?}`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct QueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl QueryResponse {
    /// Returns `true` when the request produced data and no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.data.is_some()
    }
}

/// A source position in the request query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// One entry in the response `errors` array.
#[derive(Clone, Debug, Serialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Json>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn at_field(message: impl Into<String>, field: &str, location: Location) -> Self {
        Self {
            message: message.into(),
            path: vec![Json::String(field.to_string())],
            locations: vec![location],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_deserialize_from_wire_shape() {
        let params: QueryParams = serde_json::from_value(json!({
            "query": "{ listUser { id } }",
            "operationName": "Q",
            "variables": {"x": 1}
        }))
        .unwrap();
        assert_eq!(params.operation_name.as_deref(), Some("Q"));
        assert_eq!(params.variables.unwrap()["x"], json!(1));
        assert!(!params.cancel.is_cancelled());
    }

    #[test]
    fn params_tolerate_missing_optionals() {
        let params: QueryParams =
            serde_json::from_value(json!({"query": "{ __typename }"})).unwrap();
        assert!(params.operation_name.is_none());
        assert!(params.variables.is_none());
    }

    #[test]
    fn response_omits_empty_members() {
        let response = QueryResponse {
            data: Some(json!({"x": 1})),
            errors: vec![],
        };
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire, json!({"data": {"x": 1}}));
    }

    #[test]
    fn error_serializes_path_and_location() {
        let response = QueryResponse {
            data: None,
            errors: vec![GraphQLError::at_field(
                "boom",
                "listUser",
                Location { line: 1, column: 3 },
            )],
        };
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({"errors": [{
                "message": "boom",
                "path": ["listUser"],
                "locations": [{"line": 1, "column": 3}]
            }]})
        );
    }
}
