//! Boolean algebra of comparison and list-quantifier operators over
//! documents and their relations.
//!
//! Filters arrive as JSON input objects shaped by the generated
//! `TFilterInput` types. A filter of `null` is the neutral element and
//! matches everything; bare keys combine by implicit conjunction.

use std::cmp::Ordering;

use serde_json::Value as Json;

use strata_schema::{FieldType, ObjectDef};
use strata_store::Storage;
use strata_types::Document;

use crate::error::{DbError, DbResult};
use crate::transaction::Transaction;

/// Evaluate a document filter against one document.
pub fn eval_filter<S: Storage>(
    tx: &Transaction<'_, S>,
    def: &ObjectDef,
    id: &str,
    doc: &Document,
    filter: &Json,
) -> DbResult<bool> {
    if filter.is_null() {
        return Ok(true);
    }
    let Some(object) = filter.as_object() else {
        return Err(DbError::InvalidFilter(format!(
            "filter for {:?} must be an object",
            def.name
        )));
    };

    for (key, operand) in object {
        let matched = match key.as_str() {
            "and" => {
                let mut all = true;
                for subfilter in filter_list(operand)? {
                    if !eval_filter(tx, def, id, doc, subfilter)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "or" => {
                let mut any = false;
                for subfilter in filter_list(operand)? {
                    if eval_filter(tx, def, id, doc, subfilter)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "not" => !eval_filter(tx, def, id, doc, operand)?,
            "id" => leaf_filter(&Json::String(id.to_string()), operand)?,
            "hash" => {
                let hash = tx.document_hash(&def.name, id)?;
                leaf_filter(&Json::String(hash.to_hex()), operand)?
            }
            field_name => {
                let field = def.field(field_name).ok_or_else(|| DbError::UnknownField {
                    collection: def.name.clone(),
                    field: field_name.to_string(),
                })?;
                eval_field(tx, doc, &field.ty, field_name, operand)?
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_field<S: Storage>(
    tx: &Transaction<'_, S>,
    doc: &Document,
    ty: &FieldType,
    field_name: &str,
    operand: &Json,
) -> DbResult<bool> {
    if operand.is_null() {
        return Ok(true);
    }
    match ty {
        FieldType::Scalar(_) | FieldType::Enum(_) => {
            leaf_filter(&doc.field_or_null(field_name).to_json(), operand)
        }
        FieldType::ScalarList(_) | FieldType::EnumList(_) => {
            let elements: Vec<Json> = match doc.field_or_null(field_name).to_json() {
                Json::Array(items) => items,
                Json::Null => Vec::new(),
                other => {
                    return Err(DbError::InvalidFilter(format!(
                        "field {field_name:?} is not a list: {other}"
                    )))
                }
            };
            eval_quantifiers(operand, &elements, |element, subfilter| {
                leaf_filter(element, subfilter)
            })
        }
        FieldType::Relation(target) => {
            let target_def = tx.object_def(target)?;
            match doc.field_or_null(field_name).as_str() {
                Some(target_id) => {
                    let target_doc = tx.read_document(target, target_id)?;
                    eval_filter(tx, target_def, target_id, &target_doc, operand)
                }
                // A present filter never matches an absent relation.
                None => Ok(false),
            }
        }
        FieldType::RelationList(target) => {
            let target_def = tx.object_def(target)?;
            let ids: Vec<String> = match doc.field_or_null(field_name) {
                strata_types::Value::List(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            let mut elements = Vec::new();
            for target_id in &ids {
                elements.push((target_id.clone(), tx.read_document(target, target_id)?));
            }
            eval_quantifiers(operand, &elements, |(target_id, target_doc), subfilter| {
                eval_filter(tx, target_def, target_id, target_doc, subfilter)
            })
        }
    }
}

/// Evaluate an `all`/`any`/`none` quantifier object over list elements.
///
/// Multiple sub-filters under one quantifier combine by conjunction, and
/// multiple quantifier keys combine by conjunction. Quantifiers over an
/// empty list are vacuous: `all` and `none` hold, `any` does not.
fn eval_quantifiers<T>(
    operand: &Json,
    elements: &[T],
    mut matches: impl FnMut(&T, &Json) -> DbResult<bool>,
) -> DbResult<bool> {
    let Some(object) = operand.as_object() else {
        return Err(DbError::InvalidFilter(
            "list filter must be a quantifier object".to_string(),
        ));
    };
    for (key, subfilters) in object {
        if subfilters.is_null() {
            continue;
        }
        let subfilters = filter_list(subfilters)?;
        // Per-element conjunction of the sub-filters.
        let mut satisfied = Vec::with_capacity(elements.len());
        for element in elements {
            let mut all_subfilters = true;
            for &subfilter in &subfilters {
                if !matches(element, subfilter)? {
                    all_subfilters = false;
                    break;
                }
            }
            satisfied.push(all_subfilters);
        }
        let holds = match key.as_str() {
            "all" => satisfied.iter().all(|&m| m),
            "any" => satisfied.iter().any(|&m| m),
            "none" => !satisfied.iter().any(|&m| m),
            other => {
                return Err(DbError::InvalidFilter(format!(
                    "unknown quantifier {other:?}"
                )))
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a leaf operator object (`eq`/`neq`/`gt`/…) against one value.
fn leaf_filter(actual: &Json, ops: &Json) -> DbResult<bool> {
    if ops.is_null() {
        return Ok(true);
    }
    let Some(object) = ops.as_object() else {
        return Err(DbError::InvalidFilter(format!(
            "leaf filter must be an operator object, got {ops}"
        )));
    };
    for (op, operand) in object {
        if operand.is_null() && op != "eq" && op != "neq" {
            continue;
        }
        let holds = match op.as_str() {
            "eq" => leaf_eq(actual, operand)?,
            "neq" => !leaf_eq(actual, operand)?,
            "gt" => leaf_cmp(actual, operand)?.is_some_and(|o| o == Ordering::Greater),
            "gte" => leaf_cmp(actual, operand)?.is_some_and(|o| o != Ordering::Less),
            "lt" => leaf_cmp(actual, operand)?.is_some_and(|o| o == Ordering::Less),
            "lte" => leaf_cmp(actual, operand)?.is_some_and(|o| o != Ordering::Greater),
            "in" => leaf_membership(actual, operand)?,
            "nin" => !leaf_membership(actual, operand)?,
            other => {
                return Err(DbError::InvalidFilter(format!(
                    "unknown operator {other:?}"
                )))
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn leaf_membership(actual: &Json, operand: &Json) -> DbResult<bool> {
    let Some(items) = operand.as_array() else {
        return Err(DbError::InvalidFilter(format!(
            "in/nin operand must be a list, got {operand}"
        )));
    };
    for item in items {
        if leaf_eq(actual, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Equality with kind checking. Null compares equal only to null; Int and
/// Float interoperate numerically; any other kind pairing is invalid.
fn leaf_eq(actual: &Json, operand: &Json) -> DbResult<bool> {
    match (actual, operand) {
        (Json::Null, Json::Null) => Ok(true),
        (Json::Null, _) | (_, Json::Null) => Ok(false),
        (Json::Bool(a), Json::Bool(b)) => Ok(a == b),
        (Json::Number(_), Json::Number(_)) => {
            Ok(number_cmp(actual, operand) == Some(Ordering::Equal))
        }
        (Json::String(a), Json::String(b)) => Ok(a == b),
        _ => Err(incompatible(actual, operand)),
    }
}

/// Ordering comparison. `None` when one side is null (no match, no error).
fn leaf_cmp(actual: &Json, operand: &Json) -> DbResult<Option<Ordering>> {
    match (actual, operand) {
        (Json::Null, _) | (_, Json::Null) => Ok(None),
        (Json::Number(_), Json::Number(_)) => Ok(number_cmp(actual, operand)),
        (Json::String(a), Json::String(b)) => Ok(Some(a.as_str().cmp(b.as_str()))),
        _ => Err(incompatible(actual, operand)),
    }
}

fn number_cmp(a: &Json, b: &Json) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    let x = a.as_f64()?;
    let y = b.as_f64()?;
    x.partial_cmp(&y)
}

fn incompatible(actual: &Json, operand: &Json) -> DbError {
    DbError::InvalidFilter(format!(
        "cannot compare {} with {}",
        json_kind(actual),
        json_kind(operand)
    ))
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

/// Accept `[F, …]`, a bare `F`, or null as a list of sub-filters.
fn filter_list(value: &Json) -> DbResult<Vec<&Json>> {
    match value {
        Json::Array(items) => Ok(items.iter().collect()),
        Json::Null => Ok(Vec::new()),
        Json::Object(_) => Ok(vec![value]),
        other => Err(DbError::InvalidFilter(format!(
            "expected a filter or list of filters, got {other}"
        ))),
    }
}
