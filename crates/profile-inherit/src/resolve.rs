//! Single-inheritance resolution
//!
//! Resolves each document's base chain depth-first, merging parent into
//! child with [`inherit`]. Resolved documents are memoized by name, and
//! the active recursion path is tracked to detect cycles.
//!
//! Failures are isolated per root name: a broken chain is reported and
//! skipped, unrelated documents still resolve.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ResolveError;
use crate::merge::{inherit, Document};

/// Outcome of resolving every document in a raw set
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    /// Fully merged documents by logical name
    pub documents: BTreeMap<String, Document>,

    /// Chains that failed to resolve, in the order they were attempted
    pub failures: Vec<ChainFailure>,
}

/// A root name whose chain could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ChainFailure {
    pub name: String,
    pub error: ResolveError,
}

/// Read the base reference declared by `document`.
///
/// Absent, `null` and empty-string references mean "no base".
pub fn base_reference<'a>(
    name: &str,
    document: &'a Document,
    base_key: &str,
) -> Result<Option<&'a str>, ResolveError> {
    match document.get(base_key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(base)) if base.is_empty() => Ok(None),
        Some(Value::String(base)) => Ok(Some(base.as_str())),
        Some(other) => Err(ResolveError::InvalidBase {
            name: name.to_string(),
            found: other.to_string(),
        }),
    }
}

/// Resolve `name` against `raw`, memoizing into `cache`.
///
/// `stack` is the active recursion path. It is left exactly as it was
/// given on both success and failure.
pub fn resolve(
    name: &str,
    raw: &BTreeMap<String, Document>,
    cache: &mut BTreeMap<String, Document>,
    stack: &mut Vec<String>,
    base_key: &str,
) -> Result<Document, ResolveError> {
    if let Some(resolved) = cache.get(name) {
        return Ok(resolved.clone());
    }

    if let Some(start) = stack.iter().position(|entry| entry == name) {
        let mut path = stack[start..].to_vec();
        path.push(name.to_string());
        return Err(ResolveError::Circular { path });
    }

    let Some(own) = raw.get(name) else {
        return Err(ResolveError::MissingBase {
            base: name.to_string(),
            required_by: stack.last().cloned(),
        });
    };

    stack.push(name.to_string());
    let result = merge_with_base(name, own, raw, cache, stack, base_key);
    stack.pop();

    let resolved = result?;
    cache.insert(name.to_string(), resolved.clone());
    Ok(resolved)
}

fn merge_with_base(
    name: &str,
    own: &Document,
    raw: &BTreeMap<String, Document>,
    cache: &mut BTreeMap<String, Document>,
    stack: &mut Vec<String>,
    base_key: &str,
) -> Result<Document, ResolveError> {
    match base_reference(name, own, base_key)? {
        Some(base) => {
            let parent = resolve(base, raw, cache, stack, base_key)?;
            Ok(inherit(&parent, own))
        }
        None => Ok(own.clone()),
    }
}

/// Resolve every document in `raw`, collecting failures per root name.
///
/// Names are attempted in sorted order, so the outcome (including the
/// reported cycle paths) is deterministic.
pub fn resolve_all(raw: &BTreeMap<String, Document>, base_key: &str) -> ResolvedSet {
    let mut cache = BTreeMap::new();
    let mut failures = Vec::new();
    let mut stack = Vec::new();

    for name in raw.keys() {
        if cache.contains_key(name) {
            continue;
        }
        if let Err(error) = resolve(name, raw, &mut cache, &mut stack, base_key) {
            failures.push(ChainFailure {
                name: name.clone(),
                error,
            });
        }
    }

    ResolvedSet {
        documents: cache,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE_KEY: &str = "base_profile";

    fn raw_set(docs: Vec<Value>) -> BTreeMap<String, Document> {
        docs.into_iter()
            .map(|value| {
                let map = match value {
                    Value::Object(map) => map,
                    other => panic!("expected object, got {other}"),
                };
                let name = map["name"].as_str().unwrap().to_string();
                (name, map)
            })
            .collect()
    }

    #[test]
    fn test_document_without_base_is_unchanged() {
        let raw = raw_set(vec![json!({"name": "solo", "tools": [1, 2]})]);
        let set = resolve_all(&raw, BASE_KEY);

        assert!(set.failures.is_empty());
        assert_eq!(set.documents["solo"], raw["solo"]);
    }

    #[test]
    fn test_three_level_chain() {
        let raw = raw_set(vec![
            json!({"name": "a", "llm": {"model": "m1", "temperature": 0.1}, "tags": ["a"]}),
            json!({"name": "b", "base_profile": "a", "llm": {"model": "m2"}, "tags": ["b"]}),
            json!({"name": "c", "base_profile": "b", "llm": {"temperature": 0.9}, "tags": ["a", "c"]}),
        ]);
        let set = resolve_all(&raw, BASE_KEY);

        let expected = inherit(&inherit(&raw["a"], &raw["b"]), &raw["c"]);
        assert_eq!(set.documents["c"], expected);
        assert_eq!(set.documents["c"]["llm"], json!({"model": "m2", "temperature": 0.9}));
        assert_eq!(set.documents["c"]["tags"], json!(["a", "b", "c"]));
        assert_eq!(set.documents["c"]["base_profile"], "b");
    }

    #[test]
    fn test_two_node_cycle_is_isolated() {
        let raw = raw_set(vec![
            json!({"name": "a", "base_profile": "b"}),
            json!({"name": "b", "base_profile": "a"}),
            json!({"name": "c"}),
        ]);
        let set = resolve_all(&raw, BASE_KEY);

        assert!(!set.documents.contains_key("a"));
        assert!(!set.documents.contains_key("b"));
        assert!(set.documents.contains_key("c"));

        assert_eq!(set.failures.len(), 2);
        assert_eq!(
            set.failures[0],
            ChainFailure {
                name: "a".to_string(),
                error: ResolveError::Circular {
                    path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
                },
            }
        );
        assert!(matches!(
            &set.failures[1].error,
            ResolveError::Circular { path } if path == &["b", "a", "b"]
        ));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let raw = raw_set(vec![json!({"name": "loop", "base_profile": "loop"})]);
        let set = resolve_all(&raw, BASE_KEY);

        assert!(set.documents.is_empty());
        assert_eq!(
            set.failures[0].error.to_string(),
            "circular inheritance: loop -> loop"
        );
    }

    #[test]
    fn test_cycle_path_starts_at_repeated_name() {
        let raw = raw_set(vec![
            json!({"name": "entry", "base_profile": "x"}),
            json!({"name": "x", "base_profile": "y"}),
            json!({"name": "y", "base_profile": "x"}),
        ]);
        let mut cache = BTreeMap::new();
        let mut stack = Vec::new();

        let err = resolve("entry", &raw, &mut cache, &mut stack, BASE_KEY).unwrap_err();

        assert_eq!(
            err,
            ResolveError::Circular {
                path: vec!["x".to_string(), "y".to_string(), "x".to_string()],
            }
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn test_missing_base_is_isolated() {
        let raw = raw_set(vec![
            json!({"name": "x", "base_profile": "nonexistent"}),
            json!({"name": "x-child", "base_profile": "x"}),
            json!({"name": "y"}),
        ]);
        let set = resolve_all(&raw, BASE_KEY);

        assert_eq!(set.documents.keys().collect::<Vec<_>>(), vec!["y"]);
        assert_eq!(set.failures.len(), 2);
        assert_eq!(
            set.failures[0].error,
            ResolveError::MissingBase {
                base: "nonexistent".to_string(),
                required_by: Some("x".to_string()),
            }
        );
    }

    #[test]
    fn test_failed_branch_does_not_poison_siblings() {
        let raw = raw_set(vec![
            json!({"name": "root", "model": "m"}),
            json!({"name": "bad-leaf", "base_profile": "ghost"}),
            json!({"name": "good", "base_profile": "root"}),
        ]);
        let mut cache = BTreeMap::new();
        let mut stack = Vec::new();

        assert!(resolve("bad-leaf", &raw, &mut cache, &mut stack, BASE_KEY).is_err());
        assert!(stack.is_empty());

        let good = resolve("good", &raw, &mut cache, &mut stack, BASE_KEY).unwrap();
        assert_eq!(good["model"], "m");
    }

    #[test]
    fn test_shared_base_resolved_once() {
        let raw = raw_set(vec![
            json!({"name": "base", "v": 1}),
            json!({"name": "left", "base_profile": "base"}),
            json!({"name": "right", "base_profile": "base"}),
        ]);
        let mut cache = BTreeMap::new();
        let mut stack = Vec::new();

        resolve("left", &raw, &mut cache, &mut stack, BASE_KEY).unwrap();
        assert!(cache.contains_key("base"));

        // A poisoned raw entry proves the cached copy is used
        let mut changed = raw.clone();
        changed.get_mut("base").unwrap().insert("v".to_string(), json!(2));
        let right = resolve("right", &changed, &mut cache, &mut stack, BASE_KEY).unwrap();
        assert_eq!(right["v"], 1);
    }

    #[test]
    fn test_empty_and_null_base_mean_no_base() {
        let raw = raw_set(vec![
            json!({"name": "empty", "base_profile": ""}),
            json!({"name": "null", "base_profile": null}),
        ]);
        let set = resolve_all(&raw, BASE_KEY);

        assert!(set.failures.is_empty());
        assert_eq!(set.documents.len(), 2);
    }

    #[test]
    fn test_non_string_base_is_rejected() {
        let raw = raw_set(vec![json!({"name": "odd", "base_profile": 42})]);
        let set = resolve_all(&raw, BASE_KEY);

        assert_eq!(
            set.failures[0].error,
            ResolveError::InvalidBase {
                name: "odd".to_string(),
                found: "42".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_root_name() {
        let raw = BTreeMap::new();
        let mut cache = BTreeMap::new();
        let mut stack = Vec::new();

        let err = resolve("nobody", &raw, &mut cache, &mut stack, BASE_KEY).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingBase {
                base: "nobody".to_string(),
                required_by: None,
            }
        );
    }
}
