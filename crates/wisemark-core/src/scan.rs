//! Structural scanning of vendor JSON documents.
//!
//! The Wise response envelope is not contractually stable across assessment
//! types, so nothing here addresses a fixed path. Instead the scanner
//! pattern-matches on shape: recursive walks that collect ids by key alias,
//! score arrays for submission-likeness, and unwrap whichever envelope
//! variant a response happens to use. Each extractor tries an ordered list
//! of aliases; the order is part of the contract, not incidental.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

/// Keys that may carry a node's type tag, in priority order.
const TYPE_KEYS: [&str; 3] = ["entityType", "type", "contentType"];

/// A type tag containing any of these marks the node as a gradable unit.
const TYPE_SUBSTRINGS: [&str; 3] = ["assessment", "assignment", "homework"];

/// Id aliases read off a node whose type tag matched.
const NODE_ID_KEYS: [&str; 5] = ["_id", "id", "assessmentId", "assignment_id", "assignmentId"];

/// Id aliases collected wherever they appear, type tag or not.
const ANYWHERE_ID_KEYS: [&str; 3] = ["assessmentId", "assignment_id", "assignmentId"];

/// Keys that make an object look like a submission record.
pub const SUBMISSION_HINT_KEYS: [&str; 7] = [
    "studentId",
    "student_id",
    "submissionId",
    "submission_id",
    "attachments",
    "files",
    "submittedAt",
];

/// How many leading elements of a candidate array are scored.
const SCORE_WINDOW: usize = 10;

fn id_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_nonempty_str<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| {
        obj.get(*k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// Collect every assessment id reachable in the document: ids on nodes
/// whose type tag mentions an assessment/assignment/homework, plus any
/// value under an assessment-id alias anywhere in the tree. Returns the
/// deduplicated set in sorted order.
pub fn extract_assessment_ids(doc: &Value) -> Vec<String> {
    let mut ids = BTreeSet::new();
    collect_assessment_ids(doc, &mut ids);
    ids.into_iter().collect()
}

fn collect_assessment_ids(node: &Value, ids: &mut BTreeSet<String>) {
    match node {
        Value::Object(map) => {
            let type_tag = TYPE_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
                .map(str::to_lowercase)
                .unwrap_or_default();

            if TYPE_SUBSTRINGS.iter().any(|s| type_tag.contains(s)) {
                for k in NODE_ID_KEYS {
                    if let Some(id) = map.get(k).and_then(id_value) {
                        ids.insert(id);
                    }
                }
            }
            for k in ANYWHERE_ID_KEYS {
                if let Some(id) = map.get(k).and_then(id_value) {
                    ids.insert(id);
                }
            }
            for v in map.values() {
                collect_assessment_ids(v, ids);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_assessment_ids(v, ids);
            }
        }
        _ => {}
    }
}

/// An array of objects that scored as submission-shaped, with the JSON
/// path it was found under (for diagnostics).
#[derive(Debug)]
pub struct SubmissionListCandidate<'a> {
    pub path: String,
    pub items: &'a [Value],
}

fn looks_like_submission(v: &Value) -> bool {
    v.as_object()
        .map(|m| SUBMISSION_HINT_KEYS.iter().any(|k| m.contains_key(*k)))
        .unwrap_or(false)
}

/// Find every all-object array in the document where at least one of the
/// first ten elements carries a submission-shaped key.
pub fn find_submission_lists(doc: &Value) -> Vec<SubmissionListCandidate<'_>> {
    let mut out = Vec::new();
    walk_lists(doc, "", &mut out);
    out
}

fn walk_lists<'a>(node: &'a Value, path: &str, out: &mut Vec<SubmissionListCandidate<'a>>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                walk_lists(v, &child, out);
            }
        }
        Value::Array(items) => {
            if !items.is_empty() && items.iter().all(Value::is_object) {
                let score = items
                    .iter()
                    .take(SCORE_WINDOW)
                    .filter(|i| looks_like_submission(i))
                    .count();
                if score > 0 {
                    out.push(SubmissionListCandidate {
                        path: path.to_string(),
                        items,
                    });
                }
            }
            for (i, v) in items.iter().enumerate() {
                walk_lists(v, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

/// Pick the submission list for an assessment document: of all candidates,
/// the one with the most elements. The real roster is rarely the smallest
/// structurally-plausible array; on a tie the first one found wins.
pub fn best_submission_list(doc: &Value) -> Option<SubmissionListCandidate<'_>> {
    let mut best: Option<SubmissionListCandidate<'_>> = None;
    for cand in find_submission_lists(doc) {
        match &best {
            Some(b) if cand.items.len() <= b.items.len() => {}
            _ => best = Some(cand),
        }
    }
    if let Some(b) = &best {
        debug!(path = %b.path, len = b.items.len(), "selected submission list");
    }
    best
}

/// Unwrap the live-classes response envelope. Extractor order:
/// `data.classes` array, then `data` array, then a bare top-level array,
/// then a top-level `classes` array; first hit wins, else empty.
pub fn extract_class_list(doc: &Value) -> Vec<Value> {
    if let Some(list) = doc
        .get("data")
        .and_then(|d| d.get("classes"))
        .and_then(Value::as_array)
    {
        return list.clone();
    }
    if let Some(list) = doc.get("data").and_then(Value::as_array) {
        return list.clone();
    }
    if let Some(list) = doc.as_array() {
        return list.clone();
    }
    if let Some(list) = doc.get("classes").and_then(Value::as_array) {
        return list.clone();
    }
    Vec::new()
}

/// Pull (id, display name) off one class record. Id aliases `_id` then
/// `id`; name aliases `name` then `className`, with a `class_<id>`
/// fallback. A record with no id is unusable and yields `None`.
pub fn extract_class_identity(class: &Value) -> Option<(String, String)> {
    let id = ["_id", "id"]
        .iter()
        .find_map(|k| class.get(*k).and_then(id_value))?;
    let name = first_nonempty_str(class, &["name", "className"])
        .map(str::to_string)
        .unwrap_or_else(|| format!("class_{id}"));
    Some((id, name))
}

/// Extract the student id from a submission record. Aliases `student_id`,
/// `studentId`, `student`; a string value is taken as-is, an object yields
/// its `_id` then `id`. Empty when nothing matches.
pub fn extract_student_id(sub: &Value) -> String {
    for k in ["student_id", "studentId", "student"] {
        match sub.get(k) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Object(m)) => {
                if let Some(id) = ["_id", "id"].iter().find_map(|k| m.get(*k).and_then(id_value)) {
                    return id;
                }
            }
            _ => {}
        }
    }
    String::new()
}

/// Extract a display name for the student. Priority order: the populated
/// `studentId` object's `name`; the `student` object's first/last pair,
/// then its `name`/`fullName`; then the flat `studentName`,
/// `student_name`, `fullName`, `name` aliases; `unknown_student` last.
pub fn extract_student_name(sub: &Value) -> String {
    if let Some(name) = sub
        .get("studentId")
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return name.to_string();
    }

    if let Some(student) = sub.get("student").filter(|v| v.is_object()) {
        let first = first_nonempty_str(student, &["firstName", "first_name"]);
        let last = first_nonempty_str(student, &["lastName", "last_name"]);
        if first.is_some() || last.is_some() {
            return [first, last]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
        }
        if let Some(name) = first_nonempty_str(student, &["name", "fullName"]) {
            return name.to_string();
        }
    }

    if let Some(name) = first_nonempty_str(sub, &["studentName", "student_name", "fullName", "name"]) {
        return name.to_string();
    }

    "unknown_student".to_string()
}

/// Best-effort assessment title for logs. Dotted lookup order:
/// `data.title`, `title`, `data.name`, `name`. Filenames never carry the
/// title; routing uses the raw id.
pub fn extract_assessment_title(doc: &Value) -> Option<String> {
    const PATHS: [&str; 4] = ["data.title", "title", "data.name", "name"];
    for path in PATHS {
        let mut cur = doc;
        let mut ok = true;
        for part in path.split('.') {
            match cur.get(part) {
                Some(v) => cur = v,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            if let Some(s) = cur.as_str().map(str::trim).filter(|s| !s.is_empty()) {
                return Some(s.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assessment_ids_from_typed_nodes_and_aliases() {
        let doc = json!({
            "sections": [
                { "entityType": "ASSESSMENT", "_id": "a1" },
                { "type": "homework", "id": "a2" },
                { "contentType": "video", "id": "ignored" },
                { "lesson": { "assignmentId": "a3" } },
            ]
        });
        assert_eq!(extract_assessment_ids(&doc), vec!["a1", "a2", "a3"]);
    }

    #[test]
    fn assessment_ids_are_deduplicated_and_sorted() {
        let doc = json!({
            "a": { "assessmentId": "z9" },
            "b": { "entityType": "assignment", "_id": "z9", "assessmentId": "a0" },
        });
        assert_eq!(extract_assessment_ids(&doc), vec!["a0", "z9"]);
    }

    #[test]
    fn type_tag_falls_through_empty_aliases() {
        let doc = json!({ "entityType": "", "type": "assessment", "_id": "a1" });
        assert_eq!(extract_assessment_ids(&doc), vec!["a1"]);
    }

    #[test]
    fn largest_submission_shaped_array_wins() {
        let doc = json!({
            "data": {
                "meta": [ { "label": "x" }, { "label": "y" } ],
                "submissions": [
                    { "studentId": "s1", "attachments": [] },
                    { "studentId": "s2", "attachments": [] },
                    { "studentId": "s3", "attachments": [] },
                    { "studentId": "s4", "attachments": [] },
                    { "studentId": "s5", "attachments": [] },
                ],
            }
        });
        let best = best_submission_list(&doc).expect("one candidate qualifies");
        assert_eq!(best.items.len(), 5);
        assert_eq!(best.path, "data.submissions");
    }

    #[test]
    fn arrays_without_hint_keys_are_not_candidates() {
        let doc = json!({ "rows": [ { "a": 1 }, { "b": 2 } ] });
        assert!(best_submission_list(&doc).is_none());
    }

    #[test]
    fn mixed_type_arrays_are_not_candidates() {
        let doc = json!({ "rows": [ { "studentId": "s1" }, 42 ] });
        assert!(best_submission_list(&doc).is_none());
    }

    #[test]
    fn nested_candidate_lists_are_found() {
        let doc = json!([ { "wrapper": { "list": [ { "submissionId": "x" } ] } } ]);
        let best = best_submission_list(&doc).expect("nested list qualifies");
        assert_eq!(best.path, "[0].wrapper.list");
    }

    #[test]
    fn class_list_envelope_variants() {
        let inner = json!([ { "_id": "c1", "name": "10B" } ]);
        let variants = [
            json!({ "data": { "classes": inner.clone() } }),
            json!({ "data": inner.clone() }),
            inner.clone(),
            json!({ "classes": inner.clone() }),
        ];
        for doc in &variants {
            assert_eq!(extract_class_list(doc).len(), 1, "variant failed: {doc}");
        }
        assert!(extract_class_list(&json!({ "data": {} })).is_empty());
    }

    #[test]
    fn class_identity_aliases_and_fallback_name() {
        let (id, name) = extract_class_identity(&json!({ "_id": "c1", "name": "10B" })).unwrap();
        assert_eq!((id.as_str(), name.as_str()), ("c1", "10B"));

        let (id, name) =
            extract_class_identity(&json!({ "id": "c2", "className": "Set 3" })).unwrap();
        assert_eq!((id.as_str(), name.as_str()), ("c2", "Set 3"));

        let (_, name) = extract_class_identity(&json!({ "id": "c3" })).unwrap();
        assert_eq!(name, "class_c3");

        assert!(extract_class_identity(&json!({ "name": "orphan" })).is_none());
    }

    #[test]
    fn student_id_string_and_object_forms() {
        assert_eq!(extract_student_id(&json!({ "student_id": "s1" })), "s1");
        assert_eq!(extract_student_id(&json!({ "studentId": { "_id": "s2" } })), "s2");
        assert_eq!(extract_student_id(&json!({ "student": { "id": "s3" } })), "s3");
        assert_eq!(extract_student_id(&json!({ "other": 1 })), "");
    }

    #[test]
    fn student_name_priority_order() {
        assert_eq!(
            extract_student_name(&json!({ "studentId": { "name": " Jane D " } })),
            "Jane D"
        );
        assert_eq!(
            extract_student_name(&json!({ "student": { "firstName": "Jane", "lastName": "Doe" } })),
            "Jane Doe"
        );
        assert_eq!(
            extract_student_name(&json!({ "student": { "firstName": "Jane" } })),
            "Jane"
        );
        assert_eq!(
            extract_student_name(&json!({ "student": { "fullName": "Jane Doe" } })),
            "Jane Doe"
        );
        assert_eq!(
            extract_student_name(&json!({ "studentName": "Flat Name" })),
            "Flat Name"
        );
        assert_eq!(extract_student_name(&json!({})), "unknown_student");
    }

    #[test]
    fn assessment_title_lookup_order() {
        assert_eq!(
            extract_assessment_title(&json!({ "data": { "title": "Algebra Test" } })).as_deref(),
            Some("Algebra Test")
        );
        assert_eq!(
            extract_assessment_title(&json!({ "name": "Fallback" })).as_deref(),
            Some("Fallback")
        );
        assert_eq!(extract_assessment_title(&json!({ "data": {} })), None);
    }
}
