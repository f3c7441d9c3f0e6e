//! Rendering of diff trees and document paths.

use std::collections::HashMap;

use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

use odiff_core::{ChangeSummary, DiffNode, DiffState, DiffTree};
use odiff_types::json::to_json;
use odiff_types::{ElementSelector, NodePath, ObjectIdentity, Value};

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Report {
    pub summary: ChangeSummary,
    pub nodes: Vec<ReportNode>,
}

#[derive(Debug, Serialize)]
pub struct ReportNode {
    pub path: NodePath,
    pub state: DiffState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_start: Option<NodePath>,
}

impl Report {
    pub fn from_tree(tree: &DiffTree) -> Self {
        let nodes = tree
            .walk()
            .map(|(_, node)| ReportNode {
                path: node.path().clone(),
                state: node.state(),
                value_type: node.value_type().map(ToString::to_string),
                working: scalar_json(node.working()),
                base: scalar_json(node.base()),
                circle_start: node.circle_start_path().cloned(),
            })
            .collect();
        Self {
            summary: tree.summary(),
            nodes,
        }
    }
}

/// Scalars are reported inline; containers are described by their children.
fn scalar_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Null => None,
        v if v.identity().is_none() => Some(to_json(v)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Text tree
// ---------------------------------------------------------------------------

pub fn render_tree(tree: &DiffTree) -> String {
    let mut out = String::new();
    for (depth, node) in tree.walk() {
        let indent = "  ".repeat(depth);
        out.push_str(&format!(
            "{indent}{} {}{}\n",
            marker(node.state()),
            label(node.element()).bold(),
            detail(node)
        ));
        if let (DiffState::Changed, Value::Text(working), Value::Text(base)) =
            (node.state(), node.working(), node.base())
        {
            if working.contains('\n') || base.contains('\n') {
                out.push_str(&render_text_diff(base, working, &format!("{indent}    ")));
            }
        }
    }

    let summary = tree.summary();
    out.push_str(&format!(
        "\n{} change(s): {} added, {} removed, {} changed, {} circular\n",
        summary.changes().to_string().bold(),
        summary.added.to_string().green(),
        summary.removed.to_string().red(),
        summary.changed.to_string().yellow(),
        summary.circular.to_string().cyan(),
    ));
    out
}

fn marker(state: DiffState) -> String {
    match state {
        DiffState::Added => "+".green().bold().to_string(),
        DiffState::Removed => "-".red().bold().to_string(),
        DiffState::Changed => "~".yellow().bold().to_string(),
        DiffState::Untouched => "=".dimmed().to_string(),
        DiffState::Ignored => "?".dimmed().to_string(),
        DiffState::Circular => "@".cyan().bold().to_string(),
    }
}

fn label(element: &ElementSelector) -> String {
    match element {
        ElementSelector::Root => "/".into(),
        ElementSelector::Property(name) => name.clone(),
        other => other.to_string(),
    }
}

fn detail(node: &DiffNode) -> String {
    match node.state() {
        DiffState::Circular => match node.circle_start_path() {
            Some(start) => format!(" -> {}", start.to_string().cyan()),
            None => String::new(),
        },
        DiffState::Changed if !node.has_children() => {
            let (working, base) = (node.working(), node.base());
            if matches!((working, base), (Value::Text(w), Value::Text(b)) if w.contains('\n') || b.contains('\n')) {
                String::new()
            } else {
                format!(": {} -> {}", base.summary().red(), working.summary().green())
            }
        }
        DiffState::Added if !node.has_children() => format!(": {}", node.working().summary().green()),
        DiffState::Removed if !node.has_children() => format!(": {}", node.base().summary().red()),
        _ => String::new(),
    }
}

/// Line diff of `old` against `new`, each line prefixed with `indent`.
pub fn render_text_diff(old: &str, new: &str, indent: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        let rendered = match change.tag() {
            ChangeTag::Delete => format!("-{line}").red().to_string(),
            ChangeTag::Insert => format!("+{line}").green().to_string(),
            ChangeTag::Equal => format!(" {line}").dimmed().to_string(),
        };
        out.push_str(&format!("{indent}{rendered}\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Document paths
// ---------------------------------------------------------------------------

/// One location of a document.
#[derive(Debug, Serialize)]
pub struct DocumentPath {
    pub path: NodePath,
    pub summary: String,
    /// Set when the container at `path` was already listed under another path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<NodePath>,
}

/// Every path of `root` in pre-order. Containers reachable more than once are
/// expanded at their first path only.
pub fn document_paths(root: &Value) -> Vec<DocumentPath> {
    let mut seen: HashMap<ObjectIdentity, NodePath> = HashMap::new();
    let mut out = Vec::new();
    let mut stack = vec![(NodePath::root(), root.clone())];

    while let Some((path, value)) = stack.pop() {
        if let Some(identity) = value.identity() {
            if let Some(first) = seen.get(&identity) {
                out.push(DocumentPath {
                    path,
                    summary: value.summary(),
                    alias_of: Some(first.clone()),
                });
                continue;
            }
            seen.insert(identity, path.clone());
        }

        let mut children = children_of(&value);
        children.reverse();
        for (element, child) in children {
            stack.push((path.with_child(element), child));
        }
        out.push(DocumentPath {
            path,
            summary: value.summary(),
            alias_of: None,
        });
    }
    out
}

fn children_of(value: &Value) -> Vec<(ElementSelector, Value)> {
    match value {
        Value::Record(r) => r
            .borrow()
            .fields()
            .iter()
            .map(|(name, v)| (ElementSelector::property(name.as_str()), v.clone()))
            .collect(),
        Value::List(l) => l
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (ElementSelector::Index(i), v.clone()))
            .collect(),
        Value::Map(m) => m
            .borrow()
            .iter()
            .map(|(key, v)| (ElementSelector::key(key.as_str()), v.clone()))
            .collect(),
        _ => Vec::new(),
    }
}
