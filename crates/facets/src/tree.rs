//! Hierarchical checkbox tree for category facets (biome lineage and the like).
//!
//! Nodes live in a flat arena and refer to their parent and children by
//! index, so propagation walks are simple index loops. Each node's id and
//! value is its lineage path (`root:Environmental:Air`).

mod lineage;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FacetError, Result};

pub use lineage::{join_lineage, LINEAGE_SEPARATOR};

/// Checkbox state of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Unchecked,
    Checked,
    Indeterminate,
}

impl CheckState {
    fn from_checked(checked: bool) -> Self {
        if checked {
            Self::Checked
        } else {
            Self::Unchecked
        }
    }
}

/// One entry of the server-supplied category hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub label: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn leaf(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
            children: Vec::new(),
        }
    }

    pub fn branch(label: impl Into<String>, count: u64, children: Vec<CategoryNode>) -> Self {
        Self {
            label: label.into(),
            count,
            children,
        }
    }
}

/// A materialised tree node.
#[derive(Debug, Clone)]
pub struct FacetNode {
    id: String,
    label: String,
    count: u64,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    state: CheckState,
    expanded: bool,
}

impl FacetNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The value submitted for this node, identical to its lineage id.
    pub fn value(&self) -> &str {
        &self.id
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckboxTree {
    nodes: Vec<FacetNode>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
}

impl CheckboxTree {
    /// Builds an all-unchecked, collapsed tree from the category hierarchy.
    pub fn from_hierarchy(roots: &[CategoryNode]) -> Self {
        let mut tree = Self::default();
        for root in roots {
            let idx = tree.insert(root, None);
            tree.roots.push(idx);
        }
        tree
    }

    fn insert(&mut self, category: &CategoryNode, parent: Option<usize>) -> usize {
        let (id, depth) = match parent {
            Some(parent_idx) => {
                let parent_node = &self.nodes[parent_idx];
                (
                    join_lineage([parent_node.id.as_str(), category.label.as_str()]),
                    parent_node.depth + 1,
                )
            }
            None => (category.label.clone(), 0),
        };

        let idx = self.nodes.len();
        self.nodes.push(FacetNode {
            id: id.clone(),
            label: category.label.clone(),
            count: category.count,
            depth,
            parent,
            children: Vec::with_capacity(category.children.len()),
            state: CheckState::Unchecked,
            expanded: false,
        });
        self.index.insert(id, idx);

        for child in &category.children {
            let child_idx = self.insert(child, Some(idx));
            self.nodes[idx].children.push(child_idx);
        }
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&FacetNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn state(&self, id: &str) -> Result<CheckState> {
        Ok(self.nodes[self.lookup(id)?].state)
    }

    pub fn roots(&self) -> impl Iterator<Item = &FacetNode> {
        self.roots.iter().map(|&idx| &self.nodes[idx])
    }

    pub fn children(&self, id: &str) -> Result<Vec<&FacetNode>> {
        let idx = self.lookup(id)?;
        Ok(self.nodes[idx]
            .children
            .iter()
            .map(|&child| &self.nodes[child])
            .collect())
    }

    /// Sets a node checked or unchecked.
    ///
    /// Every descendant is forced to the same state and every ancestor is
    /// recomputed from its children. Returns `true` if any node changed.
    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<bool> {
        let idx = self.lookup(id)?;
        let target = CheckState::from_checked(checked);
        let mut changed = self.force_subtree(idx, target);
        changed += self.recompute_ancestors(idx);
        Ok(changed > 0)
    }

    /// Unchecks every node. Returns `true` if anything was checked.
    pub fn clear(&mut self) -> bool {
        let mut changed = false;
        for node in &mut self.nodes {
            if node.state != CheckState::Unchecked {
                node.state = CheckState::Unchecked;
                changed = true;
            }
        }
        changed
    }

    fn force_subtree(&mut self, idx: usize, target: CheckState) -> usize {
        let mut changed = 0;
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current];
            if node.state != target {
                node.state = target;
                changed += 1;
            }
            stack.extend(node.children.iter().copied());
        }
        changed
    }

    fn recompute_ancestors(&mut self, idx: usize) -> usize {
        let mut changed = 0;
        let mut current = self.nodes[idx].parent;
        while let Some(parent) = current {
            let derived = self.derive_state(parent);
            let node = &mut self.nodes[parent];
            if node.state != derived {
                node.state = derived;
                changed += 1;
            }
            current = node.parent;
        }
        changed
    }

    fn derive_state(&self, idx: usize) -> CheckState {
        let children = &self.nodes[idx].children;
        if children.is_empty() {
            return self.nodes[idx].state;
        }
        let mut checked = 0;
        let mut touched = 0;
        for &child in children {
            match self.nodes[child].state {
                CheckState::Checked => {
                    checked += 1;
                    touched += 1;
                }
                CheckState::Indeterminate => touched += 1,
                CheckState::Unchecked => {}
            }
        }
        if touched == 0 {
            CheckState::Unchecked
        } else if checked == children.len() {
            CheckState::Checked
        } else {
            CheckState::Indeterminate
        }
    }

    /// The selected subtree tops: checked nodes whose parent is not checked.
    ///
    /// These are the nodes shown as filter chips and submitted as filter
    /// values, in depth-first order.
    pub fn selected(&self) -> Vec<&FacetNode> {
        let mut selected = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            match node.state {
                CheckState::Checked => selected.push(node),
                CheckState::Indeterminate => {
                    stack.extend(node.children.iter().rev().copied());
                }
                CheckState::Unchecked => {}
            }
        }
        selected
    }

    pub fn selected_values(&self) -> Vec<String> {
        self.selected()
            .into_iter()
            .map(|node| node.id.clone())
            .collect()
    }

    /// Expands or collapses a node. Never touches checked state.
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> Result<()> {
        let idx = self.lookup(id)?;
        self.nodes[idx].expanded = expanded;
        Ok(())
    }

    /// Flips a node's expansion and returns the new value.
    pub fn toggle_expanded(&mut self, id: &str) -> Result<bool> {
        let idx = self.lookup(id)?;
        let node = &mut self.nodes[idx];
        node.expanded = !node.expanded;
        Ok(node.expanded)
    }

    /// Nodes a renderer should draw: roots plus children of expanded nodes.
    pub fn visible_nodes(&self) -> Vec<&FacetNode> {
        let mut visible = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            visible.push(node);
            if node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        visible
    }

    fn lookup(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| FacetError::UnknownNode(id.to_string()))
    }
}
