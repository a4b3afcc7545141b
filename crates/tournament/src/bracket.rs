//! Consensus bracket
//!
//! Match results are reported as label sets (one label for a decided match,
//! several for a tie). Reports for the same match slot are collected under
//! one aggregator node; as soon as one label can no longer be caught up, or
//! the slot fills up, the aggregator settles and its outcome is evaluated by
//! the slot one level up, all the way to the root.

use rank_core::{Frequency, NaryTree, NodeId, Split, Tally, TreeError, Weighting};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Reserved character joining the labels of a tie
pub const SEPARATOR: char = '|';

/// Placeholder label for slots closed by an early decision
pub const BYE: &str = "bye";

/// Rendering of an undecided aggregator
const PENDING: &str = "?";

/// Marker appended to archived nodes when rendering
const ARCHIVED_TAG: &str = " ▪";

/// Ordered set of distinct labels carried by a report
pub type Labels = Vec<String>;

/// What happens to subtrees hidden by a prune pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    /// Keep archived subtrees for height queries and rendering
    #[default]
    Retain,
    /// Release archived subtrees; only the settled nodes themselves remain
    Discard,
}

/// Built-in tally weightings, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingKind {
    /// Every label of every report counts once
    #[default]
    Frequency,
    /// A tied report splits one vote between its labels
    Split,
}

impl WeightingKind {
    pub fn strategy(self) -> Arc<dyn Weighting + Send + Sync> {
        match self {
            WeightingKind::Frequency => Arc::new(Frequency),
            WeightingKind::Split => Arc::new(Split),
        }
    }
}

/// Bracket configuration
#[derive(Debug, Clone)]
pub struct BracketConfig {
    /// Maximum number of reports per slot
    pub branching_factor: usize,
    /// Depth at which settled subtrees are archived (0 disables pruning)
    pub prune_depth: usize,
    pub weighting: Arc<dyn Weighting + Send + Sync>,
    pub archive_policy: ArchivePolicy,
}

impl BracketConfig {
    pub fn new(branching_factor: usize) -> Self {
        Self {
            branching_factor,
            prune_depth: 0,
            weighting: Arc::new(Frequency),
            archive_policy: ArchivePolicy::Retain,
        }
    }

    pub fn with_prune_depth(mut self, prune_depth: usize) -> Self {
        self.prune_depth = prune_depth;
        self
    }

    pub fn with_weighting(mut self, weighting: Arc<dyn Weighting + Send + Sync>) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_archive_policy(mut self, archive_policy: ArchivePolicy) -> Self {
        self.archive_policy = archive_policy;
        self
    }
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Reasons a report or configuration is rejected. The bracket is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BracketError {
    #[error("a report needs at least one label")]
    EmptyReport,
    #[error("labels must not be empty")]
    EmptyLabel,
    #[error("label {0:?} appears more than once in the report")]
    DuplicateLabel(String),
    #[error("label {0:?} contains the reserved separator '|'")]
    ReservedSeparator(String),
    #[error("label {0:?} is reserved for closed slots")]
    ReservedLabel(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Outcome of evaluating one slot
enum Verdict {
    Wait,
    /// One label leads by more than the open slots could overturn
    Dominant(String),
    /// The slot is full and these labels share the lead
    Tied(Labels),
}

/// Self-organizing bracket fed by match reports
#[derive(Debug, Clone)]
pub struct BracketTree {
    tree: NaryTree<Labels>,
    config: BracketConfig,
}

impl BracketTree {
    pub fn new(config: BracketConfig) -> Result<Self, BracketError> {
        let tree = NaryTree::new(config.branching_factor)?;
        Ok(Self { tree, config })
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    /// Record a match report and settle every slot it decides.
    ///
    /// Returns the node created for the report.
    pub fn push<I, S>(&mut self, labels: I) -> Result<NodeId, BracketError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = validate(labels)?;

        if self.config.prune_depth > 0 && self.is_saturated() {
            self.prune();
        }

        let leaf = self.tree.push(labels);
        if let Some(parent) = self.tree.parent(leaf) {
            self.settle(parent)?;
        }
        Ok(leaf)
    }

    /// Archive settled subtrees at `prune_depth` and every settled ancestor
    /// whose first active child is archived. Returns the number of nodes
    /// archived by this pass.
    pub fn prune(&mut self) -> usize {
        let Some(root) = self.tree.root() else {
            return 0;
        };
        let mut archived = 0;
        self.prune_from(root, 0, &mut archived);
        if archived > 0 {
            debug!(
                archived,
                active = self.tree.active_len(),
                total = self.tree.len(),
                "pruned settled subtrees"
            );
        }
        archived
    }

    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    /// Labels of the root once the whole bracket is settled.
    pub fn winner(&self) -> Option<&[String]> {
        self.tree
            .root()
            .and_then(|root| self.tree.value(root))
            .map(Vec::as_slice)
    }

    /// Whether `id` still names a node. Ids of subtrees released by the
    /// `Discard` policy do not, even after their slots are reused.
    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    /// Labels of a node, `None` while it is still collecting reports or once
    /// it was released.
    pub fn labels(&self, id: NodeId) -> Option<&[String]> {
        self.tree.value(id).map(Vec::as_slice)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.parent(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.tree.children(id)
    }

    pub fn archived_children(&self, id: NodeId) -> &[NodeId] {
        self.tree.archived_children(id)
    }

    pub fn is_archived(&self, id: NodeId) -> bool {
        self.tree.is_archived(id)
    }

    /// All nodes, archived ones included.
    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Nodes still reachable by insertion and tallying.
    pub fn active_count(&self) -> usize {
        self.tree.active_len()
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Climb from `node`, settling each slot that can be decided.
    fn settle(&mut self, node: NodeId) -> Result<(), BracketError> {
        let mut current = node;
        loop {
            let promoted = match self.verdict(current) {
                Verdict::Wait => return Ok(()),
                Verdict::Dominant(label) => {
                    for _ in 0..self.tree.open_slots(current) {
                        self.tree.append_child(current, Some(vec![BYE.to_string()]))?;
                    }
                    vec![label]
                }
                Verdict::Tied(labels) => labels,
            };
            debug!(node = %current, labels = %Joined(&promoted), "slot settled");
            self.tree.set_value(current, Some(promoted))?;

            match self.tree.parent(current) {
                Some(parent) => current = parent,
                None => return Ok(()),
            }
        }
    }

    fn verdict(&self, node: NodeId) -> Verdict {
        let tally = self.tally(node);
        let open = self.tree.open_slots(node);

        let (Some((leader, top)), runner_up) = tally.top_two() else {
            return Verdict::Wait;
        };
        let second = runner_up.map(|(_, value)| value);

        let unique = second.map_or(true, |second| top > second);
        let lone_majority =
            second.is_none() && top > self.config.branching_factor as f64 / 2.0;
        let out_of_reach = top > second.unwrap_or(0.0) + open as f64;
        if unique && (lone_majority || out_of_reach) {
            return Verdict::Dominant(leader.clone());
        }

        if open == 0 {
            let tied = tally
                .iter()
                .take_while(|(_, value)| *value == top)
                .map(|(label, _)| label.clone())
                .collect();
            return Verdict::Tied(tied);
        }
        Verdict::Wait
    }

    /// Weighted label counts over the settled active children of `node`.
    fn tally(&self, node: NodeId) -> Tally<String> {
        let mut tally = Tally::new();
        for &child in self.tree.children(node) {
            if let Some(labels) = self.tree.value(child) {
                tally.balanced_add(labels, self.config.weighting.as_ref());
            }
        }
        tally
    }

    /// Every open slot above `prune_depth` is at capacity. Settled and
    /// archived nodes no longer take reports and are skipped.
    fn is_saturated(&self) -> bool {
        let depth_limit = self.config.prune_depth;
        let nodes = self.tree.walk_active(depth_limit.saturating_sub(1));
        !nodes.is_empty()
            && nodes
                .iter()
                .filter(|(id, _)| !self.tree.is_archived(*id) && self.tree.value(*id).is_none())
                .all(|(id, _)| self.tree.children(*id).len() == self.config.branching_factor)
    }

    fn prune_from(&mut self, id: NodeId, depth: usize, archived: &mut usize) -> bool {
        if self.tree.is_archived(id) {
            return true;
        }
        if depth < self.config.prune_depth {
            let children = self.tree.children(id).to_vec();
            for child in children {
                self.prune_from(child, depth + 1, archived);
            }
        }

        let settled = self.tree.value(id).is_some();
        let first_archived = self
            .tree
            .children(id)
            .first()
            .is_some_and(|&child| self.tree.is_archived(child));
        if !settled || !(depth == self.config.prune_depth || first_archived) {
            return false;
        }

        self.tree.archive(id);
        *archived += 1;
        if self.config.archive_policy == ArchivePolicy::Discard {
            self.tree.release_archive(id);
        }
        true
    }

    /// Widest rendered label per depth, archived nodes included.
    fn column_widths(&self) -> Vec<usize> {
        let mut widths = Vec::new();
        let Some(root) = self.tree.root() else {
            return widths;
        };
        let mut stack = vec![(root, 0)];
        while let Some((id, depth)) = stack.pop() {
            if widths.len() <= depth {
                widths.resize(depth + 1, 0);
            }
            let width = self.display_label(id).chars().count();
            widths[depth] = widths[depth].max(width);
            for &child in self.render_children(id) {
                stack.push((child, depth + 1));
            }
        }
        widths
    }

    fn render_children(&self, id: NodeId) -> impl Iterator<Item = &NodeId> + '_ {
        self.tree
            .children(id)
            .iter()
            .chain(self.tree.archived_children(id))
    }

    fn display_label(&self, id: NodeId) -> String {
        match self.tree.value(id) {
            Some(labels) => Joined(labels).to_string(),
            None => PENDING.to_string(),
        }
    }

    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        depth: usize,
        prefix: &str,
        connector: &str,
        widths: &[usize],
    ) -> fmt::Result {
        let label = self.display_label(id);
        if self.tree.is_archived(id) {
            let width = widths[depth];
            writeln!(f, "{prefix}{connector}{label:<width$}{ARCHIVED_TAG}")?;
        } else {
            writeln!(f, "{prefix}{connector}{label}")?;
        }

        let child_prefix = match connector {
            "" => prefix.to_string(),
            "└─ " => format!("{prefix}   "),
            _ => format!("{prefix}│  "),
        };
        let children: Vec<NodeId> = self.render_children(id).copied().collect();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let connector = if i == last { "└─ " } else { "├─ " };
            self.render(f, child, depth + 1, &child_prefix, connector, widths)?;
        }
        Ok(())
    }
}

impl fmt::Display for BracketTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.tree.root() else {
            return Ok(());
        };
        let widths = self.column_widths();
        self.render(f, root, 0, "", "", &widths)
    }
}

/// Labels joined with [`SEPARATOR`]
struct Joined<'a>(&'a [String]);

impl fmt::Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(label)?;
        }
        Ok(())
    }
}

fn validate<I, S>(labels: I) -> Result<Labels, BracketError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let labels: Labels = labels.into_iter().map(Into::into).collect();
    if labels.is_empty() {
        return Err(BracketError::EmptyReport);
    }
    let mut seen = HashSet::new();
    for label in &labels {
        if label.is_empty() {
            return Err(BracketError::EmptyLabel);
        }
        if label.contains(SEPARATOR) {
            return Err(BracketError::ReservedSeparator(label.clone()));
        }
        if label == BYE {
            return Err(BracketError::ReservedLabel(label.clone()));
        }
        if !seen.insert(label.as_str()) {
            return Err(BracketError::DuplicateLabel(label.clone()));
        }
    }
    Ok(labels)
}

#[cfg(test)]
#[path = "bracket_tests.rs"]
mod bracket_tests;
