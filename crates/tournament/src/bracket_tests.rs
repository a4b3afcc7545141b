use super::*;

fn bracket(branching: usize) -> BracketTree {
    BracketTree::new(BracketConfig::new(branching)).unwrap()
}

fn push_all(bracket: &mut BracketTree, reports: &[&str]) {
    for report in reports {
        bracket.push([*report]).unwrap();
    }
}

fn labels_of(bracket: &BracketTree, id: NodeId) -> Vec<&str> {
    bracket
        .labels(id)
        .map(|labels| labels.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn test_rejects_tiny_branching_factor() {
    let err = BracketTree::new(BracketConfig::new(1)).unwrap_err();
    assert_eq!(err, BracketError::Tree(TreeError::BranchingFactor(1)));
}

#[test]
fn test_first_report_is_root() {
    let mut bracket = bracket(4);
    let id = bracket.push(["A"]).unwrap();

    assert_eq!(bracket.root(), Some(id));
    assert_eq!(bracket.winner(), Some(&["A".to_string()][..]));
    assert_eq!(bracket.node_count(), 1);
}

#[test]
fn test_majority_promotes_label() {
    let mut bracket = bracket(4);
    push_all(&mut bracket, &["A", "B", "A"]);

    // A=2, B=1 with one open slot: B could still tie
    let root = bracket.root().unwrap();
    assert_eq!(bracket.labels(root), None);

    bracket.push(["A"]).unwrap();
    assert_eq!(labels_of(&bracket, root), vec!["A"]);
    assert_eq!(bracket.children(root).len(), 4);
    assert_eq!(bracket.node_count(), 5);
}

#[test]
fn test_full_slot_without_leader_forwards_tie() {
    let mut bracket = bracket(4);
    push_all(&mut bracket, &["A", "B", "C", "D"]);

    let root = bracket.root().unwrap();
    assert_eq!(labels_of(&bracket, root), vec!["A", "B", "C", "D"]);
}

#[test]
fn test_early_decision_fills_byes() {
    let mut bracket = bracket(4);
    push_all(&mut bracket, &["A", "A"]);
    let root = bracket.root().unwrap();
    assert_eq!(bracket.labels(root), None);

    bracket.push(["A"]).unwrap();
    assert_eq!(labels_of(&bracket, root), vec!["A"]);

    let children = bracket.children(root);
    assert_eq!(children.len(), 4);
    assert_eq!(labels_of(&bracket, children[3]), vec![BYE]);
}

#[test]
fn test_decision_climbs_levels() {
    let mut bracket = bracket(2);
    push_all(&mut bracket, &["A", "B"]);
    let first_slot = bracket.root().unwrap();

    let leaf = bracket.push(["A"]).unwrap();
    let second_slot = bracket.parent(leaf).unwrap();
    assert_ne!(second_slot, first_slot);
    assert_eq!(bracket.labels(second_slot), None);

    bracket.push(["A"]).unwrap();
    assert_eq!(labels_of(&bracket, second_slot), vec!["A"]);
    // A|B and A above: A leads 2 to 1
    assert_eq!(bracket.winner(), Some(&["A".to_string()][..]));
    assert_eq!(bracket.height(), 3);
}

#[test]
fn test_split_weighting_breaks_tie_forwarding() {
    let reports = ["A", "B", "C", "C"];

    let mut plain = bracket(2);
    push_all(&mut plain, &reports);
    let root = plain.root().unwrap();
    assert_eq!(labels_of(&plain, root), vec!["A", "B", "C"]);

    let config = BracketConfig::new(2).with_weighting(WeightingKind::Split.strategy());
    let mut split = BracketTree::new(config).unwrap();
    push_all(&mut split, &reports);
    let root = split.root().unwrap();
    assert_eq!(labels_of(&split, root), vec!["C"]);
}

#[test]
fn test_tied_report_is_accepted() {
    let mut bracket = bracket(2);
    let id = bracket.push(["A", "B"]).unwrap();
    assert_eq!(labels_of(&bracket, id), vec!["A", "B"]);
}

#[test]
fn test_invalid_reports_leave_bracket_unchanged() {
    let mut bracket = bracket(4);
    push_all(&mut bracket, &["A", "B"]);
    let count = bracket.node_count();
    let rendered = bracket.to_string();

    assert_eq!(
        bracket.push(["A|B"]),
        Err(BracketError::ReservedSeparator("A|B".to_string()))
    );
    assert_eq!(
        bracket.push(Vec::<String>::new()),
        Err(BracketError::EmptyReport)
    );
    assert_eq!(bracket.push(["A", ""]), Err(BracketError::EmptyLabel));
    assert_eq!(
        bracket.push([BYE]),
        Err(BracketError::ReservedLabel(BYE.to_string()))
    );
    assert_eq!(
        bracket.push(["A", "A"]),
        Err(BracketError::DuplicateLabel("A".to_string()))
    );

    assert_eq!(bracket.node_count(), count);
    assert_eq!(bracket.to_string(), rendered);
}

#[test]
fn test_fan_out_never_exceeds_branching_factor() {
    let mut bracket = bracket(3);
    let reports = ["A", "B", "C", "A", "A", "B", "C", "C", "B", "A", "D", "D", "A", "B"];
    push_all(&mut bracket, &reports);

    let mut stack = vec![bracket.root().unwrap()];
    while let Some(id) = stack.pop() {
        assert!(bracket.children(id).len() <= 3);
        stack.extend_from_slice(bracket.children(id));
    }
}

fn pruned(policy: ArchivePolicy) -> BracketTree {
    let config = BracketConfig::new(2)
        .with_prune_depth(1)
        .with_archive_policy(policy);
    let mut bracket = BracketTree::new(config).unwrap();
    push_all(&mut bracket, &["A", "B", "C"]);
    bracket
}

#[test]
fn test_prune_archives_settled_region() {
    let bracket = pruned(ArchivePolicy::Retain);
    let root = bracket.root().unwrap();
    let settled = bracket.children(root)[0];

    assert!(bracket.is_archived(settled));
    assert!(bracket.children(settled).is_empty());
    assert_eq!(bracket.archived_children(settled).len(), 2);
    assert_eq!(labels_of(&bracket, settled), vec!["A", "B"]);

    // Nothing is dropped, only hidden from insertion
    assert_eq!(bracket.node_count(), 6);
    assert_eq!(bracket.active_count(), 4);
    assert_eq!(bracket.height(), 3);
}

#[test]
fn test_prune_is_idempotent() {
    let mut bracket = pruned(ArchivePolicy::Retain);
    let active = bracket.active_count();
    let rendered = bracket.to_string();

    assert_eq!(bracket.prune(), 0);
    assert_eq!(bracket.prune(), 0);
    assert_eq!(bracket.active_count(), active);
    assert_eq!(bracket.to_string(), rendered);
}

#[test]
fn test_discard_policy_releases_archive() {
    let bracket = pruned(ArchivePolicy::Discard);
    let root = bracket.root().unwrap();
    let settled = bracket.children(root)[0];

    assert!(bracket.is_archived(settled));
    assert!(bracket.archived_children(settled).is_empty());
    assert_eq!(labels_of(&bracket, settled), vec!["A", "B"]);
    assert_eq!(bracket.node_count(), 4);
    assert_eq!(bracket.active_count(), 4);
}

#[test]
fn test_discarded_ids_do_not_alias_new_nodes() {
    let config = BracketConfig::new(2)
        .with_prune_depth(1)
        .with_archive_policy(ArchivePolicy::Discard);
    let mut bracket = BracketTree::new(config).unwrap();
    let reports = ["A", "B", "C", "D", "E"];
    let ids: Vec<NodeId> = reports
        .iter()
        .map(|report| bracket.push([*report]).unwrap())
        .collect();

    let distinct: HashSet<NodeId> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), ids.len());

    // A..D were released by prune passes, and their slots reused since
    for &id in &ids[..4] {
        assert!(!bracket.contains(id));
        assert_eq!(bracket.labels(id), None);
        assert_eq!(bracket.parent(id), None);
        assert!(bracket.children(id).is_empty());
        assert!(!bracket.is_archived(id));
    }
    assert!(bracket.contains(ids[4]));
    assert_eq!(labels_of(&bracket, ids[4]), vec!["E"]);
}

#[test]
fn test_render_tie() {
    let mut bracket = bracket(2);
    push_all(&mut bracket, &["A", "B"]);
    assert_eq!(bracket.to_string(), "A|B\n├─ A\n└─ B\n");
}

#[test]
fn test_render_marks_archived_nodes() {
    let bracket = pruned(ArchivePolicy::Retain);
    let expected = "\
?
├─ A|B ▪
│  ├─ A ▪
│  └─ B ▪
└─ ?
   └─ C
";
    assert_eq!(bracket.to_string(), expected);
}

#[test]
fn test_render_empty_and_deterministic() {
    let mut bracket = bracket(3);
    assert_eq!(bracket.to_string(), "");

    push_all(&mut bracket, &["Ann", "Bo", "Ann", "Christopher"]);
    assert_eq!(bracket.to_string(), bracket.to_string());
    assert!(bracket.to_string().contains("Christopher"));
}
