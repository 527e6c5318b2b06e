//! Tree manager behaviour through the public API

use std::collections::HashSet;

use rstest::{fixture, rstest};

use mindmap::domain::{DomainError, MindMap, NodeId, MAX_DEPTH};
use mindmap::util::testing;

#[fixture]
fn empty() -> MindMap {
    testing::init_test_setup();
    MindMap::new("test")
}

/// Card A with child C, card B; returns (map, a, b, c).
#[fixture]
fn two_cards(mut empty: MindMap) -> (MindMap, NodeId, NodeId, NodeId) {
    let a = empty.add_node("A", None).unwrap();
    let b = empty.add_node("B", None).unwrap();
    let c = empty.add_node("C", Some(&a)).unwrap();
    (empty, a, b, c)
}

fn texts(nodes: &[&mindmap::domain::Node]) -> Vec<String> {
    nodes.iter().map(|n| n.text.clone()).collect()
}

#[rstest]
fn given_card_with_two_children_when_listing_then_returns_them_in_order(mut empty: MindMap) {
    let root = empty.add_node("Shopping List", None).unwrap();
    empty.add_node("Groceries", Some(&root)).unwrap();
    empty.add_node("Hardware", Some(&root)).unwrap();

    let children = empty.list_children(Some(&root)).unwrap();

    assert_eq!(texts(&children), vec!["Groceries", "Hardware"]);
    assert!(children.iter().all(|c| c.parent_id == Some(root)));
}

#[rstest]
fn given_no_parent_when_listing_then_returns_cards(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (map, ..) = two_cards;
    assert_eq!(texts(&map.list_children(None).unwrap()), vec!["A", "B"]);
}

#[rstest]
fn given_depth_two_node_when_adding_below_then_depth_exceeded(mut empty: MindMap) {
    let root = empty.add_node("Root", None).unwrap();
    let child = empty.add_node("Child", Some(&root)).unwrap();
    let grandchild = empty.add_node("Grandchild", Some(&child)).unwrap();
    assert_eq!(empty.depth(&grandchild).unwrap(), MAX_DEPTH);

    let result = empty.add_node("Too deep", Some(&grandchild));

    assert!(matches!(result, Err(DomainError::DepthExceeded { depth: 3, .. })));
    assert_eq!(empty.len(), 3);
}

#[rstest]
fn given_child_of_a_when_moving_to_b_then_links_follow(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (mut map, a, b, c) = two_cards;

    map.move_node(&c, &b).unwrap();

    assert!(map.node(&a).unwrap().children.is_empty());
    assert_eq!(map.node(&b).unwrap().children, vec![c]);
    assert_eq!(map.node(&c).unwrap().parent_id, Some(b));
}

#[rstest]
fn given_cards_and_other_when_finding_card_then_matches_case_insensitively(mut empty: MindMap) {
    let one = empty.add_node("Card1", None).unwrap();
    let two = empty.add_node("Card2", None).unwrap();
    empty.add_node("other", Some(&one)).unwrap();

    let found: Vec<NodeId> = empty.find_text("card").map(|n| n.id()).collect();

    assert_eq!(found, vec![one, two]);
}

#[rstest]
fn given_node_when_moving_under_itself_then_self_parent(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (mut map, a, ..) = two_cards;
    assert_eq!(map.move_node(&a, &a), Err(DomainError::SelfParent(a)));
}

#[rstest]
fn given_descendant_target_when_moving_then_cycle(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (mut map, a, _, c) = two_cards;
    let before = map.to_document();

    let result = map.move_node(&a, &c);

    assert_eq!(result, Err(DomainError::Cycle { node: a, new_parent: c }));
    assert_eq!(map.to_document(), before);
}

#[rstest]
fn given_current_parent_when_moving_then_validation(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (mut map, a, _, c) = two_cards;

    let result = map.move_node(&c, &a);

    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert_eq!(map.node(&a).unwrap().children, vec![c]);
}

#[rstest]
fn given_card_with_child_when_moving_under_other_card_then_fits(
    two_cards: (MindMap, NodeId, NodeId, NodeId),
) {
    let (mut map, a, b, c) = two_cards;

    map.move_node(&a, &b).unwrap();

    assert_eq!(map.roots(), &[b]);
    assert_eq!(map.depth(&c).unwrap(), 2);
}

#[rstest]
fn given_card_with_grandchild_when_moving_under_card_then_depth_exceeded(mut empty: MindMap) {
    let a = empty.add_node("A", None).unwrap();
    let child = empty.add_node("child", Some(&a)).unwrap();
    empty.add_node("grandchild", Some(&child)).unwrap();
    let b = empty.add_node("B", None).unwrap();

    let result = empty.move_node(&a, &b);

    assert!(matches!(result, Err(DomainError::DepthExceeded { .. })));
    assert_eq!(empty.roots(), &[a, b]);
}

#[rstest]
fn given_subtree_when_deleting_then_removes_exactly_descendants(mut empty: MindMap) {
    let keep = empty.add_node("keep", None).unwrap();
    let root = empty.add_node("root", None).unwrap();
    let child = empty.add_node("child", Some(&root)).unwrap();
    let grandchild = empty.add_node("grandchild", Some(&child)).unwrap();
    let sibling = empty.add_node("sibling", Some(&root)).unwrap();

    let removed: HashSet<NodeId> = empty.delete_node(&child, false).unwrap().into_iter().collect();

    assert_eq!(removed, HashSet::from([child, grandchild]));
    assert!(!empty.contains(&child) && !empty.contains(&grandchild));
    assert_eq!(empty.node(&root).unwrap().children, vec![sibling]);
    for (_, node) in empty.iter() {
        for c in &node.children {
            assert!(empty.contains(c), "dangling child {c}");
        }
    }
    assert!(empty.contains(&keep));
}

#[rstest]
fn given_card_when_deleting_unconfirmed_then_requires_confirmation(
    two_cards: (MindMap, NodeId, NodeId, NodeId),
) {
    let (mut map, a, _, c) = two_cards;

    let preview = map.delete_preview(&a).unwrap();
    assert!(preview.requires_confirmation);
    assert_eq!(preview.ids, vec![a, c]);

    let result = map.delete_node(&a, false);
    assert!(matches!(result, Err(DomainError::ConfirmationRequired { count: 2, .. })));
    assert!(map.contains(&a));

    map.delete_node(&a, true).unwrap();
    assert!(!map.contains(&a) && !map.contains(&c));
}

#[rstest]
#[case("")]
#[case("   ")]
fn given_blank_text_when_adding_or_editing_then_validation(mut empty: MindMap, #[case] text: &str) {
    let id = empty.add_node("ok", None).unwrap();
    assert!(matches!(empty.add_node(text, None), Err(DomainError::Validation(_))));
    assert!(matches!(empty.edit_node(&id, text), Err(DomainError::Validation(_))));
    assert_eq!(empty.node(&id).unwrap().text, "ok");
}

#[rstest]
fn given_unknown_id_when_operating_then_not_found(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (mut map, a, ..) = two_cards;
    let ghost = NodeId::new();

    assert_eq!(map.add_node("x", Some(&ghost)), Err(DomainError::NotFound(ghost)));
    assert_eq!(map.edit_node(&ghost, "x"), Err(DomainError::NotFound(ghost)));
    assert_eq!(map.edit_node(&ghost, ""), Err(DomainError::NotFound(ghost)));
    assert_eq!(map.move_node(&ghost, &a), Err(DomainError::NotFound(ghost)));
    assert_eq!(map.move_node(&a, &ghost), Err(DomainError::NotFound(ghost)));
    assert_eq!(map.delete_node(&ghost, true), Err(DomainError::NotFound(ghost)));
    assert!(map.list_children(Some(&ghost)).is_err());
}

#[rstest]
fn given_map_when_walking_then_every_depth_within_limit(two_cards: (MindMap, NodeId, NodeId, NodeId)) {
    let (mut map, _, b, c) = two_cards;
    map.add_node("D", Some(&c)).unwrap();
    map.add_node("E", Some(&b)).unwrap();

    for (depth, node) in map.iter() {
        assert!(depth <= MAX_DEPTH);
        assert_eq!(map.depth(&node.id()).unwrap(), depth);
    }
    let order: Vec<&str> = map.iter().map(|(_, n)| n.text.as_str()).collect();
    assert_eq!(order, vec!["A", "C", "D", "B", "E"]);
}

#[rstest]
fn given_map_when_document_round_trips_then_structure_is_identical(
    two_cards: (MindMap, NodeId, NodeId, NodeId),
) {
    let (mut map, _, b, c) = two_cards;
    map.add_node("deep", Some(&c)).unwrap();
    map.add_node("under b", Some(&b)).unwrap();

    let restored = MindMap::from_document(map.to_document()).unwrap();

    assert_eq!(restored.to_document(), map.to_document());
    assert_eq!(restored.roots(), map.roots());
}

#[rstest]
fn given_map_when_exporting_then_cards_are_marked_and_separated(mut empty: MindMap) {
    let trip = empty.add_node("Trip", None).unwrap();
    empty.add_node("Tickets", Some(&trip)).unwrap();
    empty.add_node("Books", None).unwrap();

    let text = empty.export_text().unwrap();

    assert_eq!(text.matches("[CARD]").count(), 2);
    assert_eq!(text.matches(mindmap::domain::CARD_SEPARATOR).count(), 2);
    assert!(text.contains("Tickets (ID: "));
}

#[rstest]
fn given_subtree_when_rendering_then_draws_only_that_subtree(
    two_cards: (MindMap, NodeId, NodeId, NodeId),
) {
    let (map, a, _, c) = two_cards;

    let trees = map.render_tree(Some(&a)).unwrap();

    assert_eq!(trees.len(), 1);
    assert_eq!(
        trees[0].to_string(),
        format!("A (ID: {a})\n└── C (ID: {c})\n")
    );
    assert_eq!(map.render_tree(None).unwrap().len(), 2);
}
