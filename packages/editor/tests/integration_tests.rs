//! Integration tests for the footnote editor

use footnote_editor::model::{Node, NodeType, SequentialIds, Selection, ATTR_REFERENCE_NUMBER};
use footnote_editor::{
    find_footnote, footnote_list, invariants_hold, references, EditorConfig, EditorError, Pipeline,
    ScopeViolation,
};

fn editor(doc: Node) -> Pipeline {
    Pipeline::with_id_source(doc, EditorConfig::default(), Box::new(SequentialIds::new("fn"))).unwrap()
}

fn ref_ids(p: &Pipeline) -> Vec<String> {
    references(p.doc()).into_iter().filter_map(|r| r.local_id).collect()
}

fn ref_numbers(p: &Pipeline) -> Vec<String> {
    references(p.doc()).into_iter().filter_map(|r| r.number).collect()
}

fn def_ids(p: &Pipeline) -> Vec<String> {
    let list = footnote_list(p.doc()).unwrap().unwrap();
    list.footnotes()
        .filter_map(|(_, n)| n.attr("data-id").map(str::to_string))
        .collect()
}

fn def_texts(p: &Pipeline) -> Vec<String> {
    let list = footnote_list(p.doc()).unwrap().unwrap();
    list.footnotes().map(|(_, n)| n.text_content()).collect()
}

fn note(id: &str, text: &str) -> Node {
    Node::footnote(id, 0, vec![Node::paragraph(vec![Node::text(text)])])
}

/// `x[r1]y[r2]z[r3]` with footnotes "one", "two", "three"
fn three_references() -> Pipeline {
    editor(Node::doc(vec![
        Node::paragraph(vec![
            Node::text("x"),
            Node::reference("r1"),
            Node::text("y"),
            Node::reference("r2"),
            Node::text("z"),
            Node::reference("r3"),
        ]),
        Node::footnotes(vec![note("r1", "one"), note("r2", "two"), note("r3", "three")]),
    ]))
}

#[test]
fn test_loaded_document_is_repaired() {
    let p = three_references();
    assert!(invariants_hold(p.doc()));
    assert_eq!(ref_numbers(&p), vec!["1", "2", "3"]);
    assert_eq!(def_texts(&p), vec!["one", "two", "three"]);
    assert!(!p.history().can_undo());
}

#[test]
fn test_second_reference_after_first() {
    let mut p = editor(Node::doc(vec![Node::paragraph(vec![Node::text("abcdef")])]));

    p.set_selection(Selection::cursor(2)).unwrap();
    p.insert_reference().unwrap();
    // "a" [fn-1] "bcdef": position 5 lies after the first reference
    p.set_selection(Selection::cursor(5)).unwrap();
    p.insert_reference().unwrap();

    assert_eq!(ref_ids(&p), vec!["fn-1", "fn-2"]);
    assert_eq!(ref_numbers(&p), vec!["1", "2"]);
    assert_eq!(def_ids(&p), vec!["fn-1", "fn-2"]);
    assert!(invariants_hold(p.doc()));
}

#[test]
fn test_insert_before_existing_reference_renumbers() {
    let mut p = editor(Node::doc(vec![Node::paragraph(vec![Node::text("abcdef")])]));

    p.set_selection(Selection::cursor(5)).unwrap();
    p.insert_reference().unwrap();
    p.set_selection(Selection::cursor(2)).unwrap();
    p.insert_reference().unwrap();

    assert_eq!(ref_ids(&p), vec!["fn-2", "fn-1"]);
    assert_eq!(ref_numbers(&p), vec!["1", "2"]);
    assert_eq!(def_ids(&p), vec!["fn-2", "fn-1"]);
}

#[test]
fn test_delete_first_reference_renumbers_and_undo_restores() {
    let mut p = three_references();
    let before = p.doc().clone();

    p.set_selection(Selection::text(2, 3)).unwrap();
    let result = p.delete_selection().unwrap();
    assert_eq!(result.compensated, 1);
    assert!(result.reconciled.is_some());

    assert_eq!(ref_ids(&p), vec!["r2", "r3"]);
    assert_eq!(ref_numbers(&p), vec!["1", "2"]);
    assert_eq!(def_ids(&p), vec!["r2", "r3"]);
    assert_eq!(def_texts(&p), vec!["two", "three"]);
    assert!(invariants_hold(p.doc()));

    // One undo level holds the deletion, the footnote removal and renumbering
    assert_eq!(p.history().undo_levels(), 1);
    assert!(p.undo().unwrap());
    assert_eq!(p.doc(), &before);

    assert!(p.redo().unwrap());
    assert_eq!(def_texts(&p), vec!["two", "three"]);
}

#[test]
fn test_selection_across_body_and_list_is_rejected() {
    let mut p = three_references();
    let before = p.state().clone();

    let err = p.set_selection(Selection::text(2, 12)).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Rejected(ScopeViolation::SpansContentAndFootnotes { .. })
    ));
    assert_eq!(p.state(), &before);
}

#[test]
fn test_selection_across_two_footnotes_is_rejected() {
    let mut p = three_references();
    // footnote r1 spans 9..16, r2 spans 16..23
    let err = p.set_selection(Selection::text(11, 18)).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Rejected(ScopeViolation::SpansMultipleFootnotes { count: 2, .. })
    ));
}

#[test]
fn test_paste_regenerates_colliding_ids() {
    let mut p = editor(Node::doc(vec![
        Node::paragraph(vec![Node::text("ab"), Node::reference("X")]),
        Node::footnotes(vec![note("X", "existing")]),
    ]));

    p.set_selection(Selection::cursor(1)).unwrap();
    p.paste(&[Node::text("c"), Node::reference("X"), Node::reference("Y")])
        .unwrap();

    let ids = ref_ids(&p);
    assert_eq!(ids.len(), 3);
    let pasted = &ids[..2];
    for id in pasted {
        assert_ne!(id, "X");
        assert_ne!(id, "Y");
    }
    assert_ne!(pasted[0], pasted[1]);
    assert_eq!(ids[2], "X");

    assert!(invariants_hold(p.doc()));
    assert_eq!(def_texts(&p), vec!["", "", "existing"]);
}

#[test]
fn test_move_keeps_definition() {
    let mut p = editor(Node::doc(vec![
        Node::paragraph(vec![
            Node::text("ab"),
            Node::reference("r1"),
            Node::text("cd"),
            Node::reference("r2"),
        ]),
        Node::footnotes(vec![note("r1", "one"), note("r2", "two")]),
    ]));

    // Drag r1 (at 3) behind r2: delete it, then insert it at the new spot
    let moved = p.doc().node_at(3).unwrap().clone();
    let mut tr = p.transaction();
    tr.delete(3, 4).unwrap();
    tr.insert(6, vec![moved]).unwrap();
    let result = p.dispatch(tr).unwrap();

    assert_eq!(result.compensated, 0);
    assert_eq!(ref_ids(&p), vec!["r2", "r1"]);
    assert_eq!(def_ids(&p), vec!["r2", "r1"]);
    assert_eq!(def_texts(&p), vec!["two", "one"]);
    let r1 = p.doc().node_at(6).unwrap();
    assert_eq!(r1.attr(ATTR_REFERENCE_NUMBER), Some("2"));
}

#[test]
fn test_typed_token_becomes_reference() {
    let mut p = editor(Node::doc(vec![Node::paragraph(vec![Node::text("Hello")])]));
    p.set_selection(Selection::cursor(6)).unwrap();

    p.insert_text(" world[^1]").unwrap();
    let paragraph = p.doc().child(0).unwrap();
    assert_eq!(paragraph.text_content(), "Hello world");
    assert_eq!(
        paragraph.last_child().map(Node::node_type),
        Some(NodeType::FootnoteReference)
    );
    assert_eq!(def_ids(&p), vec!["fn-1"]);

    // Typing, conversion and the new footnote undo as one unit
    p.undo().unwrap();
    assert_eq!(p.doc().child(0).unwrap().text_content(), "Hello");
    assert!(references(p.doc()).is_empty());
    assert!(def_ids(&p).is_empty());
}

#[test]
fn test_input_rules_can_be_disabled() {
    let config = EditorConfig {
        input_rules: false,
        ..EditorConfig::default()
    };
    let doc = Node::doc(vec![Node::paragraph(vec![])]);
    let mut p = Pipeline::with_id_source(doc, config, Box::new(SequentialIds::new("fn"))).unwrap();
    p.insert_text("[^1]").unwrap();
    assert!(references(p.doc()).is_empty());
}

#[test]
fn test_focus_definition_moves_cursor_into_footnote() {
    let mut p = three_references();
    p.focus_definition("r2").unwrap();

    let (pos, note) = find_footnote(p.doc(), "r2").unwrap();
    // end of "two" inside the footnote's only paragraph
    assert_eq!(p.selection(), Selection::cursor(pos + note.node_size() - 2));
    assert_eq!(p.selection(), Selection::cursor(21));
}

#[test]
fn test_insert_reference_needs_inline_anchor() {
    let mut p = three_references();
    p.select_all().unwrap();
    assert_eq!(p.insert_reference(), Err(EditorError::InvalidSelection(0)));
}

#[test]
fn test_resynchronize_with_new_reference() {
    let mut p = editor(Node::doc(vec![Node::paragraph(vec![Node::text("ab")])]));
    p.set_selection(Selection::cursor(2)).unwrap();

    let report = p.resynchronize(true).unwrap();
    assert_eq!(report.inserted, Some(2));
    assert_eq!(report.created.len(), 1);
    assert!(invariants_hold(p.doc()));

    let again = p.resynchronize(false).unwrap();
    assert!(again.is_noop());
}

#[test]
fn test_delete_everything() {
    let mut p = three_references();
    let before = p.doc().clone();
    p.select_all().unwrap();
    p.delete_selection().unwrap();

    assert_eq!(
        p.doc(),
        &Node::doc(vec![Node::paragraph(vec![]), Node::footnotes(vec![])])
    );
    assert!(invariants_hold(p.doc()));

    p.undo().unwrap();
    assert_eq!(p.doc(), &before);
}

#[test]
fn test_removed_footnote_is_recreated_empty() {
    let mut p = three_references();
    let (pos, note) = find_footnote(p.doc(), "r2").unwrap();
    let end = pos + note.node_size();

    let mut tr = p.transaction();
    tr.delete(pos, end).unwrap();
    p.dispatch(tr).unwrap();

    assert_eq!(def_ids(&p), vec!["r1", "r2", "r3"]);
    assert_eq!(def_texts(&p), vec!["one", "", "three"]);
}

#[test]
fn test_batch_undoes_together() {
    let mut p = editor(Node::doc(vec![Node::paragraph(vec![Node::text("abc")])]));
    p.begin_batch(Some("two notes"));
    p.set_selection(Selection::cursor(2)).unwrap();
    p.insert_reference().unwrap();
    p.set_selection(Selection::cursor(4)).unwrap();
    p.insert_reference().unwrap();
    p.end_batch();

    assert_eq!(p.history().undo_levels(), 1);
    assert_eq!(p.history().undo_description(), Some("two notes"));
    p.undo().unwrap();
    assert!(references(p.doc()).is_empty());
}

#[test]
fn test_drag_into_cited_footnote_settles() {
    // <p>x[R1]</p> 0..4, list 4..16: R1 5..10 citing R2 at 7, R2 10..15
    let mut p = editor(Node::doc(vec![
        Node::paragraph(vec![Node::text("x"), Node::reference("R1")]),
        Node::footnotes(vec![
            Node::footnote("R1", 1, vec![Node::paragraph(vec![Node::reference("R2")])]),
            note("R2", "y"),
        ]),
    ]));
    let before = p.doc().clone();
    assert_eq!(ref_ids(&p), vec!["R1", "R2"]);

    // Drag R1 behind the "y" in R2's footnote, closing a citation loop
    let moved = p.doc().node_at(2).unwrap().clone();
    let mut tr = p.transaction();
    tr.delete(2, 3).unwrap();
    tr.insert(12, vec![moved]).unwrap();
    p.dispatch(tr).unwrap();

    assert!(invariants_hold(p.doc()));
    assert!(ref_ids(&p).is_empty());
    assert!(def_ids(&p).is_empty());
    assert_eq!(p.history().undo_levels(), 1);

    p.undo().unwrap();
    assert_eq!(p.doc(), &before);
}

#[test]
fn test_delete_across_paragraphs_removes_footnote() {
    // <p>ab[r1]c</p> 0..6, <p>de[r2]</p> 6..11
    let mut p = editor(Node::doc(vec![
        Node::paragraph(vec![Node::text("ab"), Node::reference("r1"), Node::text("c")]),
        Node::paragraph(vec![Node::text("de"), Node::reference("r2")]),
        Node::footnotes(vec![note("r1", "one"), note("r2", "two")]),
    ]));
    let before = p.doc().clone();

    p.set_selection(Selection::text(2, 8)).unwrap();
    p.delete_selection().unwrap();

    assert_eq!(p.doc().child(0).unwrap().text_content(), "ae");
    assert_eq!(ref_ids(&p), vec!["r2"]);
    assert_eq!(ref_numbers(&p), vec!["1"]);
    assert_eq!(def_texts(&p), vec!["two"]);
    assert!(invariants_hold(p.doc()));
    assert_eq!(p.history().undo_levels(), 1);

    p.undo().unwrap();
    assert_eq!(p.doc(), &before);
}

#[test]
fn test_typing_over_everything() {
    let mut p = three_references();
    let before = p.doc().clone();
    p.select_all().unwrap();
    p.insert_text("x").unwrap();

    assert_eq!(
        p.doc(),
        &Node::doc(vec![Node::paragraph(vec![Node::text("x")]), Node::footnotes(vec![])])
    );
    assert!(invariants_hold(p.doc()));

    p.undo().unwrap();
    assert_eq!(p.doc(), &before);
}

#[test]
fn test_paste_over_everything() {
    let mut p = three_references();
    p.select_all().unwrap();
    p.paste(&[Node::text("a"), Node::reference("r1")]).unwrap();

    assert_eq!(p.doc().child(0).unwrap().text_content(), "a");
    assert_eq!(ref_numbers(&p), vec!["1"]);
    assert_eq!(def_texts(&p), vec![""]);
    assert!(invariants_hold(p.doc()));
}
