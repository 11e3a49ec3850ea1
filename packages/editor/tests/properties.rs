//! Property tests: random edit sessions keep footnotes consistent

use footnote_editor::model::{Node, NodeType, SequentialIds, Selection, Transaction};
use footnote_editor::{
    check_invariants, find_footnote, reconcile, references, EditorConfig, EditorError, Pipeline,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Action {
    Insert(usize),
    InsertInFootnote(usize),
    Type(usize, String),
    Delete(usize, usize),
    DeleteInFootnote(usize, usize, usize),
    Move(usize, usize),
    Paste(usize),
    Undo,
    Redo,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => any::<usize>().prop_map(Action::Insert),
        1 => any::<usize>().prop_map(Action::InsertInFootnote),
        2 => (any::<usize>(), "[a-c\\[\\]^]{1,4}").prop_map(|(pos, text)| Action::Type(pos, text)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Action::Delete(a, b)),
        1 => (any::<usize>(), any::<usize>(), any::<usize>())
            .prop_map(|(note, a, b)| Action::DeleteInFootnote(note, a, b)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Action::Move(a, b)),
        1 => any::<usize>().prop_map(Action::Paste),
        1 => Just(Action::Undo),
        1 => Just(Action::Redo),
    ]
}

fn editor(paragraphs: &[&str]) -> Pipeline {
    let content = paragraphs
        .iter()
        .map(|text| Node::paragraph(vec![Node::text(*text)]))
        .collect();
    Pipeline::with_id_source(Node::doc(content), EditorConfig::default(), Box::new(SequentialIds::new("p")))
        .unwrap()
}

/// Start of the footnote list, or the end of the document without one
fn list_start(doc: &Node) -> usize {
    let mut pos = 0;
    for child in doc.content() {
        if child.is(NodeType::Footnotes) {
            break;
        }
        pos += child.node_size();
    }
    pos
}

/// Content ranges of every textblock, in document order
fn textblocks(doc: &Node) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    doc.nodes_between(0, doc.content_size(), &mut |node, pos, _| {
        if node.node_type().is_textblock() {
            blocks.push((pos + 1, pos + 1 + node.content_size()));
        }
        true
    });
    blocks
}

/// A position inside one of `blocks`, chosen by `seed`
fn pos_in(blocks: &[(usize, usize)], seed: usize) -> Option<usize> {
    if blocks.is_empty() {
        return None;
    }
    let (start, end) = blocks[seed % blocks.len()];
    Some(start + (seed / blocks.len()) % (end - start + 1))
}

fn body_blocks(doc: &Node) -> Vec<(usize, usize)> {
    let end = list_start(doc);
    textblocks(doc).into_iter().filter(|(start, _)| *start < end).collect()
}

fn footnote_blocks(doc: &Node) -> Vec<(usize, usize)> {
    let end = list_start(doc);
    textblocks(doc).into_iter().filter(|(start, _)| *start > end).collect()
}

/// A position inside some body paragraph
fn body_pos(doc: &Node, seed: usize) -> usize {
    pos_in(&body_blocks(doc), seed).unwrap_or(1)
}

/// Positions of references in the body
fn body_references(doc: &Node) -> Vec<usize> {
    let end = list_start(doc);
    references(doc)
        .into_iter()
        .map(|r| r.pos)
        .filter(|pos| *pos < end)
        .collect()
}

fn footnote_text(doc: &Node, id: &str) -> Option<String> {
    find_footnote(doc, id).map(|(_, note)| note.text_content())
}

/// Delete `from..to`, checking that the edit and its footnote cleanup undo
/// and redo as one unit
fn delete_range(p: &mut Pipeline, from: usize, to: usize) -> Result<(), EditorError> {
    p.set_selection(Selection::text(from, to))?;
    let selected = p.doc().clone();
    p.delete_selection()?;
    if p.doc() != &selected {
        let deleted = p.doc().clone();
        assert!(p.undo().unwrap());
        assert_eq!(p.doc(), &selected);
        assert!(p.redo().unwrap());
        assert_eq!(p.doc(), &deleted);
    }
    Ok(())
}

fn perform(p: &mut Pipeline, action: &Action) {
    // Failures are allowed (vetoes, invalid anchors); they must not change state
    let before = p.state().clone();
    let result = match action {
        Action::Insert(seed) => {
            let pos = body_pos(p.doc(), *seed);
            p.set_selection(Selection::cursor(pos))
                .and_then(|_| p.insert_reference())
                .map(drop)
        }
        Action::InsertInFootnote(seed) => {
            let ids: Vec<String> = references(p.doc()).into_iter().filter_map(|r| r.local_id).collect();
            if ids.is_empty() {
                return;
            }
            let id = ids[seed % ids.len()].clone();
            p.focus_definition(&id).and_then(|_| p.insert_reference()).map(drop)
        }
        Action::Type(seed, text) => {
            let pos = body_pos(p.doc(), *seed);
            p.set_selection(Selection::cursor(pos))
                .and_then(|_| p.insert_text(text))
                .map(drop)
        }
        Action::Delete(a, b) => {
            // Ends may fall in different paragraphs
            let (x, y) = (body_pos(p.doc(), *a), body_pos(p.doc(), *b));
            delete_range(p, x.min(y), x.max(y))
        }
        Action::DeleteInFootnote(note, a, b) => {
            let blocks = footnote_blocks(p.doc());
            if blocks.is_empty() {
                return;
            }
            let block = [blocks[note % blocks.len()]];
            let (Some(x), Some(y)) = (pos_in(&block, *a), pos_in(&block, *b)) else {
                return;
            };
            delete_range(p, x.min(y), x.max(y))
        }
        Action::Move(which, target) => {
            let refs = body_references(p.doc());
            if refs.is_empty() {
                return;
            }
            let pos = refs[which % refs.len()];
            let Some(node) = p.doc().node_at(pos).cloned() else {
                return;
            };
            let id = node.attr("data-id").unwrap_or_default().to_string();
            let content_before = footnote_text(p.doc(), &id);

            let mut tr: Transaction = p.transaction();
            tr.delete(pos, pos + 1).unwrap();
            // The drop target may be inside a footnote
            let Some(to) = pos_in(&textblocks(tr.doc()), *target) else {
                return;
            };
            let into_body = to < list_start(tr.doc());
            tr.insert(to, vec![node]).unwrap();
            let result = p.dispatch(tr).map(drop);
            if result.is_ok() && into_body {
                assert_eq!(footnote_text(p.doc(), &id), content_before);
            }
            result
        }
        Action::Paste(seed) => {
            let pos = body_pos(p.doc(), *seed);
            let existing: Vec<Node> = references(p.doc())
                .into_iter()
                .filter_map(|r| r.local_id)
                .take(2)
                .map(Node::reference)
                .collect();
            let mut content = vec![Node::text("q")];
            content.extend(existing);
            p.set_selection(Selection::cursor(pos))
                .and_then(|_| p.paste(&content))
                .map(drop)
        }
        Action::Undo => p.undo().map(drop),
        Action::Redo => p.redo().map(drop),
    };
    if result.is_err() {
        assert_eq!(p.state().doc(), before.doc());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_edit_cycles_keep_invariants(actions in prop::collection::vec(action(), 1..24)) {
        let mut p = editor(&["lorem ipsum", "dolor", "sit amet"]);
        for action in &actions {
            perform(&mut p, action);
            let violations = check_invariants(p.doc());
            prop_assert!(violations.is_empty(), "{:?} after {:?}", violations, action);

            // A second pass over a settled document changes nothing
            let mut tr = p.transaction();
            let report = reconcile(&mut tr, None, &mut SequentialIds::new("z")).unwrap();
            prop_assert!(!tr.doc_changed());
            prop_assert!(report.is_noop());
        }
    }

    #[test]
    fn prop_drags_into_footnotes_settle(
        moves in prop::collection::vec((any::<usize>(), any::<usize>()), 1..8)
    ) {
        let mut p = editor(&["ab", "cd"]);
        for pos in [2, 6] {
            p.set_selection(Selection::cursor(pos)).unwrap();
            p.insert_reference().unwrap();
        }
        p.focus_definition("p-1").unwrap();
        p.insert_reference().unwrap();

        for (which, target) in &moves {
            perform(&mut p, &Action::Move(*which, *target));
            prop_assert!(check_invariants(p.doc()).is_empty());
        }
    }

    #[test]
    fn prop_insertion_order_does_not_matter(
        offsets in prop::sample::subsequence((0..10usize).collect::<Vec<_>>(), 1..6)
            .prop_shuffle()
    ) {
        let mut p = editor(&["abcdefghij"]);
        for offset in &offsets {
            let pos = position_before_char(p.doc(), *offset);
            p.set_selection(Selection::cursor(pos)).unwrap();
            p.insert_reference().unwrap();
        }

        // The k-th insertion received id p-(k+1); document order follows offsets
        let mut expected: Vec<(usize, String)> = offsets
            .iter()
            .enumerate()
            .map(|(k, offset)| (*offset, format!("p-{}", k + 1)))
            .collect();
        expected.sort();
        let expected: Vec<String> = expected.into_iter().map(|(_, id)| id).collect();

        let refs = references(p.doc());
        let ids: Vec<String> = refs.iter().filter_map(|r| r.local_id.clone()).collect();
        let numbers: Vec<String> = refs.iter().filter_map(|r| r.number.clone()).collect();
        prop_assert_eq!(&ids, &expected);
        prop_assert_eq!(numbers, (1..=offsets.len()).map(|n| n.to_string()).collect::<Vec<_>>());
        prop_assert!(check_invariants(p.doc()).is_empty());
    }
}

/// Position just before the `index`-th character of the body text,
/// skipping over references
fn position_before_char(doc: &Node, index: usize) -> usize {
    let mut pos = 1;
    let mut seen = 0;
    if let Some(paragraph) = doc.child(0) {
        for child in paragraph.content() {
            match child.text_str() {
                Some(text) => {
                    let len = text.chars().count();
                    if seen + len > index {
                        return pos + (index - seen);
                    }
                    seen += len;
                    pos += len;
                }
                None => pos += child.node_size(),
            }
        }
    }
    pos
}
