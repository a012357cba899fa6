mod common;

use common::{add_note, register, setup, ALICE, BOB};
use reader_core::model::note::{ContextId, NewNote, Note, NoteId};
use reader_core::model::tag::TagType;
use reader_core::repo::note_repo::SqliteNoteRepository;
use reader_core::repo::outline_repo::SqliteOutlineRepository;
use reader_core::repo::reader_repo::SqliteReaderRepository;
use reader_core::repo::tag_repo::{SqliteTagRepository, TagRepository};
use reader_core::{ErrorClass, Outline, OutlineNode, OutlineService, ServiceError};
use rusqlite::Connection;

type SqliteOutlineService<'conn> = OutlineService<
    SqliteReaderRepository<'conn>,
    SqliteOutlineRepository<'conn>,
    SqliteNoteRepository<'conn>,
>;

fn service(conn: &Connection) -> SqliteOutlineService<'_> {
    OutlineService::new(
        SqliteReaderRepository::try_new(conn).unwrap(),
        SqliteOutlineRepository::try_new(conn).unwrap(),
        SqliteNoteRepository::try_new(conn).unwrap(),
    )
}

fn text(content: &str) -> NewNote {
    NewNote::with_body("commenting", content)
}

fn after(previous: NoteId, content: &str) -> NewNote {
    NewNote {
        previous: Some(previous),
        ..text(content)
    }
}

fn before(next: NoteId, content: &str) -> NewNote {
    NewNote {
        next: Some(next),
        ..text(content)
    }
}

fn under(parent: NoteId, content: &str) -> NewNote {
    NewNote {
        parent_id: Some(parent),
        ..text(content)
    }
}

fn label(note: &Note) -> &str {
    note.bodies[0].content.as_deref().unwrap_or_default()
}

fn labels(nodes: &[OutlineNode<Note>]) -> Vec<&str> {
    nodes.iter().map(|node| label(&node.item)).collect()
}

fn outline(outlines: &SqliteOutlineService<'_>, context_id: ContextId) -> Outline {
    outlines.get_outline(ALICE, context_id).unwrap()
}

#[test]
fn notes_without_links_are_appended() {
    let conn = setup();
    register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();

    for content in ["a", "b", "c"] {
        outlines.add_note(ALICE, context.id, &text(content)).unwrap();
    }

    let tree = outline(&outlines, context.id);
    assert_eq!(tree.context.name.as_deref(), Some("Essay"));
    assert_eq!(tree.context.kind, "outline");
    assert_eq!(labels(&tree.notes), vec!["a", "b", "c"]);
}

#[test]
fn inserting_between_neighbours_relinks_both() {
    let conn = setup();
    register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();

    let a = outlines.add_note(ALICE, context.id, &text("a")).unwrap();
    let b = outlines.add_note(ALICE, context.id, &text("b")).unwrap();
    let middle = outlines.add_note(ALICE, context.id, &after(a.id, "a2")).unwrap();
    assert_eq!(middle.previous, Some(a.id));
    assert_eq!(middle.next, Some(b.id));

    outlines.add_note(ALICE, context.id, &before(a.id, "head")).unwrap();
    outlines.add_note(ALICE, context.id, &after(b.id, "tail")).unwrap();
    let explicit = NewNote {
        previous: Some(middle.id),
        next: Some(b.id),
        ..text("a3")
    };
    outlines.add_note(ALICE, context.id, &explicit).unwrap();

    let tree = outline(&outlines, context.id);
    assert_eq!(labels(&tree.notes), vec!["head", "a", "a2", "a3", "b", "tail"]);

    let notes: Vec<&Note> = tree.notes.iter().map(|node| &node.item).collect();
    for pair in notes.windows(2) {
        assert_eq!(pair[0].next, Some(pair[1].id));
        assert_eq!(pair[1].previous, Some(pair[0].id));
    }
    assert_eq!(notes[0].previous, None);
    assert_eq!(notes[notes.len() - 1].next, None);
}

#[test]
fn children_nest_under_their_parent() {
    let conn = setup();
    register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();

    let a = outlines.add_note(ALICE, context.id, &text("a")).unwrap();
    outlines.add_note(ALICE, context.id, &text("b")).unwrap();
    let first = outlines.add_note(ALICE, context.id, &under(a.id, "a.1")).unwrap();
    outlines.add_note(ALICE, context.id, &under(a.id, "a.2")).unwrap();
    let inherited = outlines.add_note(ALICE, context.id, &before(first.id, "a.0")).unwrap();
    assert_eq!(inherited.parent_id, Some(a.id));

    let tree = outline(&outlines, context.id);
    assert_eq!(labels(&tree.notes), vec!["a", "b"]);
    assert_eq!(labels(&tree.notes[0].children), vec!["a.0", "a.1", "a.2"]);
    assert_eq!(tree.notes[0].subtree_size(), 4);
}

#[test]
fn contradicting_links_are_rejected() {
    let conn = setup();
    register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();
    let other = outlines.create_outline(ALICE, "Other", None).unwrap();

    let a = outlines.add_note(ALICE, context.id, &text("a")).unwrap();
    let b = outlines.add_note(ALICE, context.id, &text("b")).unwrap();
    let child = outlines.add_note(ALICE, context.id, &under(a.id, "a.1")).unwrap();

    let wrong_parent = NewNote {
        parent_id: Some(b.id),
        ..after(child.id, "x")
    };
    let err = outlines.add_note(ALICE, context.id, &wrong_parent).unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);

    let mixed = NewNote {
        previous: Some(child.id),
        next: Some(b.id),
        ..text("y")
    };
    let err = outlines.add_note(ALICE, context.id, &mixed).unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);

    let c = outlines.add_note(ALICE, context.id, &text("c")).unwrap();
    let skipping = NewNote {
        previous: Some(a.id),
        next: Some(c.id),
        ..text("skip")
    };
    let err = outlines.add_note(ALICE, context.id, &skipping).unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);

    let same = NewNote {
        previous: Some(a.id),
        next: Some(a.id),
        ..text("same")
    };
    let err = outlines.add_note(ALICE, context.id, &same).unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);

    let between = NewNote {
        previous: Some(a.id),
        next: Some(b.id),
        ..text("a+")
    };
    outlines.add_note(ALICE, context.id, &between).unwrap();

    let err = outlines.add_note(ALICE, other.id, &after(a.id, "z")).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "note", .. }));

    let tree = outline(&outlines, context.id);
    assert_eq!(labels(&tree.notes), vec!["a", "a+", "b", "c"]);
}

#[test]
fn removing_a_note_joins_its_neighbours() {
    let conn = setup();
    register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();

    let a = outlines.add_note(ALICE, context.id, &text("a")).unwrap();
    let b = outlines.add_note(ALICE, context.id, &text("b")).unwrap();
    let c = outlines.add_note(ALICE, context.id, &text("c")).unwrap();
    outlines.add_note(ALICE, context.id, &under(b.id, "b.1")).unwrap();

    outlines.remove_note(ALICE, context.id, b.id).unwrap();
    let tree = outline(&outlines, context.id);
    assert_eq!(labels(&tree.notes), vec!["a", "c"]);
    assert!(tree.notes.iter().all(|node| node.children.is_empty()));
    assert_eq!(tree.notes[0].item.next, Some(c.id));
    assert_eq!(tree.notes[1].item.previous, Some(a.id));

    outlines.remove_note(ALICE, context.id, a.id).unwrap();
    let tree = outline(&outlines, context.id);
    assert_eq!(labels(&tree.notes), vec!["c"]);
    assert_eq!(tree.notes[0].item.previous, None);

    outlines.add_note(ALICE, context.id, &text("d")).unwrap();
    assert_eq!(labels(&outline(&outlines, context.id).notes), vec!["c", "d"]);

    let err = outlines.remove_note(ALICE, context.id, a.id).unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn copied_note_is_appended_to_root_list() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();
    let a = outlines.add_note(ALICE, context.id, &text("a")).unwrap();
    outlines.add_note(ALICE, context.id, &under(a.id, "a.1")).unwrap();

    let tags = SqliteTagRepository::try_new(&conn).unwrap();
    let important = tags
        .list_tags(alice.id)
        .unwrap()
        .into_iter()
        .find(|tag| tag.kind == TagType::Flag && tag.name == "important")
        .unwrap();
    let source = add_note(&conn, &alice, text("source"));
    tags.assign_to_note(important.id, source.id).unwrap();

    let copy = outlines.copy_note(ALICE, context.id, source.id).unwrap();
    assert_ne!(copy.id, source.id);
    assert_eq!(copy.original_id, Some(source.id));
    assert_eq!(copy.context_id, Some(context.id));
    assert_eq!(copy.previous, Some(a.id));
    assert_eq!(copy.bodies, source.bodies);
    assert_eq!(copy.tags, vec![important]);

    let tree = outline(&outlines, context.id);
    assert_eq!(labels(&tree.notes), vec!["a", "source"]);
    assert_eq!(labels(&tree.notes[0].children), vec!["a.1"]);
}

#[test]
fn first_copy_into_empty_outline_is_the_head() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();
    let source = add_note(&conn, &alice, text("source"));

    let copy = outlines.copy_note(ALICE, context.id, source.id).unwrap();
    assert_eq!(copy.previous, None);
    assert_eq!(copy.next, None);
}

#[test]
fn corrupted_links_surface_as_data_corruption() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();
    let a = outlines.add_note(ALICE, context.id, &text("a")).unwrap();
    let b = outlines.add_note(ALICE, context.id, &text("b")).unwrap();
    let outsider = add_note(&conn, &alice, text("outsider"));

    let set = |column: &str, id: NoteId, target: Option<NoteId>| {
        conn.execute(
            &format!("UPDATE notes SET {column} = ?1 WHERE id = ?2;"),
            rusqlite::params![target.map(|value| value.to_string()), id.to_string()],
        )
        .unwrap();
    };
    let assert_corrupted = || {
        let err = outlines.get_outline(ALICE, context.id).unwrap_err();
        assert!(matches!(err, ServiceError::Outline(_)));
        assert_eq!(err.class(), ErrorClass::DataCorruption);
    };

    // b -> a closes a cycle behind the head.
    set("next_id", b.id, Some(a.id));
    assert_corrupted();
    set("next_id", b.id, None);
    assert_eq!(labels(&outline(&outlines, context.id).notes), vec!["a", "b"]);

    // b becomes a second head while a still points at it.
    set("previous_id", b.id, None);
    assert_corrupted();
    set("previous_id", b.id, Some(a.id));

    // a points at a note outside the outline.
    set("next_id", a.id, Some(outsider.id));
    assert_corrupted();
}

#[test]
fn outlines_belong_to_their_reader() {
    let conn = setup();
    register(&conn, ALICE);
    let bob = register(&conn, BOB);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();

    assert_eq!(
        outlines.get_outline(BOB, context.id).unwrap_err().class(),
        ErrorClass::Forbidden
    );
    assert_eq!(
        outlines
            .add_note(BOB, context.id, &text("intrusion"))
            .unwrap_err()
            .class(),
        ErrorClass::Forbidden
    );

    let bobs = add_note(&conn, &bob, text("bob's"));
    assert_eq!(
        outlines
            .copy_note(ALICE, context.id, bobs.id)
            .unwrap_err()
            .class(),
        ErrorClass::Forbidden
    );
    assert_eq!(
        outlines.get_outline("auth|nobody", context.id).unwrap_err().class(),
        ErrorClass::NotFound
    );
}

#[test]
fn deleted_outline_is_gone_with_its_notes() {
    let conn = setup();
    register(&conn, ALICE);
    let outlines = service(&conn);
    let context = outlines.create_outline(ALICE, "Essay", None).unwrap();
    outlines.add_note(ALICE, context.id, &text("a")).unwrap();

    outlines.delete_outline(ALICE, context.id).unwrap();
    assert_eq!(
        outlines.get_outline(ALICE, context.id).unwrap_err().class(),
        ErrorClass::NotFound
    );

    let live: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM notes WHERE context_id = ?1 AND deleted_at IS NULL;",
            [context.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(live, 0);
}

#[test]
fn blank_outline_name_is_rejected() {
    let conn = setup();
    register(&conn, ALICE);
    let err = service(&conn).create_outline(ALICE, "  ", None).unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);
}
