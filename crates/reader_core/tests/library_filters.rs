mod common;

use common::{add_named, add_publication, names, register, set_column, setup, ALICE, BOB};
use reader_core::model::publication::{AttributionRole, NewPublication};
use reader_core::model::tag::TagType;
use reader_core::repo::publication_repo::SqlitePublicationRepository;
use reader_core::repo::reader_repo::SqliteReaderRepository;
use reader_core::repo::tag_repo::SqliteTagRepository;
use reader_core::{
    config::ListingConfig, ErrorClass, LibraryListing, LibraryResponse,
    LibraryService, MemoryLibraryCache, QueryParams, TagService,
};
use rusqlite::Connection;

type SqliteLibraryService<'conn> = LibraryService<
    SqliteReaderRepository<'conn>,
    SqlitePublicationRepository<'conn>,
    SqliteTagRepository<'conn>,
    MemoryLibraryCache,
>;

fn service(conn: &Connection) -> SqliteLibraryService<'_> {
    LibraryService::new(
        SqliteReaderRepository::try_new(conn).unwrap(),
        SqlitePublicationRepository::try_new(conn).unwrap(),
        SqliteTagRepository::try_new(conn).unwrap(),
        MemoryLibraryCache::from_secs(3600),
        ListingConfig::default(),
    )
}

fn list(conn: &Connection, auth_id: &str, params: &[(&str, &str)]) -> LibraryListing {
    let params: QueryParams = params.iter().copied().collect();
    match service(conn).library(auth_id, &params, None).unwrap() {
        LibraryResponse::Listing(listing) => listing,
        LibraryResponse::NotModified => panic!("unexpected not modified"),
    }
}

#[test]
fn title_filter_is_case_insensitive_substring() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_named(&conn, &alice, "superbook");
    add_named(&conn, &alice, "Super great book!");
    add_named(&conn, &alice, "Ordinary book");

    let listing = list(&conn, ALICE, &[("title", "super"), ("orderBy", "title")]);
    assert_eq!(names(&listing.page.items), vec!["Super great book!", "superbook"]);
    assert_eq!(listing.page.total_items, 2);

    let reversed = list(
        &conn,
        ALICE,
        &[("title", "SUPER"), ("orderBy", "title"), ("reverse", "true")],
    );
    assert_eq!(names(&reversed.page.items), vec!["superbook", "Super great book!"]);
}

#[test]
fn title_and_search_fold_non_ascii_case() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_named(&conn, &alice, "Über alles");
    add_named(&conn, &alice, "ÉCOLE");
    add_named(&conn, &alice, "uber");

    let listing = list(&conn, ALICE, &[("title", "über")]);
    assert_eq!(names(&listing.page.items), vec!["Über alles"]);

    let listing = list(&conn, ALICE, &[("title", "École")]);
    assert_eq!(names(&listing.page.items), vec!["ÉCOLE"]);

    let listing = list(&conn, ALICE, &[("search", "ÜBER")]);
    assert_eq!(names(&listing.page.items), vec!["Über alles"]);
}

#[test]
fn like_wildcards_in_title_match_literally() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_named(&conn, &alice, "100% pure");
    add_named(&conn, &alice, "100 pure");

    let listing = list(&conn, ALICE, &[("title", "100%")]);
    assert_eq!(names(&listing.page.items), vec!["100% pure"]);
}

#[test]
fn attribution_matches_normalized_partial_names() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_publication(
        &conn,
        &alice,
        NewPublication::new("one").with_attribution(AttributionRole::Author, "John Doe"),
    );
    add_publication(
        &conn,
        &alice,
        NewPublication::new("two").with_attribution(AttributionRole::Editor, "john doe"),
    );
    add_publication(
        &conn,
        &alice,
        NewPublication::new("three").with_attribution(AttributionRole::Author, "John  Doe-Smith"),
    );
    add_publication(
        &conn,
        &alice,
        NewPublication::new("four").with_attribution(AttributionRole::Author, "Jane Roe"),
    );

    let listing = list(
        &conn,
        ALICE,
        &[("attribution", "John Doe"), ("orderBy", "title")],
    );
    assert_eq!(names(&listing.page.items), vec!["one", "three", "two"]);

    let editors = list(
        &conn,
        ALICE,
        &[("attribution", "JOHN. DOE"), ("role", "editor")],
    );
    assert_eq!(names(&editors.page.items), vec!["two"]);
}

#[test]
fn author_requires_exact_normalized_name_and_author_role() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_publication(
        &conn,
        &alice,
        NewPublication::new("one").with_attribution(AttributionRole::Author, "John Doe"),
    );
    add_publication(
        &conn,
        &alice,
        NewPublication::new("two").with_attribution(AttributionRole::Editor, "John Doe"),
    );
    add_publication(
        &conn,
        &alice,
        NewPublication::new("three").with_attribution(AttributionRole::Author, "John Doe-Smith"),
    );

    let listing = list(&conn, ALICE, &[("author", "john  doe")]);
    assert_eq!(names(&listing.page.items), vec!["one"]);
}

#[test]
fn invalid_role_yields_no_rows() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_publication(
        &conn,
        &alice,
        NewPublication::new("one").with_attribution(AttributionRole::Author, "John Doe"),
    );

    let listing = list(&conn, ALICE, &[("attribution", "John"), ("role", "villain")]);
    assert!(listing.page.items.is_empty());
    assert_eq!(listing.page.total_items, 0);
}

#[test]
fn pagination_reports_full_total() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    for index in 0..13 {
        add_named(&conn, &alice, &format!("book {index:02}"));
    }

    let first = list(&conn, ALICE, &[("limit", "10"), ("orderBy", "title")]);
    assert_eq!(first.page.items.len(), 10);
    assert_eq!(first.page.total_items, 13);
    assert_eq!(first.page.page, 1);
    assert_eq!(first.page.page_size, 10);
    assert_eq!(first.page.items[0].name, "book 00");

    let second = list(
        &conn,
        ALICE,
        &[("limit", "10"), ("page", "2"), ("orderBy", "title")],
    );
    assert_eq!(
        names(&second.page.items),
        vec!["book 10", "book 11", "book 12"]
    );
    assert_eq!(second.page.total_items, 13);
}

#[test]
fn malformed_pagination_falls_back_to_defaults() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    for index in 0..12 {
        add_named(&conn, &alice, &format!("book {index:02}"));
    }

    let listing = list(&conn, ALICE, &[("limit", "-3"), ("page", "zero")]);
    assert_eq!(listing.page.page, 1);
    assert_eq!(listing.page.page_size, 10);
    assert_eq!(listing.page.items.len(), 10);
}

#[test]
fn date_published_orders_nulls_last_then_first_when_reversed() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let undated = add_named(&conn, &alice, "undated");
    let old = add_named(&conn, &alice, "old");
    let new = add_named(&conn, &alice, "new");
    set_column(&conn, "publications", old.id, "date_published", Some(1_000));
    set_column(&conn, "publications", new.id, "date_published", Some(2_000));
    set_column(&conn, "publications", undated.id, "date_published", None);

    let default = list(&conn, ALICE, &[("orderBy", "datePublished")]);
    assert_eq!(names(&default.page.items), vec!["new", "old", "undated"]);

    let reversed = list(
        &conn,
        ALICE,
        &[("orderBy", "datePublished"), ("reverse", "true")],
    );
    assert_eq!(names(&reversed.page.items), vec!["undated", "old", "new"]);
}

#[test]
fn equal_sort_keys_are_ordered_by_id() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let mut ids: Vec<_> = (0..5)
        .map(|_| add_named(&conn, &alice, "same").id)
        .collect();
    ids.sort();

    let first = list(&conn, ALICE, &[("orderBy", "title")]);
    let listed: Vec<_> = first.page.items.iter().map(|p| p.id).collect();
    assert_eq!(listed, ids);

    let again = list(&conn, ALICE, &[("orderBy", "title")]);
    assert_eq!(first, again);
}

#[test]
fn deleted_and_foreign_rows_are_excluded() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let bob = register(&conn, BOB);
    add_named(&conn, &alice, "kept");
    let gone = add_named(&conn, &alice, "gone");
    add_named(&conn, &bob, "bob's");

    service(&conn).delete_publication(ALICE, gone.id).unwrap();

    let listing = list(&conn, ALICE, &[]);
    assert_eq!(names(&listing.page.items), vec!["kept"]);
    assert_eq!(listing.page.total_items, 1);
}

#[test]
fn type_language_and_keyword_filters() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let mut article = NewPublication::new("article");
    article.kind = "article".to_string();
    article.languages = vec!["en".to_string(), "fr".to_string()];
    article.keywords = vec!["Rust".to_string(), "Systems".to_string()];
    add_publication(&conn, &alice, article);
    let mut book = NewPublication::new("book");
    book.languages = vec!["de".to_string()];
    book.keywords = vec!["history".to_string()];
    add_publication(&conn, &alice, book);

    assert_eq!(
        names(&list(&conn, ALICE, &[("type", "ARTICLE")]).page.items),
        vec!["article"]
    );
    assert_eq!(
        names(&list(&conn, ALICE, &[("language", "fr")]).page.items),
        vec!["article"]
    );
    assert_eq!(
        names(&list(&conn, ALICE, &[("keyword", "RUST")]).page.items),
        vec!["article"]
    );
    assert!(list(&conn, ALICE, &[("keyword", "rus")]).page.items.is_empty());
}

#[test]
fn search_covers_name_abstract_description_and_keywords() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    add_named(&conn, &alice, "Ocean tides");
    let mut by_abstract = NewPublication::new("abstracted");
    by_abstract.summary = Some("All about the OCEAN".to_string());
    add_publication(&conn, &alice, by_abstract);
    let mut by_description = NewPublication::new("described");
    by_description.description = Some("deep ocean trenches".to_string());
    add_publication(&conn, &alice, by_description);
    let mut by_keyword = NewPublication::new("keyworded");
    by_keyword.keywords = vec!["ocean".to_string()];
    add_publication(&conn, &alice, by_keyword);
    add_named(&conn, &alice, "Mountains");

    let listing = list(&conn, ALICE, &[("search", "Ocean"), ("orderBy", "title")]);
    assert_eq!(
        names(&listing.page.items),
        vec!["abstracted", "described", "keyworded", "Ocean tides"]
    );
}

#[test]
fn collection_tag_and_flag_filters() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let library = service(&conn);
    let tags = TagService::new(
        SqliteReaderRepository::try_new(&conn).unwrap(),
        SqliteTagRepository::try_new(&conn).unwrap(),
        MemoryLibraryCache::from_secs(3600),
    );

    let stacked = add_named(&conn, &alice, "stacked");
    let flagged = add_named(&conn, &alice, "flagged");
    let both = add_named(&conn, &alice, "both");
    add_named(&conn, &alice, "plain");

    let stack = tags.create_tag(ALICE, TagType::Stack, "Reading").unwrap();
    let flags = tags.list_tags(ALICE).unwrap();
    let important = flags.iter().find(|tag| tag.name == "important").unwrap();
    let urgent = flags.iter().find(|tag| tag.name == "urgent").unwrap();

    library.tag_publication(ALICE, stack.id, stacked.id).unwrap();
    library.tag_publication(ALICE, important.id, flagged.id).unwrap();
    library.tag_publication(ALICE, urgent.id, both.id).unwrap();
    library.tag_publication(ALICE, important.id, both.id).unwrap();

    assert_eq!(
        names(&list(&conn, ALICE, &[("collection", "Reading")]).page.items),
        vec!["stacked"]
    );
    assert_eq!(
        names(&list(&conn, ALICE, &[("stack", "Reading")]).page.items),
        vec!["stacked"]
    );
    let stack_id = stack.id.to_string();
    assert_eq!(
        names(&list(&conn, ALICE, &[("tag", stack_id.as_str())]).page.items),
        vec!["stacked"]
    );
    assert!(list(&conn, ALICE, &[("tag", "not-an-id")]).page.items.is_empty());

    let flagged_listing = list(
        &conn,
        ALICE,
        &[
            ("flag", "IMPORTANT"),
            ("flag", "urgent"),
            ("flag", "important"),
            ("orderBy", "title"),
        ],
    );
    assert_eq!(names(&flagged_listing.page.items), vec!["both", "flagged"]);
    assert_eq!(flagged_listing.page.total_items, 2);
}

#[test]
fn listing_carries_reader_tags() {
    let conn = setup();
    register(&conn, ALICE);

    let listing = list(&conn, ALICE, &[]);
    assert!(listing.tags.iter().any(|tag| tag.name == "important"));
    assert!(listing.tags.iter().all(|tag| tag.kind != TagType::Stack));
}

#[test]
fn not_modified_is_answered_from_cache() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let cache = MemoryLibraryCache::from_secs(3600);
    cache.record(alice.id, 5_000);
    let library = LibraryService::new(
        SqliteReaderRepository::try_new(&conn).unwrap(),
        SqlitePublicationRepository::try_new(&conn).unwrap(),
        SqliteTagRepository::try_new(&conn).unwrap(),
        cache,
        ListingConfig::default(),
    );
    let params = QueryParams::new();

    assert_eq!(
        library.library(ALICE, &params, Some(5_000)).unwrap(),
        LibraryResponse::NotModified
    );
    assert!(matches!(
        library.library(ALICE, &params, Some(4_999)).unwrap(),
        LibraryResponse::Listing(_)
    ));
    assert!(matches!(
        library.library(ALICE, &params, None).unwrap(),
        LibraryResponse::Listing(_)
    ));

    library
        .create_publication(ALICE, &NewPublication::new("fresh"))
        .unwrap();
    assert!(matches!(
        library.library(ALICE, &params, Some(5_000)).unwrap(),
        LibraryResponse::Listing(_)
    ));
}

#[test]
fn unknown_reader_is_not_found() {
    let conn = setup();
    let err = service(&conn)
        .library("auth|nobody", &QueryParams::new(), None)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn foreign_publication_is_forbidden() {
    let conn = setup();
    register(&conn, ALICE);
    let bob = register(&conn, BOB);
    let theirs = add_named(&conn, &bob, "bob's");

    let err = service(&conn).get_publication(ALICE, theirs.id).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Forbidden);
}

#[test]
fn latest_read_activity_returns_newest() {
    let conn = setup();
    let alice = register(&conn, ALICE);
    let book = add_named(&conn, &alice, "book");
    let library = service(&conn);

    assert!(library.latest_read_activity(ALICE, book.id).unwrap().is_none());
    library
        .record_read_activity(ALICE, book.id, Some(&serde_json::json!({"page": 1})))
        .unwrap();
    let second = library
        .record_read_activity(ALICE, book.id, Some(&serde_json::json!({"page": 2})))
        .unwrap();

    let latest = library.latest_read_activity(ALICE, book.id).unwrap().unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(latest.selector, Some(serde_json::json!({"page": 2})));
}
