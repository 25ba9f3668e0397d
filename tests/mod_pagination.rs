mod common;

use common::{collection_on, seed};
use nexusdoc::query::with_options;
use nexusdoc::{Clause, Direction, MemoryStore, PageParams, QueryOptions};
use std::sync::Arc;

#[test]
fn second_page_of_sixty() {
    let col = collection_on(Arc::new(MemoryStore::new()), "items");
    seed(&col, 60);
    let order = [Clause::Options(QueryOptions::default().with_order("n", Direction::Asc))];

    let page = col.paginate_with_count(&order, 2, 25).unwrap();
    assert_eq!((page.page, page.per_page), (2, 25));
    assert_eq!(page.docs.len(), 25);
    assert_eq!(page.docs[0].id, "d0025");
    assert_eq!(page.count, Some(60));
    assert_eq!(page.total_page, Some(3));

    let last = col.paginate_with_count(&order, 3, 25).unwrap();
    assert_eq!(last.docs.len(), 10);
    assert!(col.paginate(&order, 4, 25).unwrap().docs.is_empty());
}

#[test]
fn page_limit_and_offset_merge_into_options() {
    let base = [Clause::filter("group", "==", 1), Clause::Options(QueryOptions::default().with_limit(999))];
    let merged = with_options(&base, |o| {
        o.limit = Some(25);
        o.offset = Some(25);
    });
    assert_eq!(merged.len(), 2);
    let Clause::Options(opts) = &merged[1] else { panic!("options must stay last") };
    assert_eq!((opts.limit, opts.offset), (Some(25), Some(25)));

    let appended = with_options(&base[..1], |o| o.limit = Some(1));
    assert_eq!(appended.len(), 2);
    assert!(appended[1].is_options());
}

#[test]
fn zero_inputs_use_defaults() {
    let col = collection_on(Arc::new(MemoryStore::new()), "items");
    seed(&col, 30);
    let page = col.paginate(&[], 0, 0).unwrap();
    assert_eq!((page.page, page.per_page), (1, 25));
    assert_eq!(page.docs.len(), 25);
    assert!(page.count.is_none());
}

#[test]
fn page_params_drive_sorting() {
    let col = collection_on(Arc::new(MemoryStore::new()), "items");
    seed(&col, 10);
    let params: PageParams = serde_json::from_str(r#"{"page": 1, "perPage": 3, "sort": "n:desc"}"#).unwrap();
    let clauses = [Clause::Options(params.options(col.config()))];
    let page = col.paginate_with_count(&clauses, params.page, params.per_page).unwrap();
    let ids: Vec<&str> = page.docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["d0009", "d0008", "d0007"]);
    assert_eq!(page.total_page, Some(4));

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["perPage"], 3);
    assert_eq!(json["docs"][0]["_id"], "d0009");
}
