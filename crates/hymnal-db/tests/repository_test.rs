//! End-to-end scenarios against the repository facade.

use futures_util::StreamExt;
use hymnal_core::{Hymn, HymnCategory, NewHymn, HISTORY_RETENTION_LIMIT};
use hymnal_db::{Database, DbConfig, HymnalRepository, SafeHymnalRepository, SqlHymnalRepository};

fn new_hymn(number: i64, category: HymnCategory, title: &str, content: &str) -> NewHymn {
    NewHymn {
        number,
        title: Some(title.to_string()),
        category,
        content: content.to_string(),
    }
}

async fn open() -> (Database, SqlHymnalRepository) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let repo = db.repository();
    (db, repo)
}

async fn insert(db: &Database, hymns: &[NewHymn]) -> Vec<Hymn> {
    let mut inserted = Vec::new();
    for hymn in hymns {
        inserted.push(db.hymns().insert(hymn).await.unwrap());
    }
    inserted
}

#[tokio::test]
async fn test_inserted_hymns_round_trip_by_id() {
    let (db, repo) = open().await;
    let inserted = insert(
        &db,
        &[
            new_hymn(1, HymnCategory::Creed, "Apostles' Creed", "I believe in God"),
            new_hymn(2, HymnCategory::Creed, "Nicene Creed", "We believe in one God"),
        ],
    )
    .await;

    for hymn in &inserted {
        assert_eq!(repo.hymn_by_id(hymn.id).await.unwrap().as_ref(), Some(hymn));
    }
    assert_eq!(repo.hymn_by_id(12_345).await.unwrap(), None);
}

#[tokio::test]
async fn test_all_hymns_ordered_by_category_then_number() {
    let (db, repo) = open().await;
    insert(
        &db,
        &[
            new_hymn(7, HymnCategory::Supplementary, "Seven", "Supplementary seven"),
            new_hymn(12, HymnCategory::AncientModern, "Twelve", "Ancient twelve"),
            new_hymn(3, HymnCategory::AncientModern, "Three", "Ancient three"),
        ],
    )
    .await;

    let hymns = repo.all_hymns().next().await.unwrap().unwrap();
    let order: Vec<(HymnCategory, i64)> = hymns.iter().map(|h| (h.category, h.number)).collect();

    assert_eq!(
        order,
        vec![
            (HymnCategory::AncientModern, 3),
            (HymnCategory::AncientModern, 12),
            (HymnCategory::Supplementary, 7),
        ]
    );
}

#[tokio::test]
async fn test_favoriting_twice_keeps_one_row() {
    let (db, repo) = open().await;
    let hymn = insert(&db, &[new_hymn(1, HymnCategory::Psalms, "Psalm 1", "Blessed is the man")])
        .await
        .remove(0);

    repo.add_to_favorites(hymn.id).await.unwrap();
    repo.add_to_favorites(hymn.id).await.unwrap();

    assert_eq!(db.favorites().count().await.unwrap(), 1);
    assert!(repo.is_favorite(hymn.id).await.unwrap());
    assert_eq!(repo.favorite_hymns().next().await.unwrap().unwrap(), vec![hymn]);
}

#[tokio::test]
async fn test_history_settles_at_retention_limit() {
    let (db, repo) = open().await;
    let hymns: Vec<NewHymn> = (1..=120)
        .map(|n| new_hymn(n, HymnCategory::AncientModern, &format!("Hymn {}", n), "Words"))
        .collect();
    db.hymns().insert_many(&hymns).await.unwrap();

    let all = repo.all_hymns().next().await.unwrap().unwrap();
    for hymn in &all {
        repo.add_to_history(hymn.id).await.unwrap();
    }

    assert!(db.history().count().await.unwrap() <= HISTORY_RETENTION_LIMIT);

    let recent = repo.recent_hymns(20).next().await.unwrap().unwrap();
    assert_eq!(recent.len(), 20);
    assert_eq!(recent[0].id, all.last().unwrap().id);

    let recent = repo.recent_hymns(5).next().await.unwrap().unwrap();
    assert!(recent.len() <= 5);
}

#[tokio::test]
async fn test_blank_search_is_empty_and_substring_search_matches() {
    let (db, repo) = open().await;
    insert(
        &db,
        &[
            new_hymn(1, HymnCategory::AncientModern, "Abide with me", "Fast falls the eventide"),
            new_hymn(2, HymnCategory::AncientModern, "Amazing Grace", "How sweet the sound"),
        ],
    )
    .await;

    assert!(repo.search_hymns("").next().await.unwrap().unwrap().is_empty());
    assert!(repo.search_hymns("   ").next().await.unwrap().unwrap().is_empty());

    let found = repo.search_hymns("ZING").next().await.unwrap().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].number, 2);

    let found = repo.search_hymns("eventid").next().await.unwrap().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].number, 1);

    assert!(repo.search_hymns("nothing like this").next().await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_stream_sees_new_hymns() {
    let (db, repo) = open().await;
    let mut results = repo.search_hymns("jerusalem");
    assert!(results.next().await.unwrap().unwrap().is_empty());

    insert(&db, &[new_hymn(9, HymnCategory::Supplementary, "Jerusalem", "And did those feet")]).await;
    assert_eq!(results.next().await.unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn test_highlight_add_list_remove() {
    let (db, repo) = open().await;
    let hymn = insert(&db, &[new_hymn(1, HymnCategory::Canticles, "Magnificat", "My soul doth magnify the Lord")])
        .await
        .remove(0);

    let highlight = repo.add_highlight(hymn.id, 0, 10, 1).await.unwrap();

    let mut stream = repo.highlights_for_hymn(hymn.id);
    let listed = stream.next().await.unwrap().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!((listed[0].start_index, listed[0].end_index, listed[0].color_index), (0, 10, 1));
    assert_eq!(listed[0].excerpt(&hymn.content), "My soul do");

    assert_eq!(repo.hymns_with_highlights().next().await.unwrap().unwrap(), vec![hymn.clone()]);

    repo.remove_highlight(highlight.id).await.unwrap();
    assert!(stream.next().await.unwrap().unwrap().is_empty());
    assert!(repo.hymns_with_highlights().next().await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_safe_wrapper_matches_facade_on_success() {
    let (db, repo) = open().await;
    let hymn = insert(&db, &[new_hymn(1, HymnCategory::Psalms, "Psalm 23", "The Lord is my shepherd")])
        .await
        .remove(0);

    let safe = SafeHymnalRepository::new(repo);
    assert_eq!(safe.hymn_by_id(hymn.id).await, Some(hymn.clone()));
    assert_eq!(safe.hymn_by_number(1, HymnCategory::Psalms).await, Some(hymn.clone()));

    safe.add_to_history(hymn.id).await.unwrap();
    assert_eq!(safe.recent_hymns(20).next().await.unwrap(), vec![hymn]);
}
