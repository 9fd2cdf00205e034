use gdd_core::SectionContent;
use gdd_db::{DbError, GddDbPool, SectionContentRepository};
use sqlx::SqlitePool;

fn content(pairs: &[(&str, &str)]) -> SectionContent {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn two_editors_last_write_wins_without_version() {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let alice = content(&[("core-loop", "<p>Alice</p>")]);
    let bob = content(&[("mechanics", "<p>Bob</p>")]);

    SectionContentRepository::save(&pool, "game", "gameplay", &alice, "alice", None)
        .await
        .unwrap();
    let outcome = SectionContentRepository::save(&pool, "game", "gameplay", &bob, "bob", None)
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);

    let stored = SectionContentRepository::get(&pool, "game", "gameplay")
        .await
        .unwrap();
    assert_eq!(stored, bob);
}

#[tokio::test]
async fn two_editors_with_versions_second_is_rejected() {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    SectionContentRepository::save(&pool, "game", "gameplay", &content(&[("core-loop", "v1")]), "alice", None)
        .await
        .unwrap();

    // Both loaded version 1
    SectionContentRepository::save(&pool, "game", "gameplay", &content(&[("core-loop", "alice")]), "alice", Some(1))
        .await
        .unwrap();
    let err = SectionContentRepository::save(&pool, "game", "gameplay", &content(&[("core-loop", "bob")]), "bob", Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::VersionConflict { expected: 1, actual: 2 }));

    let record = SectionContentRepository::get_record(&pool, "game", "gameplay")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.last_edited_by.as_deref(), Some("alice"));
}

#[tokio::test]
async fn file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gdd.sqlite3");

    let db = GddDbPool::open(&path).await.unwrap();
    SectionContentRepository::save(db.pool(), "game", "story", &content(&[("synopsis", "<p>Once</p>")]), "alice", None)
        .await
        .unwrap();
    db.close().await;

    let reopened = GddDbPool::open(&path).await.unwrap();
    let all = SectionContentRepository::get_all(reopened.pool(), "game")
        .await
        .unwrap();
    assert_eq!(all["story"]["synopsis"], "<p>Once</p>");
    reopened.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_to_one_section_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let db = GddDbPool::open(&dir.path().join("gdd.sqlite3")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let pool = db.pool().clone();
        handles.push(tokio::spawn(async move {
            let body = content(&[("synopsis", &format!("<p>{i}</p>"))]);
            SectionContentRepository::save(&pool, "game", "story", &body, "alice", None).await
        }));
    }
    let mut versions = Vec::new();
    for handle in handles {
        versions.push(handle.await.unwrap().unwrap().version);
    }
    versions.sort_unstable();
    assert_eq!(versions, (1..=10).collect::<Vec<i64>>());

    let record = SectionContentRepository::get_record(db.pool(), "game", "story")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.version, 10);
    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_versioned_saves_have_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let db = GddDbPool::open(&dir.path().join("gdd.sqlite3")).await.unwrap();
    SectionContentRepository::save(db.pool(), "game", "story", &content(&[("synopsis", "v1")]), "alice", None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..5 {
        let pool = db.pool().clone();
        handles.push(tokio::spawn(async move {
            let body = content(&[("synopsis", &format!("editor {i}"))]);
            SectionContentRepository::save(&pool, "game", "story", &body, "bob", Some(1)).await
        }));
    }
    let mut saved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert_eq!(outcome.version, 2);
                saved += 1;
            }
            Err(err) => assert!(matches!(err, DbError::VersionConflict { expected: 1, actual: 2 })),
        }
    }
    assert_eq!(saved, 1);
    db.close().await;
}
