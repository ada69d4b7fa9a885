use shared::domain::CellValue;

use super::*;

fn table(column: &str, value: i64) -> Table {
    Table::new(vec![column.to_string()], vec![vec![CellValue::Int(value)]]).expect("table")
}

#[tokio::test]
async fn unknown_session_reads_as_idle_without_table() {
    let storage = Storage::new();
    let state = storage.load(SessionId::generate()).await;
    assert_eq!(state.phase, Phase::Idle);
    assert!(state.get().is_none());
    assert_eq!(state.generation(), TableGeneration(0));
}

#[tokio::test]
async fn last_put_wins() {
    let storage = Storage::new();
    let session = SessionId::generate();
    let first = storage.put_table(session, table("a", 1)).await;
    let second = storage.put_table(session, table("b", 2)).await;
    assert!(second > first);

    let stored = storage.table(session).await.expect("table");
    assert_eq!(stored.columns(), ["b"]);
    assert_eq!(storage.load(session).await.generation(), second);
}

#[tokio::test]
async fn sessions_do_not_see_each_other() {
    let storage = Storage::new();
    let alice = SessionId::generate();
    let bob = SessionId::generate();
    storage.put_table(alice, table("a", 1)).await;

    assert!(storage.table(bob).await.is_none());
    assert_eq!(storage.session_count().await, 1);
}

#[tokio::test]
async fn apply_stores_returned_state() {
    let storage = Storage::new();
    let session = SessionId::generate();
    let output = storage
        .apply(session, |state| {
            let mut next = state.clone();
            next.phase = Phase::ChartShown;
            (next, "done")
        })
        .await;
    assert_eq!(output, "done");
    assert_eq!(storage.load(session).await.phase, Phase::ChartShown);
}

#[tokio::test]
async fn idle_results_leave_no_session_behind() {
    let storage = Storage::new();
    for _ in 0..100 {
        storage
            .apply(SessionId::generate(), |state| (state.clone(), ()))
            .await;
    }
    assert_eq!(storage.session_count().await, 0);
}

#[tokio::test]
async fn going_back_to_idle_drops_the_session() {
    let storage = Storage::new();
    let session = SessionId::generate();
    storage
        .apply(session, |state| {
            let mut next = state.clone();
            next.phase = Phase::UploadFailed;
            (next, ())
        })
        .await;
    assert_eq!(storage.session_count().await, 1);

    storage
        .apply(session, |_| (SessionState::default(), ()))
        .await;
    assert_eq!(storage.session_count().await, 0);
}

#[tokio::test]
async fn evict_idle_drops_sessions_past_the_limit() {
    let storage = Storage::new();
    let session = SessionId::generate();
    storage.put_table(session, table("a", 1)).await;

    assert_eq!(storage.evict_idle(Duration::from_secs(3600)).await, 0);
    assert!(storage.table(session).await.is_some());

    assert_eq!(storage.evict_idle(Duration::ZERO).await, 1);
    assert!(storage.table(session).await.is_none());
    assert_eq!(storage.session_count().await, 0);
}
