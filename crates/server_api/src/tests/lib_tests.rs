use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::CellValue,
    error::FILE_PROCESSING_MESSAGE,
    protocol::{ChartPoint, UploadPanel},
};
use tabular::PREVIEW_PAGE_SIZE;

use super::*;

fn setup() -> ApiContext {
    ApiContext {
        storage: Storage::new(),
        preview_page_size: PREVIEW_PAGE_SIZE,
    }
}

fn csv_file(filename: &str, body: &str) -> UploadedFile {
    UploadedFile {
        contents: format!("data:text/csv;base64,{}", STANDARD.encode(body)),
        filename: filename.to_string(),
        last_modified: Some(1_700_000_000_000),
    }
}

fn click(x: &str, y: &str) -> SubmitRequest {
    SubmitRequest {
        n_clicks: Some(1),
        x: Some(x.to_string()),
        y: Some(y.to_string()),
        generation: None,
    }
}

fn panels(instruction: RenderInstruction) -> Vec<UploadPanel> {
    match instruction {
        RenderInstruction::ReplaceUploadPanels { panels } => panels,
        other => panic!("expected upload panels, got {other:?}"),
    }
}

fn chart(instruction: RenderInstruction) -> ChartPanel {
    match instruction {
        RenderInstruction::ReplaceChart { chart } => chart,
        other => panic!("expected chart, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_then_submit_draws_rows_in_order() {
    let ctx = setup();
    let session = SessionId::generate();

    let rendered = upload(&ctx, session, vec![csv_file("data.csv", "a,b\n1,2\n3,4\n")])
        .await
        .expect("upload");
    let panels = panels(rendered);
    assert_eq!(panels.len(), 1);
    let UploadPanel::Table(panel) = &panels[0] else {
        panic!("expected table panel");
    };
    assert_eq!(panel.preview.columns, ["a", "b"]);
    assert_eq!(panel.preview.rows.len(), 2);
    assert_eq!(panel.x_options.len(), 2);
    assert_eq!(panel.y_options[1].value, "b");
    assert_eq!(panel.last_modified.as_deref(), Some("2023-11-14 22:13:20 UTC"));
    assert!(panel.raw_excerpt.starts_with("data:text/csv;base64,"));
    assert_eq!(ctx.storage.load(session).await.phase, Phase::TableReady);

    let ChartPanel::Figure(figure) = chart(submit(&ctx, session, click("a", "b")).await) else {
        panic!("expected figure");
    };
    assert_eq!(
        figure.points,
        [
            ChartPoint {
                x: CellValue::Int(1),
                y: CellValue::Int(2)
            },
            ChartPoint {
                x: CellValue::Int(3),
                y: CellValue::Int(4)
            },
        ]
    );
    let state = ctx.storage.load(session).await;
    assert_eq!(state.phase, Phase::ChartShown);
    assert_eq!(state.selection.x.as_deref(), Some("a"));
}

#[tokio::test]
async fn submit_before_any_upload_changes_nothing() {
    let ctx = setup();
    let session = SessionId::generate();
    let rendered = submit(&ctx, session, click("a", "b")).await;
    assert!(matches!(rendered, RenderInstruction::NoUpdate));
    assert_eq!(ctx.storage.load(session).await.phase, Phase::Idle);
    assert_eq!(ctx.storage.session_count().await, 0);
}

#[tokio::test]
async fn submit_without_a_click_changes_nothing() {
    let ctx = setup();
    let session = SessionId::generate();
    upload(&ctx, session, vec![csv_file("data.csv", "a,b\n1,2\n")])
        .await
        .expect("upload");

    let rendered = submit(&ctx, session, SubmitRequest::default()).await;
    assert!(matches!(rendered, RenderInstruction::NoUpdate));
    assert_eq!(ctx.storage.load(session).await.phase, Phase::TableReady);
}

#[tokio::test]
async fn last_file_of_a_multi_upload_wins() {
    let ctx = setup();
    let session = SessionId::generate();
    let rendered = upload(
        &ctx,
        session,
        vec![
            csv_file("a.csv", "a,b\n1,2\n"),
            csv_file("b.csv", "c,d\n5,6\n7,8\n"),
        ],
    )
    .await
    .expect("upload");
    let panels = panels(rendered);
    assert_eq!(panels.len(), 2);
    assert!(panels.iter().all(|p| matches!(p, UploadPanel::Table(_))));

    let ChartPanel::Figure(figure) = chart(submit(&ctx, session, click("c", "d")).await) else {
        panic!("expected figure");
    };
    assert_eq!(figure.points.len(), 2);

    let ChartPanel::Error(error) = chart(submit(&ctx, session, click("a", "b")).await) else {
        panic!("expected error");
    };
    assert_eq!(error.code, ErrorCode::UnknownColumn);
}

#[tokio::test]
async fn failed_file_does_not_block_the_others() {
    let ctx = setup();
    let session = SessionId::generate();
    let rendered = upload(
        &ctx,
        session,
        vec![
            csv_file("good.csv", "a,b\n1,2\n"),
            csv_file("notes.txt", "a,b\n1,2\n"),
            UploadedFile {
                contents: "no separator here".into(),
                filename: "broken.csv".into(),
                last_modified: None,
            },
        ],
    )
    .await
    .expect("upload");
    let panels = panels(rendered);
    assert!(matches!(panels[0], UploadPanel::Table(_)));
    let UploadPanel::Error(unrecognized) = &panels[1] else {
        panic!("expected error panel");
    };
    assert_eq!(unrecognized.error.code, ErrorCode::UnrecognizedFileKind);
    assert_eq!(unrecognized.message, FILE_PROCESSING_MESSAGE);
    let UploadPanel::Error(malformed) = &panels[2] else {
        panic!("expected error panel");
    };
    assert_eq!(malformed.error.code, ErrorCode::MalformedPayload);

    let stored = ctx.storage.table(session).await.expect("table");
    assert_eq!(stored.columns(), ["a", "b"]);
}

#[tokio::test]
async fn unrecognized_only_upload_stores_nothing() {
    let ctx = setup();
    let session = SessionId::generate();
    upload(&ctx, session, vec![csv_file("data.json", "{}")])
        .await
        .expect("upload");
    assert!(ctx.storage.table(session).await.is_none());
    assert_eq!(ctx.storage.load(session).await.phase, Phase::UploadFailed);
}

#[tokio::test]
async fn failed_upload_keeps_the_previous_table() {
    let ctx = setup();
    let session = SessionId::generate();
    upload(&ctx, session, vec![csv_file("data.csv", "a,b\n1,2\n")])
        .await
        .expect("upload");
    upload(&ctx, session, vec![csv_file("bad.csv", "a\n1,2,3\n")])
        .await
        .expect("upload");

    let ChartPanel::Figure(figure) = chart(submit(&ctx, session, click("a", "b")).await) else {
        panic!("expected figure");
    };
    assert_eq!(figure.points.len(), 1);
}

#[test]
fn selection_from_an_older_table_is_stale() {
    let first = stage_file(&csv_file("first.csv", "old,value\n1,2\n"));
    let (state, rendered) = on_upload(&SessionState::default(), vec![first], PREVIEW_PAGE_SIZE);
    let RenderInstruction::ReplaceUploadPanels { panels } = rendered else {
        panic!("expected panels");
    };
    let UploadPanel::Table(old_panel) = &panels[0] else {
        panic!("expected table panel");
    };
    let old_generation = old_panel.generation;

    let second = stage_file(&csv_file("second.csv", "new,value\n1,2\n"));
    let (state, _) = on_upload(&state, vec![second], PREVIEW_PAGE_SIZE);
    assert_ne!(state.generation(), old_generation);

    let request = SubmitRequest {
        generation: Some(old_generation),
        ..click("old", "value")
    };
    let (_, rendered) = on_submit(&state, &request);
    let RenderInstruction::ReplaceChart {
        chart: ChartPanel::Error(error),
    } = rendered
    else {
        panic!("expected chart error");
    };
    assert_eq!(error.code, ErrorCode::StaleSelection);
}

#[test]
fn stale_generation_with_surviving_columns_still_renders() {
    let (state, _) = on_upload(
        &SessionState::default(),
        vec![
            stage_file(&csv_file("one.csv", "x,y\n1,2\n")),
            stage_file(&csv_file("two.csv", "x,y\n3,4\n5,6\n")),
        ],
        PREVIEW_PAGE_SIZE,
    );
    let request = SubmitRequest {
        generation: Some(TableGeneration(1)),
        ..click("x", "y")
    };
    let (_, rendered) = on_submit(&state, &request);
    let RenderInstruction::ReplaceChart {
        chart: ChartPanel::Figure(figure),
    } = rendered
    else {
        panic!("expected figure");
    };
    assert_eq!(figure.points.len(), 2);
}

#[test]
fn unset_axis_is_an_unknown_column() {
    let (state, _) = on_upload(
        &SessionState::default(),
        vec![stage_file(&csv_file("data.csv", "a,b\n1,2\n"))],
        PREVIEW_PAGE_SIZE,
    );
    let request = SubmitRequest {
        n_clicks: Some(3),
        x: Some("a".into()),
        y: None,
        generation: None,
    };
    let (_, rendered) = on_submit(&state, &request);
    let RenderInstruction::ReplaceChart {
        chart: ChartPanel::Error(error),
    } = rendered
    else {
        panic!("expected chart error");
    };
    assert_eq!(error.code, ErrorCode::UnknownColumn);
}

#[test]
fn empty_upload_is_not_an_update() {
    let (state, rendered) = on_upload(&SessionState::default(), Vec::new(), PREVIEW_PAGE_SIZE);
    assert!(matches!(rendered, RenderInstruction::NoUpdate));
    assert_eq!(state.phase, Phase::Idle);
}

#[tokio::test]
async fn preview_pages_through_the_stored_table() {
    let ctx = setup();
    let session = SessionId::generate();
    assert_eq!(
        preview(&ctx, session, 0).await.expect_err("no table").code,
        ErrorCode::NotFound
    );

    let body: String = std::iter::once("n,sq\n".to_string())
        .chain((0..20).map(|n| format!("{n},{}\n", n * n)))
        .collect();
    upload(&ctx, session, vec![csv_file("squares.csv", &body)])
        .await
        .expect("upload");

    let page = preview(&ctx, session, 1).await.expect("page");
    assert_eq!(page.page_count, 2);
    assert_eq!(page.rows.len(), 5);
    assert_eq!(page.rows[0], [CellValue::Int(15), CellValue::Int(225)]);
}
