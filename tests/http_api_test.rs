// ==========================================
// HTTP 接口集成测试
// ==========================================
// 测试目标: 通过 axum Router 驱动全部端点（不监听端口）
// ==========================================

mod test_helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use sales_analytics::app::create_router;
use serde_json::{json, Value};
use test_helpers::{
    build_xlsx, create_test_state, create_test_state_with, multipart_body,
    multipart_content_type, sample_sales_xlsx, FormPart, XCell,
};
use tower::ServiceExt;

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);

    let (status, body) = send(&router, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], sales_analytics::VERSION);
}

#[tokio::test]
async fn test_detect_columns() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = build_xlsx(&["Invoice date", "", "Invoice", "Amount"], &[]).unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/column-mapping/detect",
            &[FormPart::File {
                file_name: "cols.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["excelColumns"], json!(["Invoice date", "Invoice", "Amount"]));
    assert_eq!(body["dbColumns"][0], "sales_type");
}

#[tokio::test]
async fn test_detect_columns_without_file() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/column-mapping/detect",
            &[FormPart::Text {
                name: "entity",
                value: "HQ",
            }],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_validate_upload() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = build_xlsx(
        &["Invoice date", "Invoice"],
        &[vec![XCell::Text("not a date"), XCell::Text("INV-1")]],
    )
    .unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/upload/validate",
            &[
                FormPart::File {
                    file_name: "v.xlsx",
                    bytes: &bytes,
                },
                FormPart::Text {
                    name: "entity",
                    value: "Mexico",
                },
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(
        body["errors"],
        json!([{ "row": 2, "field": "Invoice date", "message": "Invalid date format: not a date" }])
    );
}

#[tokio::test]
async fn test_validate_requires_entity() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = sample_sales_xlsx().unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/upload/validate",
            &[FormPart::File {
                file_name: "s.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File and entity are required");
}

#[tokio::test]
async fn test_upload_history_and_entities() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = sample_sales_xlsx().unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/upload/Germany",
            &[FormPart::File {
                file_name: "de.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["rowsInserted"], 2);
    assert_eq!(body["summary"]["rowsParsed"], 3);
    assert_eq!(body["summary"]["entity"], "Germany");

    let (status, body) = send(&router, get("/api/upload/history?entity=All&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "success");
    assert_eq!(history[0]["file_name"], "de.xlsx");

    let (status, body) = send(&router, get("/api/entities")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entities"], json!(["Europe", "Germany"]));
}

#[tokio::test]
async fn test_upload_rejected_returns_validation() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = build_xlsx(
        &["Invoice date", "Invoice"],
        &[vec![XCell::Text("31/31/2024"), XCell::Text("INV-1")]],
    )
    .unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/upload/India",
            &[FormPart::File {
                file_name: "in.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["validation"]["valid"], false);
    assert_eq!(body["validation"]["errors"][0]["row"], 2);

    let (_, body) = send(&router, get("/api/upload/history?entity=India")).await;
    assert_eq!(body["history"][0]["status"], "failed");
}

#[tokio::test]
async fn test_upload_invalid_entity() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = sample_sales_xlsx().unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/upload/Atlantis",
            &[FormPart::File {
                file_name: "a.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid entity: Atlantis");
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let (_db, state) = create_test_state_with(|config| config.max_upload_bytes = 1024).unwrap();
    let router = create_router(state);
    let bytes = vec![b'x'; 4096];

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/upload/HQ",
            &[FormPart::File {
                file_name: "big.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_column_mapping_crud() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/column-mapping",
            json!({ "entity": "Korot", "mappings": { "Bill": "invoice", "Qty": "quantity" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = send(&router, get("/api/column-mapping?entity=Korot")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mapping"], json!({ "Bill": "invoice", "Qty": "quantity" }));
    assert_eq!(body["mappings"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &router,
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/column-mapping?entity=Korot")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&router, get("/api/column-mapping?entity=Korot")).await;
    assert_eq!(body["mapping"], json!({}));
}

#[tokio::test]
async fn test_column_mapping_validation() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);

    let (status, body) = send(&router, get("/api/column-mapping")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Entity parameter is required");

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/column-mapping",
            json!({ "entity": "HQ", "mappings": { "Bill": "no_such_column" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown destination column: no_such_column");

    let (status, body) = send(
        &router,
        json_request(Method::POST, "/api/column-mapping", json!({ "entity": "HQ" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Entity and mappings are required");
}

#[tokio::test]
async fn test_exchange_rate_upload_and_list() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = build_xlsx(
        &["Year", "Currency", "Rate"],
        &[
            vec![XCell::Number(2024.0), XCell::Text("USD"), XCell::Number(1300.5)],
            vec![XCell::Number(2024.0), XCell::Text("EUR"), XCell::Text("1,450")],
            vec![XCell::Number(1990.0), XCell::Text("JPY"), XCell::Number(9.0)],
        ],
    )
    .unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/exchange-rate/upload",
            &[FormPart::File {
                file_name: "rates.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["message"], "Successfully uploaded 2 exchange rates");
    assert_eq!(body["skipped"][0]["row"], 4);

    let (status, body) = send(&router, get("/api/exchange-rate?year=2024")).await;
    assert_eq!(status, StatusCode::OK);
    let rates = body["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0]["currency"], "EUR");
    assert_eq!(rates[0]["rate"], 1450.0);
}

#[tokio::test]
async fn test_exchange_rate_upload_missing_columns() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = build_xlsx(&["Year", "Amount"], &[vec![XCell::Number(2024.0), XCell::Number(1.0)]])
        .unwrap();

    let (status, body) = send(
        &router,
        multipart_request(
            "/api/exchange-rate/upload",
            &[FormPart::File {
                file_name: "rates.xlsx",
                bytes: &bytes,
            }],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Required columns not found. Expected: year, currency, rate (missing: currency, rate)"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_uploads_complete() {
    let (_db, state) = create_test_state().unwrap();
    let router = create_router(state);
    let bytes = sample_sales_xlsx().unwrap();

    let uploads = ["HQ", "USA", "Japan", "China"].map(|entity| {
        let router = router.clone();
        let bytes = bytes.clone();
        tokio::spawn(async move {
            let uri = format!("/api/upload/{}", entity);
            send(
                &router,
                multipart_request(
                    &uri,
                    &[FormPart::File {
                        file_name: "s.xlsx",
                        bytes: &bytes,
                    }],
                ),
            )
            .await
        })
    });

    let (status, _) = send(&router, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    for upload in uploads {
        let (status, body) = upload.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rowsInserted"], 2);
    }

    let (_, body) = send(&router, get("/api/upload/history?entity=All")).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 4);
}
