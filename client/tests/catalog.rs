//! カタログサーバークライアントの結合テスト

mod support;

use media_bin_rs_client::network::{CatalogClient, CatalogError};
use media_bin_rs_client::{App, ClientSettings};
use media_bin_rs_common::codec::{self, EncodingMode};
use media_bin_rs_common::{ChunkedTransport, Sidecar, FRAME_BYTES};
use std::path::Path;
use std::time::Duration;
use support::{FakeServer, Reply};

const LIST_BODY: &str = r#"{"r":"ok","d":[
    {"n":"cat.bin","pn":"Cat","by":"alice","in":"a sleepy cat","fp":"12"},
    {"n":"dog.bin","pn":"Dog","by":"bob","in":"","fp":""}
]}"#;

fn client(server: &FakeServer) -> CatalogClient {
    CatalogClient::new(&server.url(), Duration::from_secs(5)).unwrap()
}

#[test]
fn list_parses_entries() {
    let server = FakeServer::start(|_, _| Reply::ok(LIST_BODY));

    let entries = client(&server).list().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].filename, "cat.bin");
    assert_eq!(entries[0].fps_or_default(), 12);
    assert_eq!(entries[1].fps_or_default(), 15);

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/list");
}

#[test]
fn download_writes_file_in_chunks() {
    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 7) as u8).collect();
    let body = payload.clone();
    let server = FakeServer::start(move |_, _| Reply::ok(body.clone()));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("cat.bin");
    let mut last = None;
    let report = client(&server)
        .download("cat.bin", &dest, &ChunkedTransport::new(2048), |p| last = p.percentage_text())
        .unwrap();

    assert_eq!(server.requests()[0].path, "/download/cat.bin");
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
    assert_eq!(report.bytes, 5000);
    assert_eq!(report.chunks, 3);
    assert_eq!(last.as_deref(), Some("100.00"));
}

#[test]
fn missing_download_is_rejected_and_leaves_nothing() {
    let server = FakeServer::start(|_, _| Reply::status(404, "Not Found"));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("ghost.bin");
    let err = client(&server)
        .download("ghost.bin", &dest, &ChunkedTransport::new(2048), |_| {})
        .unwrap_err();

    assert!(matches!(err, CatalogError::Rejected { status: 404, .. }));
    assert!(!dest.exists());
}

#[test]
fn unsafe_file_name_is_not_requested() {
    let server = FakeServer::start(|_, _| Reply::ok(""));

    let err = client(&server)
        .download_to_vec("../secret", &ChunkedTransport::new(2048), |_| {})
        .unwrap_err();

    assert!(matches!(err, CatalogError::InvalidFileName(_)));
    assert!(server.requests().is_empty());
}

fn cat_sidecar() -> Sidecar {
    Sidecar {
        name: "Cat".to_string(),
        author: "alice".to_string(),
        description: "a cat".to_string(),
        fps: 12,
    }
}

fn write_cat_bin(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("cat.bin");
    std::fs::write(&path, vec![0xABu8; 64]).unwrap();
    path
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle.as_bytes())
}

#[test]
fn upload_sends_file_and_metadata_parts() {
    let server = FakeServer::start(|_, _| Reply::ok(r#"{"r":"ok"}"#));
    let dir = tempfile::tempdir().unwrap();
    let path = write_cat_bin(dir.path());

    client(&server).upload(&path, &cat_sidecar()).unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/upload");

    let body = &requests[0].body;
    assert!(contains(body, r#"name="file""#));
    assert!(contains(body, r#"filename="cat.bin""#));
    assert!(contains(body, r#"name="ini""#));
    assert!(contains(body, r#"{"pn":"Cat","by":"alice","in":"a cat","fp":12}"#));
    assert!(body.windows(64).any(|window| window.iter().all(|&b| b == 0xAB)));
}

#[test]
fn upload_error_message_is_reported() {
    let server = FakeServer::start(|_, _| Reply::status(400, r#"{"r":"error","msg":"Invalid file"}"#));
    let dir = tempfile::tempdir().unwrap();
    let path = write_cat_bin(dir.path());

    let err = client(&server).upload(&path, &cat_sidecar()).unwrap_err();
    match err {
        CatalogError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid file");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn catalog_preview_decodes_downloaded_container() {
    let mut container = Vec::new();
    for color in [[255u8, 0, 0], [0, 0, 255]] {
        let pixel = codec::encode(color[0], color[1], color[2], EncodingMode::Animation);
        for _ in 0..FRAME_BYTES / pixel.len() {
            container.extend_from_slice(&pixel);
        }
    }

    let server = FakeServer::start(move |_, request| match request.path.as_str() {
        "/list" => Reply::ok(LIST_BODY),
        "/download/cat.bin" => Reply::ok(container.clone()),
        _ => Reply::status(404, "Not Found"),
    });

    let dir = tempfile::tempdir().unwrap();
    let mut settings = ClientSettings::default();
    settings.catalog.server_url = server.url();
    settings.transfer.chunk_delay_ms = 0;
    settings.device.timeout_secs = 5;
    let app = App::new(settings, Some("127.0.0.1:1"));

    let out_dir = dir.path().join("preview");
    let outcome = app.catalog_preview("cat.bin", EncodingMode::Animation, &out_dir, None).unwrap();

    assert_eq!(outcome.frames.len(), 2);
    assert_eq!(outcome.trailing_bytes, 0);
    // カタログの fp "12" から 1000 / 12 ms
    assert_eq!(outcome.interval, Duration::from_millis(83));

    let first = image::open(&outcome.frames[0]).unwrap().to_rgb8();
    let second = image::open(&outcome.frames[1]).unwrap().to_rgb8();
    assert_eq!(first.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(second.get_pixel(239, 319).0, [0, 0, 255]);

    // 一覧で FPS を引いてからダウンロードする
    let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/list", "/download/cat.bin"]);

    // FPS 指定時は一覧を参照しない
    let outcome = app.catalog_preview("cat.bin", EncodingMode::Animation, &out_dir, Some(25)).unwrap();
    assert_eq!(outcome.interval, Duration::from_millis(40));
    assert_eq!(server.requests().len(), 3);
}
