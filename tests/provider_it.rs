//! 외부 API 클라이언트 동작 검증

use book_lending_rust::broadcast::{NotifyWriter, Outbound};
use book_lending_rust::batch::Writer;
use book_lending_rust::provider::api::google;
use book_lending_rust::provider::api::{ClientError, LookupClient};
use book_lending_rust::provider::notify::{NotifyClient, NotifyError, TelegramClient};
use httpmock::prelude::*;
use std::time::Duration;

const CLEAN_CODE: i64 = 9780132350884;

#[test]
fn lookup_returns_metadata_when_found() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/books/v1/volumes")
            .query_param("q", format!("isbn:{}", CLEAN_CODE));
        then.status(200).json_body(serde_json::json!({
            "totalItems": 1,
            "items": [
                {
                    "volumeInfo": {
                        "title": "Clean Code",
                        "description": "A handbook of agile software craftsmanship",
                        "authors": ["Robert C. Martin"],
                        "publishedDate": "2008-08-01",
                        "imageLinks": {
                            "thumbnail": "http://books.google.com/books/content?zoom=1"
                        }
                    }
                }
            ]
        }));
    });

    let client = google::Client::new(&server.url("/books/v1/volumes"), None);
    let metadata = client.find_by_isbn(CLEAN_CODE).unwrap().unwrap();

    mock.assert();
    assert_eq!(metadata.title, "Clean Code");
    assert_eq!(metadata.authors, vec!["Robert C. Martin".to_owned()]);
    assert_eq!(metadata.cover_url.unwrap(), "http://books.google.com/books/content?zoom=3");
}

#[test]
fn lookup_miss_is_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/books/v1/volumes");
        then.status(200).json_body(serde_json::json!({ "totalItems": 0 }));
    });

    let client = google::Client::new(&server.url("/books/v1/volumes"), None);
    let metadata = client.find_by_isbn(CLEAN_CODE).unwrap();

    // 정상 응답으로 온 "결과 없음"은 재시도 대상이 아니다.
    mock.assert_hits(1);
    assert_eq!(metadata, None);
}

#[test]
fn lookup_propagates_http_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/books/v1/volumes");
        then.status(500);
    });

    let client = google::Client::new(&server.url("/books/v1/volumes"), None);
    assert!(matches!(
        client.find_by_isbn(CLEAN_CODE),
        Err(ClientError::RequestFailed(_))
    ));
}

#[test]
fn lookup_rejects_malformed_payload() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/books/v1/volumes");
        then.status(200).body("<html>not json</html>");
    });

    let client = google::Client::new(&server.url("/books/v1/volumes"), None);
    assert!(matches!(
        client.find_by_isbn(CLEAN_CODE),
        Err(ClientError::ResponseParseFailed(_))
    ));
}

#[test]
fn send_message_round_trip() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/bot42:TOKEN/sendMessage");
        then.status(200).json_body(serde_json::json!({ "ok": true }));
    });

    let client = TelegramClient::new(&server.base_url(), "42:TOKEN");
    client.send_message(2, "안내").unwrap();
    mock.assert();
}

#[test]
fn send_message_surfaces_rate_limit_signal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/bot42:TOKEN/sendMessage");
        then.status(429).json_body(serde_json::json!({
            "ok": false,
            "error_code": 429,
            "parameters": { "retry_after": 7 }
        }));
    });

    let client = TelegramClient::new(&server.base_url(), "42:TOKEN");
    assert_eq!(
        client.send_message(2, "안내"),
        Err(NotifyError::RateLimited { chat_id: 2, retry_after: 7 })
    );
}

#[test]
fn writer_retries_rate_limited_target_exactly_once() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/bot42:TOKEN/sendMessage");
        then.status(429).json_body(serde_json::json!({
            "ok": false,
            "error_code": 429,
            "parameters": { "retry_after": 0 }
        }));
    });

    let client = TelegramClient::new(&server.base_url(), "42:TOKEN");
    let writer = NotifyWriter::new(client, Duration::from_millis(0));
    writer.do_write(vec![Outbound::new(2, "안내".to_owned())]).unwrap();

    // 최초 전송 한번 + 재시도 한번
    mock.assert_hits(2);
}

#[test]
fn writer_does_not_retry_forbidden_target() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/bot42:TOKEN/sendMessage");
        then.status(403).json_body(serde_json::json!({ "ok": false, "error_code": 403 }));
    });

    let client = TelegramClient::new(&server.base_url(), "42:TOKEN");
    let writer = NotifyWriter::new(client, Duration::from_millis(0));
    writer.do_write(vec![Outbound::new(2, "안내".to_owned())]).unwrap();

    mock.assert_hits(1);
}
