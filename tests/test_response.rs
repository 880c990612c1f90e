use chrono::{TimeZone, Utc};
use sws::http::response::{Response, ResponseBuilder, StatusCode, error_page};
use sws::http::writer::{ResponseWriter, serialize_head};

#[test]
fn test_status_code_values() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::NotModified.as_u16(), 304);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
}

#[test]
fn test_status_code_round_trips_through_number() {
    for code in [200, 304, 400, 403, 404, 500, 501] {
        assert_eq!(StatusCode::from_u16(code).unwrap().as_u16(), code);
    }
    assert_eq!(StatusCode::from_u16(418), None);
}

#[test]
fn test_status_text() {
    assert_eq!(StatusCode::NotModified.status_text(), "304 Not Modified");
    assert_eq!(StatusCode::NotImplemented.status_text(), "501 Not Implemented");
}

#[test]
fn test_error_page_markup() {
    assert_eq!(
        error_page(StatusCode::NotFound),
        "<html><h1>404 Not Found</h1></html>"
    );
}

#[test]
fn test_error_response_length_matches_page() {
    let resp = Response::error(StatusCode::Forbidden);

    assert_eq!(resp.status, StatusCode::Forbidden);
    assert_eq!(resp.content_type, "text/html");
    assert_eq!(
        resp.content_length,
        error_page(StatusCode::Forbidden).len() as u64
    );
}

#[test]
fn test_response_builder() {
    let modified = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let resp = ResponseBuilder::new(StatusCode::Ok)
        .content_type("text/css")
        .content_length(42)
        .last_modified(modified)
        .build();

    assert_eq!(resp.content_type, "text/css");
    assert_eq!(resp.content_length, 42);
    assert_eq!(resp.last_modified, Some(modified));
}

#[test]
fn test_head_serialization() {
    let modified = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
    let resp = ResponseBuilder::new(StatusCode::Ok)
        .content_type("text/plain")
        .content_length(10)
        .last_modified(modified)
        .build();
    let head = String::from_utf8(serialize_head(&resp)).unwrap();

    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(head.contains("\r\nDate: "));
    assert!(head.contains("\r\nServer: sws/"));
    assert!(head.contains("\r\nLast-Modified: Sun, 06 Nov 1994 08:49:37 GMT\r\n"));
    assert!(head.contains("\r\nContent-Type: text/plain\r\n"));
    assert!(head.contains("\r\nContent-Length: 10\r\n"));
    assert!(head.ends_with("\r\n\r\n"));
}

#[test]
fn test_not_modified_has_no_length() {
    let resp = ResponseBuilder::new(StatusCode::NotModified).build();
    let head = String::from_utf8(serialize_head(&resp)).unwrap();

    assert!(head.starts_with("HTTP/1.0 304 Not Modified\r\n"));
    assert!(!head.contains("Content-Length"));
}

#[test]
fn test_error_writer_respects_body_and_simple_flags() {
    let page = error_page(StatusCode::NotFound);

    let full = ResponseWriter::error(StatusCode::NotFound, false, true);
    let text = String::from_utf8_lossy(full.as_bytes()).into_owned();
    assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"));
    assert!(text.ends_with(&page));

    let head_only = ResponseWriter::error(StatusCode::NotFound, false, false);
    let text = String::from_utf8_lossy(head_only.as_bytes()).into_owned();
    assert!(text.ends_with("\r\n\r\n"));
    assert!(text.contains(&format!("Content-Length: {}\r\n", page.len())));

    let simple = ResponseWriter::error(StatusCode::NotFound, true, true);
    assert_eq!(simple.as_bytes(), page.as_bytes());
}
