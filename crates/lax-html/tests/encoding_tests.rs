//! Integration tests for charset detection and byte loading.

use encoding_rs::{UTF_8, UTF_16LE, WINDOWS_1252};
use lax_dom::NodeId;
use lax_html::{CharsetMatcher, HtmlDocument, HtmlParser, ParseErrorCode, ParseOptions};

const HTTP_EQUIV: &str =
    r#"<html><head><meta http-equiv="Content-Type" content="text/html;charset=utf8"></head><body>x</body></html>"#;

#[test]
fn test_http_equiv_declares_encoding() {
    let doc = HtmlDocument::parse(HTTP_EQUIV).unwrap();
    assert_eq!(doc.declared_encoding(), Some(UTF_8));
    assert_eq!(doc.stream_encoding(), None);
    assert!(doc.errors().is_empty());
}

#[test]
fn test_charset_attribute_declares_encoding() {
    let doc = HtmlDocument::parse(r#"<meta charset="ISO-8859-1"><p>x"#).unwrap();
    assert_eq!(doc.declared_encoding(), Some(WINDOWS_1252));
}

#[test]
fn test_read_encoding_off_ignores_meta() {
    let options = ParseOptions::default().with_read_encoding(false);
    let doc = HtmlDocument::parse_with_options(HTTP_EQUIV, &options).unwrap();
    assert_eq!(doc.declared_encoding(), None);
}

#[test]
fn test_unknown_label_is_ignored() {
    let doc = HtmlDocument::parse(r#"<meta charset="x-klingon"><p>x</p>"#).unwrap();
    assert_eq!(doc.declared_encoding(), None);
    assert!(doc.select_single("//p").unwrap().is_some());
}

#[test]
fn test_detection_only_halts_at_declaration() {
    let options = ParseOptions::default();
    let matcher = CharsetMatcher::new().unwrap();
    let doc = HtmlParser::new(HTTP_EQUIV, &options, &matcher)
        .detect_only()
        .run()
        .unwrap();

    assert_eq!(doc.declared_encoding(), Some(UTF_8));
    assert!(doc.select("//body").unwrap().is_empty());
    assert_eq!(doc.select("//meta").unwrap().len(), 1);
}

#[test]
fn test_detection_only_reads_past_unknown_labels() {
    let html = r#"<meta charset="bogus"><meta charset="windows-1252"><body>"#;
    let detected = HtmlDocument::detect_encoding(html, &ParseOptions::default()).unwrap();
    assert_eq!(detected, Some(WINDOWS_1252));
}

#[test]
fn test_detect_encoding_without_declaration() {
    let detected =
        HtmlDocument::detect_encoding("<p>no meta here</p>", &ParseOptions::default()).unwrap();
    assert_eq!(detected, None);
}

#[test]
fn test_load_bytes_reports_mismatch() {
    let bytes = b"<meta charset=\"windows-1252\"><p>caf\xC3\xA9</p>";
    let doc = HtmlDocument::load_bytes(bytes, &ParseOptions::default()).unwrap();

    assert_eq!(doc.stream_encoding(), Some(UTF_8));
    assert_eq!(doc.declared_encoding(), Some(WINDOWS_1252));
    let error = &doc.errors()[0];
    assert_eq!(error.code, ParseErrorCode::CharsetMismatch);
    assert_eq!(
        error.reason,
        "Encoding mismatch between StreamEncoding: UTF-8 and DeclaredEncoding: windows-1252"
    );
    let p = doc.select_single("//p").unwrap().unwrap();
    assert_eq!(doc.tree().inner_text(p), "caf\u{e9}");
}

#[test]
fn test_load_bytes_honors_bom() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "<b>hi</b>".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let options = ParseOptions::default().with_default_stream_encoding(WINDOWS_1252);
    let doc = HtmlDocument::load_bytes(&bytes, &options).unwrap();

    assert_eq!(doc.stream_encoding(), Some(UTF_16LE));
    assert_eq!(doc.tree().inner_text(NodeId::ROOT), "hi");
}

#[test]
fn test_detect_encoding_and_load_uses_declaration() {
    let bytes = b"<meta charset=\"windows-1252\"><p>caf\xE9</p>";
    let options = ParseOptions::default();

    assert_eq!(
        HtmlDocument::detect_encoding_bytes(bytes, &options).unwrap(),
        Some(WINDOWS_1252)
    );
    let doc = HtmlDocument::detect_encoding_and_load(bytes, &options).unwrap();
    assert_eq!(doc.stream_encoding(), Some(WINDOWS_1252));
    assert!(doc.errors().is_empty());
    let p = doc.select_single("//p").unwrap().unwrap();
    assert_eq!(doc.tree().inner_text(p), "caf\u{e9}");
}

#[test]
fn test_xml_declaration_uses_document_encoding() {
    let bytes = b"<meta charset=\"windows-1252\"><p>x</p>";
    let options = ParseOptions::default().with_xml_output(true);
    let doc = HtmlDocument::detect_encoding_and_load(bytes, &options).unwrap();
    assert!(
        doc.save()
            .starts_with(r#"<?xml version="1.0" encoding="windows-1252"?>"#)
    );
}

#[test]
fn test_one_matcher_serves_many_documents() {
    let matcher = CharsetMatcher::new().unwrap();
    let options = ParseOptions::default();

    let text = HtmlDocument::parse_with_matcher(HTTP_EQUIV, &options, &matcher).unwrap();
    assert_eq!(text.declared_encoding(), Some(UTF_8));

    let bytes = b"<meta charset=\"windows-1252\"><p>caf\xE9</p>";
    let loaded =
        HtmlDocument::detect_encoding_and_load_with_matcher(bytes, &options, &matcher).unwrap();
    assert_eq!(loaded.stream_encoding(), Some(WINDOWS_1252));
    assert!(loaded.errors().is_empty());

    let plain = HtmlDocument::load_bytes_with_matcher(b"<p>x</p>", &options, &matcher).unwrap();
    assert_eq!(plain.stream_encoding(), Some(UTF_8));

    assert_eq!(
        loaded.matcher().charset_from_content("text/html; charset=latin1"),
        Some("latin1")
    );
}

#[test]
fn test_fragments_parse_with_the_document_matcher() {
    let matcher = CharsetMatcher::new().unwrap();
    let options = ParseOptions::default();
    let mut doc = HtmlDocument::parse_with_matcher("<ul></ul>", &options, &matcher).unwrap();
    let ul = doc.select_single("//ul").unwrap().unwrap();
    doc.set_inner_html(ul, "<li>a<li>b").unwrap();
    assert_eq!(doc.tree().children(ul).len(), 1);
    assert_eq!(doc.tree().inner_text(ul), "ab");
}
