//! The threaded pipeline: streaming, cancellation, serialization and logging.

use std::io::Cursor;
use std::thread;

use asciidoc_pipeline::asg::Block;
use asciidoc_pipeline::{
    CancellationToken, Config, DiagnosticKind, ParseError, parse_document, parse_file,
    parse_with_cancellation, scan_fragments,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("asciidoc_pipeline=debug"))
        .with_test_writer()
        .try_init();
}

// --- Fragment stream ---

#[test]
fn fragment_offsets_match_source_lines() {
    let input = "= Title\n:a: 1\n\npara one\nstill one\n\n\n----\ncode\n\nmore\n----\n\nlast";
    let fragments: Vec<_> = scan_fragments(Cursor::new(input.as_bytes().to_vec()), &Config::default())
        .collect();
    let source: Vec<&str> = input.lines().collect();
    for fragment in &fragments {
        let lines = fragment.lines.as_ref().expect("lines");
        for (k, line) in lines.iter().enumerate() {
            assert_eq!(line.text, source[fragment.line_offset + k - 1]);
        }
    }
    let offsets: Vec<usize> = fragments.iter().map(|f| f.line_offset).collect();
    assert_eq!(offsets, vec![1, 4, 8, 14]);
}

#[test]
fn cancelled_stream_sends_at_most_one_more_fragment() {
    let input = "block\n\n".repeat(10_000);
    let mut stream = scan_fragments(Cursor::new(input.into_bytes()), &Config::default());
    let first = stream.next().expect("first fragment");
    assert_eq!(first.line_offset, 1);
    stream.cancel();
    let after: Vec<_> = stream.by_ref().collect();
    assert!(after.len() <= 1, "received {} fragments after cancel", after.len());
}

#[test]
fn cancellation_from_another_thread() {
    let token = CancellationToken::new();
    let remote = token.clone();
    let input = "para\n\n".repeat(50_000);
    let handle = thread::spawn(move || remote.cancel());
    handle.join().expect("cancel thread");
    let result = parse_with_cancellation(input.as_bytes(), &Config::default(), &token);
    assert!(matches!(result, Err(ParseError::Cancelled)));
}

// --- Concurrency ---

#[test]
fn documents_with_includes_parse_in_parallel() {
    let dirs: Vec<TempDir> = (0..4)
        .map(|n| {
            let dir = TempDir::new().expect("tempdir");
            std::fs::write(dir.path().join("main.adoc"), "include::part.adoc[]").expect("write");
            std::fs::write(dir.path().join("part.adoc"), format!("part {n}")).expect("write");
            dir
        })
        .collect();
    let results: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = dirs
            .iter()
            .map(|dir| {
                scope.spawn(move || {
                    let (doc, _) =
                        parse_file(dir.path().join("main.adoc"), &Config::default()).expect("parse");
                    match &doc.blocks[0] {
                        Block::Paragraph(p) => asciidoc_pipeline::asg::plain_text(&p.lines[0]),
                        other => panic!("expected paragraph, got {other:?}"),
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("join")).collect()
    });
    assert_eq!(results, vec!["part 0", "part 1", "part 2", "part 3"]);
}

// --- Serialization ---

#[test]
fn document_serializes_to_json() {
    let (doc, _) = parse_document("= T\n\n*hi*", &Config::default()).expect("parse");
    let value = serde_json::to_value(&doc).expect("serialize");
    let empty_attributes = json!({
        "id": null,
        "reftext": null,
        "style": null,
        "roles": [],
        "options": [],
        "title": null,
        "positional": [],
        "named": {}
    });
    assert_eq!(
        value,
        json!({
            "attributes": { "doctitle": "T" },
            "header": {
                "title": [{ "text": "T" }],
                "authors": [],
                "revision": null
            },
            "front_matter": null,
            "blocks": [{
                "type": "paragraph",
                "attributes": empty_attributes,
                "lines": [[{
                    "quoted_text": {
                        "kind": "strong",
                        "elements": [{ "text": "hi" }]
                    }
                }]]
            }]
        })
    );
}

// --- Logging ---

#[test]
fn diagnostics_are_returned_with_a_subscriber_installed() {
    init_tracing();
    let (doc, diagnostics) =
        parse_document("....\nnever closed", &Config::default()).expect("parse");
    let Block::Delimited(block) = &doc.blocks[0] else {
        panic!("expected delimited block");
    };
    assert!(block.synthetic_close);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnclosedBlock);
    assert_eq!(diagnostics[0].line, Some(1));
    assert_eq!(diagnostics[0].message, "unclosed literal block starting on line 1");
}
