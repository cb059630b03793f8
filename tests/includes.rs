//! Include directives against include trees on disk.

use std::fs;
use std::path::{Path, PathBuf};

use asciidoc_pipeline::asg::{Block, BlockKind, plain_text};
use asciidoc_pipeline::attributes::AttributeTable;
use asciidoc_pipeline::preprocess::{FragmentSink, Preprocessed, Preprocessor};
use asciidoc_pipeline::scanner::Scanner;
use asciidoc_pipeline::{Config, Diagnostic, DiagnosticKind, ParseError, SafeMode, parse_file};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Write `files` under a fresh directory and return it with the path of
/// the first file.
fn tree(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, content).expect("write");
    }
    let root = dir.path().join(files[0].0);
    (dir, root)
}

fn paragraph_text(block: &Block) -> String {
    match block {
        Block::Paragraph(p) => p
            .lines
            .iter()
            .map(|line| plain_text(line))
            .collect::<Vec<_>>()
            .join("\n"),
        other => panic!("expected paragraph, got {other:?}"),
    }
}

// --- Splicing ---

#[test]
fn asciidoc_include_is_spliced_in_place() {
    let (_dir, root) = tree(&[
        ("main.adoc", "before\n\ninclude::child.adoc[]\n\nafter"),
        ("child.adoc", "from child\n\n* item"),
    ]);
    let (doc, diagnostics) = parse_file(&root, &Config::default()).expect("parse");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(doc.blocks.len(), 4);
    assert_eq!(paragraph_text(&doc.blocks[0]), "before");
    assert_eq!(paragraph_text(&doc.blocks[1]), "from child");
    assert!(matches!(doc.blocks[2], Block::List(_)));
    assert_eq!(paragraph_text(&doc.blocks[3]), "after");
}

#[test]
fn code_include_fills_a_listing() {
    let (_dir, root) = tree(&[
        ("main.adoc", "[source,rust]\n----\ninclude::src/lib.rs[]\n----"),
        ("src/lib.rs", "fn a() {}\nfn b() {}\nfn c() {}"),
    ]);
    let (doc, _) = parse_file(&root, &Config::default()).expect("parse");
    let Block::Delimited(block) = &doc.blocks[0] else {
        panic!("expected listing");
    };
    assert_eq!(block.kind, BlockKind::Listing);
    assert_eq!(block.attributes.language(), Some("rust"));
    let lines: Vec<String> = block.lines().iter().map(|l| plain_text(l)).collect();
    assert_eq!(lines, vec!["fn a() {}", "fn b() {}", "fn c() {}"]);
}

#[test]
fn nested_includes_resolve_against_their_own_directory() {
    let (_dir, root) = tree(&[
        ("main.adoc", "include::parts/one.adoc[]"),
        ("parts/one.adoc", "one\n\ninclude::two.adoc[]"),
        ("parts/two.adoc", "two"),
    ]);
    let (doc, diagnostics) = parse_file(&root, &Config::default()).expect("parse");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let texts: Vec<String> = doc.blocks.iter().map(paragraph_text).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[test]
fn include_target_expands_attributes() {
    let (_dir, root) = tree(&[
        ("main.adoc", ":part: chapter\n\ninclude::{part}.adoc[]"),
        ("chapter.adoc", "chapter text"),
    ]);
    let (doc, _) = parse_file(&root, &Config::default()).expect("parse");
    assert_eq!(paragraph_text(&doc.blocks[0]), "chapter text");
}

// --- Attribute scoping ---

#[test]
fn child_declarations_reach_the_parent_after_the_include() {
    let (_dir, root) = tree(&[
        ("main.adoc", "{shared}\n\ninclude::attrs.adoc[]\n\n{shared}"),
        ("attrs.adoc", ":shared: from child"),
    ]);
    let (doc, _) = parse_file(&root, &Config::default()).expect("parse");
    assert_eq!(paragraph_text(&doc.blocks[0]), "{shared}");
    assert_eq!(paragraph_text(&doc.blocks[1]), "from child");
}

#[test]
fn front_matter_in_an_include_is_fatal() {
    let (_dir, root) = tree(&[
        ("main.adoc", "include::meta.adoc[]\n\nbody"),
        ("meta.adoc", "---\ntitle: x\n---"),
    ]);
    let err = parse_file(&root, &Config::default()).expect_err("unsupported delimiter");
    assert!(
        matches!(err, ParseError::UnsupportedDelimiter { line: 1, .. }),
        "{err:?}"
    );
}

#[test]
fn level_zero_title_in_a_first_line_include_is_a_section() {
    let (_dir, root) = tree(&[
        ("main.adoc", "include::title.adoc[]"),
        ("title.adoc", "= Not The Doctitle\n\ntext"),
    ]);
    let (doc, _) = parse_file(&root, &Config::default()).expect("parse");
    assert!(doc.header.is_none());
    assert!(!doc.attributes.contains_key("doctitle"));
}

// --- Selection ---

#[test]
fn tags_and_lines_select_content() {
    let (_dir, root) = tree(&[
        (
            "main.adoc",
            "include::snippet.txt[tag=keep]\n\ninclude::snippet.txt[lines=1]",
        ),
        ("snippet.txt", "first\n// tag::keep[]\nkept\n// end::keep[]\nlast"),
    ]);
    let (doc, _) = parse_file(&root, &Config::default()).expect("parse");
    let texts: Vec<String> = doc.blocks.iter().map(paragraph_text).collect();
    assert_eq!(texts, vec!["kept", "first"]);
}

#[test]
fn reversed_line_range_is_unresolved() {
    let (_dir, root) = tree(&[
        ("main.adoc", "include::snippet.txt[lines=3..2]"),
        ("snippet.txt", "one\ntwo\nthree"),
    ]);
    let (doc, diagnostics) = parse_file(&root, &Config::default()).expect("parse");
    assert!(paragraph_text(&doc.blocks[0]).starts_with("Unresolved directive in "));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedInclude);
}

#[test]
fn leveloffset_shifts_included_sections() {
    let (_dir, root) = tree(&[
        ("main.adoc", "== Top\n\ninclude::child.adoc[leveloffset=+1]\n\n== Next"),
        ("child.adoc", "== Nested\n\ntext"),
    ]);
    let (doc, diagnostics) = parse_file(&root, &Config::default()).expect("parse");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(doc.blocks.len(), 2);
    let Block::Section(top) = &doc.blocks[0] else {
        panic!("expected section");
    };
    let Block::Section(nested) = &top.blocks[0] else {
        panic!("expected nested section, got {:?}", top.blocks);
    };
    assert_eq!(nested.level, 2);
    assert_eq!(plain_text(&nested.title), "Nested");
}

// --- Unresolved ---

#[test]
fn missing_include_becomes_a_paragraph_and_a_warning() {
    let (_dir, root) = tree(&[("main.adoc", "include::missing.adoc[]")]);
    let (doc, diagnostics) = parse_file(&root, &Config::default()).expect("parse");
    assert_eq!(
        paragraph_text(&doc.blocks[0]),
        format!("Unresolved directive in {} - include::missing.adoc[]", root.display())
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedInclude);
    assert_eq!(diagnostics[0].line, Some(1));
}

#[test]
fn fail_on_unresolved_is_fatal() {
    let (_dir, root) = tree(&[("main.adoc", "text\n\ninclude::missing.adoc[]")]);
    let config = Config::default().fail_on_unresolved(true);
    let err = parse_file(&root, &config).expect_err("fatal");
    assert!(matches!(err, ParseError::UnresolvedInclusion { .. }));
    assert!(err.to_string().ends_with("include::missing.adoc[]"));
}

#[test]
fn recursive_include_is_unresolved() {
    let (_dir, root) = tree(&[
        ("main.adoc", "include::loop.adoc[]"),
        ("loop.adoc", "loop\n\ninclude::loop.adoc[]"),
    ]);
    let (doc, diagnostics) = parse_file(&root, &Config::default()).expect("parse");
    assert_eq!(paragraph_text(&doc.blocks[0]), "loop");
    assert!(paragraph_text(&doc.blocks[1]).starts_with("Unresolved directive in "));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn safe_mode_jails_includes() {
    let (dir, _) = tree(&[
        ("docs/main.adoc", "include::../outside.adoc[]"),
        ("outside.adoc", "outside"),
    ]);
    let root = dir.path().join("docs/main.adoc");

    let (doc, _) = parse_file(&root, &Config::default()).expect("parse");
    assert!(paragraph_text(&doc.blocks[0]).starts_with("Unresolved directive"));

    let unsafe_mode = Config::default().with_safe_mode(SafeMode::Unsafe);
    let (doc, _) = parse_file(&root, &unsafe_mode).expect("parse");
    assert_eq!(paragraph_text(&doc.blocks[0]), "outside");

    let secure = Config::default().with_safe_mode(SafeMode::Secure);
    let (_, diagnostics) = parse_file(&root, &secure).expect("parse");
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedInclude);
}

// --- Line offsets ---

/// Records what the preprocessor hands on.
#[derive(Default)]
struct Record {
    attributes: AttributeTable,
    fragments: Vec<(usize, Vec<String>)>,
}

impl FragmentSink for Record {
    fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    fn accept(&mut self, item: Preprocessed) -> Result<(), ParseError> {
        if let Preprocessed::Fragment {
            line_offset, lines, ..
        } = item
        {
            self.fragments
                .push((line_offset, lines.into_iter().map(|l| l.text).collect()));
        }
        Ok(())
    }

    fn diagnostic(&mut self, _diagnostic: Diagnostic) {}
}

fn record(root: &Path) -> Record {
    let config = Config::default().with_filename(root);
    let source = fs::read_to_string(root).expect("read");
    let mut preprocessor = Preprocessor::new(&config);
    let mut sink = Record::default();
    for fragment in Scanner::new(source.as_bytes(), &config) {
        preprocessor.process(fragment, &mut sink).expect("process");
    }
    sink
}

#[test]
fn raw_include_lines_are_numbered_from_the_directive() {
    let (_dir, root) = tree(&[
        ("main.adoc", "----\ninclude::three.rs[]\n----"),
        ("three.rs", "a\nb\nc"),
    ]);
    let sink = record(&root);
    assert_eq!(
        sink.fragments,
        vec![
            (1, vec!["----".to_string()]),
            (2, vec!["a".to_string(), "b".to_string(), "c".to_string()]),
            (3, vec!["----".to_string()]),
        ]
    );
}

#[test]
fn asciidoc_include_lines_are_numbered_in_the_child() {
    let (_dir, root) = tree(&[
        ("main.adoc", "intro\n\ninclude::child.adoc[]"),
        ("child.adoc", "\nchild"),
    ]);
    let sink = record(&root);
    assert_eq!(sink.fragments[0], (1, vec!["intro".to_string(), String::new()]));
    assert_eq!(sink.fragments[1], (2, vec!["child".to_string()]));
}
