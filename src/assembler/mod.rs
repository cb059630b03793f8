//! The block assembler: components to the document tree.
//!
//! The assembler keeps a stack of open containers. Each component either
//! extends the container on top (a line joins the open paragraph, a raw
//! line joins a verbatim block) or closes containers until one can take
//! the new block. Closing a container turns it into a [`Block`] and
//! appends it to the container below, so every block is owned by exactly
//! one parent at all times.
//!
//! Inline content is substituted as soon as it is complete, in source
//! order, so counters and attribute declarations apply to exactly the
//! blocks that follow them.

mod blocks;
mod lists;
mod sections;

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use crate::asg::{
    Block, BlockAttributes, Document, Header, InlineElement, List, Paragraph, Section,
};
use crate::attributes::AttributeTable;
use crate::config::Config;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::fragment::{AttributeList, Delimiter, DelimiterKind};
use crate::grammar::{Component, PositionedComponent, resolve_attributes};
use crate::subs::{self, Counters, Substitution, SubstitutionContext};

use blocks::OpenDelimited;
use lists::OpenItem;

/// A container that can still receive content.
#[derive(Debug)]
enum Open {
    Section(Section),
    Delimited(OpenDelimited),
    List(List),
    Item(OpenItem),
    Paragraph(OpenParagraph),
    FrontMatter { line: usize, lines: Vec<String> },
}

#[derive(Debug)]
struct OpenParagraph {
    line: usize,
    attributes: BlockAttributes,
    lines: Vec<String>,
}

/// Document-wide state the substitution engine reads and updates.
#[derive(Debug)]
struct State {
    attributes: AttributeTable,
    counters: Counters,
    diagnostics: Vec<Diagnostic>,
    ids: BTreeSet<String>,
}

impl State {
    fn substitute(
        &mut self,
        lines: &[String],
        subs: &[Substitution],
        hardbreaks: bool,
        line: usize,
    ) -> Vec<Vec<InlineElement>> {
        let mut ctx =
            SubstitutionContext::new(&self.attributes, &mut self.counters, &mut self.diagnostics)
                .at_line(line);
        subs::substitute_lines(lines, subs, hardbreaks, &mut ctx)
    }

    fn substitute_one(&mut self, text: &str, subs: &[Substitution], line: usize) -> Vec<InlineElement> {
        let mut ctx =
            SubstitutionContext::new(&self.attributes, &mut self.counters, &mut self.diagnostics)
                .at_line(line);
        subs::substitute_line(text, subs, &mut ctx)
    }

    fn hardbreaks(&self) -> bool {
        self.attributes.contains("hardbreaks-option")
    }
}

/// Folds positioned components into a [`Document`].
#[derive(Debug)]
pub struct Assembler {
    state: State,
    stack: Vec<Open>,
    root: Vec<Block>,
    header: Option<Header>,
    front_matter: Option<Vec<String>>,
    snapshot: Option<BTreeMap<String, String>>,
    pending: AttributeList,
    pending_title: Option<(usize, String)>,
    fill_section_gaps: bool,
}

impl Assembler {
    /// An assembler seeded with the caller attributes of `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            state: State {
                attributes: AttributeTable::from_caller(&config.attributes),
                counters: Counters::default(),
                diagnostics: Vec::new(),
                ids: BTreeSet::new(),
            },
            stack: Vec::new(),
            root: Vec::new(),
            header: None,
            front_matter: None,
            snapshot: None,
            pending: AttributeList::default(),
            pending_title: None,
            fill_section_gaps: config.fill_section_gaps,
        }
    }

    /// The live document attributes.
    #[must_use]
    pub fn attributes(&self) -> &AttributeTable {
        &self.state.attributes
    }

    /// Record a diagnostic raised by an earlier stage. It has already
    /// been logged.
    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.state.diagnostics.push(diagnostic);
    }

    /// Feed the next component.
    pub fn push(&mut self, component: PositionedComponent) {
        let PositionedComponent { line, component } = component;
        match component {
            Component::BlankLine => self.blank(),
            Component::Comment(_) => {}
            Component::Line(text) => self.line(line, text),
            Component::AttributeDeclaration { name, value } => {
                self.end_text();
                self.state.attributes.apply(&name, value.as_deref());
            }
            Component::AttributeList(list) => self.pending.merge(list),
            Component::Title(title) => self.pending_title = Some((line, title)),
            Component::DocumentTitle(title) => self.document_title(line, &title),
            Component::Authors(authors) => self.authors(authors),
            Component::Revision(revision) => self.revision(revision),
            Component::SectionHeader { level, title } => self.section(line, level, &title),
            Component::DelimiterOpen {
                delimiter,
                language,
                verbatim,
            } => self.open_delimited(line, delimiter, language, verbatim),
            Component::DelimiterClose { delimiter } => self.close_delimited(delimiter),
            Component::ListElementHeader(marker) => self.list_item(line, marker),
            Component::ListContinuation => self.continuation(line),
            Component::Admonition { label, text } => {
                self.paragraph(line, text, Some(label.to_lowercase()));
            }
            Component::BlockMacro {
                target, attributes, ..
            } => self.image(line, target, &attributes),
            Component::ThematicBreak => self.leaf(Block::ThematicBreak),
            Component::PageBreak => self.leaf(Block::PageBreak),
            Component::Unresolved { message } => {
                self.prepare();
                self.append(Block::Paragraph(Paragraph {
                    attributes: BlockAttributes::default(),
                    lines: vec![vec![InlineElement::Text(message)]],
                }));
            }
        }
    }

    /// Close everything still open and return the document with every
    /// diagnostic raised along the way.
    #[must_use]
    pub fn finish(mut self) -> (Document, Vec<Diagnostic>) {
        while let Some(open) = self.stack.last_mut() {
            match open {
                Open::Delimited(block) => {
                    block.synthetic_close = true;
                    Diagnostic::warning(
                        DiagnosticKind::UnclosedBlock,
                        Some(block.line),
                        format!("unclosed {} block starting on line {}", block.describe(), block.line),
                    )
                    .emit(&mut self.state.diagnostics);
                }
                Open::FrontMatter { line, .. } => {
                    Diagnostic::warning(
                        DiagnosticKind::UnclosedBlock,
                        Some(*line),
                        format!("unclosed front matter starting on line {line}"),
                    )
                    .emit(&mut self.state.diagnostics);
                }
                _ => {}
            }
            self.pop();
        }
        let attributes = self
            .snapshot
            .take()
            .unwrap_or_else(|| self.state.attributes.to_map());
        let document = Document {
            attributes,
            header: self.header,
            front_matter: self.front_matter,
            blocks: self.root,
        };
        (document, self.state.diagnostics)
    }

    // ── Stack ────────────────────────────────────────────────────────

    /// Fix `Document::attributes` once the first body block arrives.
    fn begin_body(&mut self) {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.state.attributes.to_map());
        }
    }

    /// Close the open paragraph and the open item text.
    fn end_text(&mut self) {
        if matches!(self.stack.last(), Some(Open::Paragraph(_))) {
            self.pop();
        }
        if let Some(Open::Item(item)) = self.stack.last_mut() {
            self.state.finish_item_text(item);
        }
    }

    /// Make the top of the stack a container that accepts a new block.
    fn prepare(&mut self) {
        self.begin_body();
        self.end_text();
        if let Some(Open::Item(item)) = self.stack.last_mut() {
            if item.attach_next {
                item.attach_next = false;
                return;
            }
        }
        while matches!(self.stack.last(), Some(Open::Item(_) | Open::List(_))) {
            self.pop();
        }
    }

    /// Close the top container and hand it to its parent.
    fn pop(&mut self) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        match open {
            Open::Paragraph(paragraph) => {
                if let Some(block) = self.finish_paragraph(paragraph) {
                    self.append(block);
                }
            }
            Open::Delimited(delimited) => {
                tracing::debug!(kind = delimited.describe(), line = delimited.line, "block closed");
                if let Some(block) = self.finish_delimited(delimited) {
                    self.append(block);
                }
            }
            Open::Section(section) => {
                tracing::debug!(level = section.level, "section closed");
                self.append(Block::Section(section));
            }
            Open::List(list) => self.append(Block::List(list)),
            Open::Item(mut item) => {
                self.state.finish_item_text(&mut item);
                if let Some(Open::List(list)) = self.stack.last_mut() {
                    list.items.push(item.item);
                }
            }
            Open::FrontMatter { lines, .. } => self.front_matter = Some(lines),
        }
    }

    fn append(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Open::Section(section)) => section.blocks.push(block),
            Some(Open::Delimited(delimited)) => delimited.blocks.push(block),
            Some(Open::Item(item)) => item.item.blocks.push(block),
            _ => self.root.push(block),
        }
    }

    /// Take the pending attribute list and title for the next block.
    fn take_attributes(&mut self) -> BlockAttributes {
        let list = mem::take(&mut self.pending);
        let mut attributes = resolve_attributes(&list);
        if let Some((line, title)) = self.pending_title.take() {
            attributes.title = Some(self.state.substitute_one(&title, subs::NORMAL, line));
        }
        if let Some(id) = &attributes.id {
            self.state.ids.insert(id.clone());
        }
        attributes
    }

    // ── Components ───────────────────────────────────────────────────

    fn blank(&mut self) {
        if matches!(self.stack.last(), Some(Open::Paragraph(_))) {
            self.pop();
        }
        if let Some(Open::Item(item)) = self.stack.last_mut() {
            self.state.finish_item_text(item);
        }
    }

    fn line(&mut self, line: usize, text: String) {
        match self.stack.last_mut() {
            Some(Open::Paragraph(paragraph)) => paragraph.lines.push(text),
            Some(Open::Delimited(delimited)) if delimited.verbatim => delimited.lines.push(text),
            Some(Open::FrontMatter { lines, .. }) => lines.push(text),
            Some(Open::Item(item)) if item.text_open => {
                item.lines.push(text.trim_start().to_string());
            }
            _ => self.paragraph(line, text, None),
        }
    }

    fn paragraph(&mut self, line: usize, text: String, style: Option<String>) {
        self.prepare();
        let mut attributes = self.take_attributes();
        if attributes.style.is_none() {
            attributes.style = style;
        }
        self.stack.push(Open::Paragraph(OpenParagraph {
            line,
            attributes,
            lines: vec![text],
        }));
    }

    fn leaf(&mut self, block: Block) {
        self.prepare();
        self.take_attributes();
        self.append(block);
    }

    fn open_delimited(
        &mut self,
        line: usize,
        delimiter: Delimiter,
        language: Option<String>,
        verbatim: bool,
    ) {
        if delimiter.kind == DelimiterKind::FrontMatter {
            self.stack.push(Open::FrontMatter {
                line,
                lines: Vec::new(),
            });
            return;
        }
        self.prepare();
        let mut attributes = self.take_attributes();
        if let Some(language) = language {
            attributes.style.get_or_insert_with(|| "source".to_string());
            attributes.named.entry("language".to_string()).or_insert(language);
        }
        let block = OpenDelimited::new(line, delimiter, verbatim, attributes, &mut self.state.diagnostics);
        tracing::debug!(kind = block.describe(), line, "block opened");
        self.stack.push(Open::Delimited(block));
    }

    fn close_delimited(&mut self, delimiter: Delimiter) {
        let index = self.stack.iter().rposition(|open| match open {
            Open::Delimited(block) => block.delimiter == delimiter,
            Open::FrontMatter { .. } => delimiter.kind == DelimiterKind::FrontMatter,
            _ => false,
        });
        let Some(index) = index else {
            tracing::debug!(?delimiter, "close delimiter without an open block");
            return;
        };
        while self.stack.len() > index {
            self.pop();
        }
    }
}
