//! Paragraphs, delimited blocks and block macros.

use crate::asg::{
    Block, BlockAttributes, BlockContent, BlockImage, BlockKind, DelimitedBlock, Paragraph,
};
use crate::diagnostic::Diagnostic;
use crate::fragment::{AttributeList, Delimiter, DelimiterKind};
use crate::subs::{self, Substitution};

use super::{Assembler, Open, OpenParagraph};

/// Styles whose content passes through untouched.
const RAW_STYLES: [&str; 4] = ["pass", "stem", "latexmath", "asciimath"];

/// A delimited block that has not seen its closing delimiter yet.
#[derive(Debug)]
pub(super) struct OpenDelimited {
    pub(super) line: usize,
    pub(super) delimiter: Delimiter,
    pub(super) kind: BlockKind,
    pub(super) verbatim: bool,
    /// Comment blocks are collected like any other and then discarded.
    pub(super) dropped: bool,
    pub(super) attributes: BlockAttributes,
    pub(super) lines: Vec<String>,
    pub(super) blocks: Vec<Block>,
    /// Explicit `subs` of a compound block, inherited by its paragraphs.
    pub(super) subs: Option<Vec<Substitution>>,
    pub(super) synthetic_close: bool,
}

impl OpenDelimited {
    pub(super) fn new(
        line: usize,
        delimiter: Delimiter,
        verbatim: bool,
        attributes: BlockAttributes,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let style = attributes.style.as_deref();
        let dropped = delimiter.kind == DelimiterKind::Comment || style == Some("comment");
        let kind = kind_of(delimiter.kind, style, verbatim);
        let subs = match (verbatim, attributes.subs()) {
            (false, Some(spec)) => Some(subs::parse_subs(spec, subs::NORMAL, diagnostics)),
            _ => None,
        };
        Self {
            line,
            delimiter,
            kind,
            verbatim,
            dropped,
            attributes,
            lines: Vec::new(),
            blocks: Vec::new(),
            subs,
            synthetic_close: false,
        }
    }

    /// Name used in log lines and diagnostics.
    pub(super) fn describe(&self) -> &'static str {
        if self.dropped {
            return "comment";
        }
        match self.kind {
            BlockKind::Listing => "listing",
            BlockKind::Literal => "literal",
            BlockKind::Fenced => "fenced",
            BlockKind::Example => "example",
            BlockKind::Sidebar => "sidebar",
            BlockKind::Quote => "quote",
            BlockKind::Verse => "verse",
            BlockKind::Passthrough => "passthrough",
            BlockKind::Open => "open",
            BlockKind::Table => "table",
        }
    }
}

fn kind_of(delimiter: DelimiterKind, style: Option<&str>, verbatim: bool) -> BlockKind {
    match delimiter {
        DelimiterKind::Listing => BlockKind::Listing,
        DelimiterKind::Literal => BlockKind::Literal,
        DelimiterKind::Fenced => BlockKind::Fenced,
        DelimiterKind::Example => BlockKind::Example,
        DelimiterKind::Sidebar => BlockKind::Sidebar,
        DelimiterKind::Quote if verbatim || style == Some("verse") => BlockKind::Verse,
        DelimiterKind::Quote => BlockKind::Quote,
        DelimiterKind::Passthrough => BlockKind::Passthrough,
        DelimiterKind::Table => BlockKind::Table,
        DelimiterKind::Open => match style {
            Some("verse") => BlockKind::Verse,
            Some("source" | "listing") => BlockKind::Listing,
            Some("literal") => BlockKind::Literal,
            Some("pass") => BlockKind::Passthrough,
            _ => BlockKind::Open,
        },
        DelimiterKind::Comment | DelimiterKind::FrontMatter => BlockKind::Open,
    }
}

/// Phases a block of `kind` runs before its `subs` attribute edits them.
fn default_subs(kind: BlockKind, style: Option<&str>) -> &'static [Substitution] {
    if style.is_some_and(|s| RAW_STYLES.contains(&s)) {
        return subs::NONE;
    }
    match kind {
        BlockKind::Listing | BlockKind::Literal | BlockKind::Fenced => subs::VERBATIM,
        BlockKind::Passthrough | BlockKind::Table => subs::NONE,
        _ => subs::NORMAL,
    }
}

/// Strip the indentation every non-blank line shares.
fn strip_indent(lines: &mut [String]) {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    for line in lines.iter_mut() {
        let cut = indent.min(line.len() - line.trim_start().len());
        line.drain(..cut);
    }
}

impl Assembler {
    /// Subs inherited from the nearest compound block that set them.
    fn inherited_subs(&self) -> Option<Vec<Substitution>> {
        self.stack.iter().rev().find_map(|open| match open {
            Open::Delimited(block) => block.subs.clone(),
            _ => None,
        })
    }

    fn resolve_subs(&mut self, attributes: &BlockAttributes, default: &[Substitution]) -> Vec<Substitution> {
        match attributes.subs() {
            Some(spec) => subs::parse_subs(spec, default, &mut self.state.diagnostics),
            None => default.to_vec(),
        }
    }

    pub(super) fn finish_paragraph(&mut self, paragraph: OpenParagraph) -> Option<Block> {
        let OpenParagraph {
            line,
            mut attributes,
            mut lines,
        } = paragraph;
        let style = attributes.style.as_deref();
        if style == Some("comment") {
            return None;
        }
        let indented = style.is_none() && lines.first().is_some_and(|l| l.starts_with([' ', '\t']));
        let inherited;
        let default: &[Substitution] = match style {
            Some("listing" | "source" | "literal") => subs::VERBATIM,
            None if indented => subs::VERBATIM,
            Some(s) if RAW_STYLES.contains(&s) => subs::NONE,
            _ => {
                inherited = self.inherited_subs();
                inherited.as_deref().unwrap_or(subs::NORMAL)
            }
        };
        if indented || matches!(style, Some("literal" | "listing" | "source")) {
            strip_indent(&mut lines);
        }
        if indented {
            attributes.style = Some("literal".to_string());
        }
        let phases = self.resolve_subs(&attributes, default);
        let hardbreaks = attributes.has_option("hardbreaks") || self.state.hardbreaks();
        let lines = self.state.substitute(&lines, &phases, hardbreaks, line);
        Some(Block::Paragraph(Paragraph { attributes, lines }))
    }

    pub(super) fn finish_delimited(&mut self, block: OpenDelimited) -> Option<Block> {
        if block.dropped {
            return None;
        }
        let content = if block.verbatim {
            let mut lines = block.lines;
            let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
            lines.drain(..leading);
            while lines.last().is_some_and(|l| l.trim().is_empty()) {
                lines.pop();
            }
            let default = default_subs(block.kind, block.attributes.style.as_deref());
            let phases = self.resolve_subs(&block.attributes, default);
            let hardbreaks =
                block.attributes.has_option("hardbreaks") || self.state.hardbreaks();
            let first = block.line + 1 + leading;
            BlockContent::Lines(self.state.substitute(&lines, &phases, hardbreaks, first))
        } else {
            BlockContent::Blocks(block.blocks)
        };
        Some(Block::Delimited(DelimitedBlock {
            kind: block.kind,
            attributes: block.attributes,
            content,
            synthetic_close: block.synthetic_close,
        }))
    }

    /// `image::target[alt,width,height]`
    pub(super) fn image(&mut self, line: usize, target: String, list: &AttributeList) {
        self.prepare();
        let mut attributes = self.take_attributes();
        let target = subs::expand_references(&target, &self.state.attributes);
        let slots = ["alt", "width", "height"];
        for (index, slot) in slots.iter().enumerate() {
            if let Some(value) = list.positional(index) {
                attributes.named.insert((*slot).to_string(), value.to_string());
            }
        }
        for (name, value) in &list.named {
            match name.as_str() {
                "id" => attributes.id = Some(value.clone()),
                "role" => attributes
                    .roles
                    .extend(value.split_whitespace().map(str::to_string)),
                _ => {
                    attributes.named.insert(name.clone(), value.clone());
                }
            }
        }
        attributes
            .named
            .entry("alt".to_string())
            .or_insert_with(|| subs::default_alt(&target));
        tracing::trace!(line, %target, "block image");
        self.append(Block::Image(BlockImage { target, attributes }));
    }
}
