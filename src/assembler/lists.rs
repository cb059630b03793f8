//! Lists, list items and list continuations.
//!
//! Items nest by marker identity. A marker that matches a list already
//! open above the nearest section or delimited block closes back to that
//! list; any other marker opens a new list inside the current item.

use crate::asg::{BlockAttributes, List, ListItem};
use crate::fragment::ListMarker;
use crate::subs;

use super::{Assembler, Open, State};

/// A list item whose principal text may still grow.
#[derive(Debug)]
pub(super) struct OpenItem {
    pub(super) line: usize,
    pub(super) item: ListItem,
    pub(super) lines: Vec<String>,
    /// Plain lines still join the principal text.
    pub(super) text_open: bool,
    /// A `+` was seen; the next block attaches to this item.
    pub(super) attach_next: bool,
}

impl State {
    /// Substitute the collected principal text, once.
    pub(super) fn finish_item_text(&mut self, item: &mut OpenItem) {
        if !item.text_open {
            return;
        }
        item.text_open = false;
        let lines = std::mem::take(&mut item.lines);
        let hardbreaks = self.hardbreaks();
        item.item.principal = self.substitute(&lines, subs::NORMAL, hardbreaks, item.line);
    }
}

impl Assembler {
    pub(super) fn list_item(&mut self, line: usize, marker: ListMarker) {
        self.begin_body();
        self.end_text();

        let boundary = self
            .stack
            .iter()
            .rposition(|open| matches!(open, Open::Section(_) | Open::Delimited(_)))
            .map_or(0, |index| index + 1);
        let matching = self.stack[boundary..].iter().rposition(|open| {
            matches!(open, Open::List(list) if list.kind == marker.kind && list.marker == marker.marker)
        });

        let attributes = match matching {
            Some(index) => {
                while self.stack.len() > boundary + index + 1 {
                    self.pop();
                }
                self.take_attributes()
            }
            None => {
                let nests = match self.stack.last_mut() {
                    Some(Open::Item(item)) => {
                        item.attach_next = false;
                        true
                    }
                    _ => false,
                };
                if !nests {
                    self.prepare();
                }
                let attributes = self.take_attributes();
                tracing::trace!(line, marker = %marker.marker, "list opened");
                self.stack.push(Open::List(List {
                    kind: marker.kind,
                    marker: marker.marker.clone(),
                    attributes,
                    items: Vec::new(),
                }));
                BlockAttributes::default()
            }
        };

        let ListMarker {
            term,
            checkbox,
            text,
            ..
        } = marker;
        let term = term.map(|term| self.state.substitute_one(&term, subs::NORMAL, line));
        let lines = if text.is_empty() { Vec::new() } else { vec![text] };
        self.stack.push(Open::Item(OpenItem {
            line,
            item: ListItem {
                attributes,
                term,
                checkbox,
                ..ListItem::default()
            },
            lines,
            text_open: true,
            attach_next: false,
        }));
    }

    /// A lone `+`: the next block belongs to the current item.
    pub(super) fn continuation(&mut self, line: usize) {
        self.end_text();
        match self.stack.last_mut() {
            Some(Open::Item(item)) => item.attach_next = true,
            _ => self.line(line, "+".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::asg::{Block, BlockKind, InlineElement};
    use crate::assembler::tests::assemble;
    use crate::fragment::{Checkbox, ListKind};

    fn list(block: &Block) -> &List {
        match block {
            Block::List(list) => list,
            other => panic!("expected list, got {other:?}"),
        }
    }

    fn text(value: &str) -> Vec<InlineElement> {
        vec![InlineElement::text(value)]
    }

    #[test]
    fn items_share_one_list() {
        let doc = assemble("* a\n* b\n\n* c");
        assert_eq!(doc.blocks.len(), 1);
        let list = list(&doc.blocks[0]);
        assert_eq!(list.kind, ListKind::Unordered);
        assert_eq!(list.items.len(), 3);
        assert_eq!(list.items[2].principal, vec![text("c")]);
    }

    #[test]
    fn deeper_marker_nests_in_current_item() {
        let doc = assemble("* a\n** b\n** c\n* d");
        let outer = list(&doc.blocks[0]);
        assert_eq!(outer.items.len(), 2);
        let inner = list(&outer.items[0].blocks[0]);
        assert_eq!(inner.marker, "**");
        assert_eq!(inner.items.len(), 2);
        assert!(outer.items[1].blocks.is_empty());
    }

    #[test]
    fn continuation_lines_join_principal_text() {
        let doc = assemble(". first\nstill first\n. second");
        let list = list(&doc.blocks[0]);
        assert_eq!(list.kind, ListKind::Ordered);
        assert_eq!(list.items[0].principal, vec![text("first"), text("still first")]);
    }

    #[test]
    fn list_continuation_attaches_blocks() {
        let doc = assemble("* a\n+\n----\ncode\n----\n* b");
        let list = list(&doc.blocks[0]);
        assert_eq!(list.items.len(), 2);
        let [Block::Delimited(block)] = list.items[0].blocks.as_slice() else {
            panic!("expected attached listing, got {:?}", list.items[0].blocks);
        };
        assert_eq!(block.kind, BlockKind::Listing);
    }

    #[test]
    fn paragraph_after_blank_ends_list() {
        let doc = assemble("* a\n\nafter");
        assert_eq!(doc.blocks.len(), 2);
        assert!(matches!(doc.blocks[1], Block::Paragraph(_)));
    }

    #[test]
    fn labeled_items_carry_terms() {
        let doc = assemble("CPU:: the brain\nRAM::\n  memory");
        let list = list(&doc.blocks[0]);
        assert_eq!(list.kind, ListKind::Labeled);
        assert_eq!(list.items[0].term, Some(text("CPU")));
        assert_eq!(list.items[1].principal, vec![text("memory")]);
    }

    #[test]
    fn checklist_items() {
        let doc = assemble("* [x] done\n* [ ] todo");
        let list = list(&doc.blocks[0]);
        assert_eq!(list.items[0].checkbox, Some(Checkbox::Checked));
        assert_eq!(list.items[1].checkbox, Some(Checkbox::Unchecked));
        assert_eq!(list.items[1].principal, vec![text("todo")]);
    }

    #[test]
    fn counters_in_items_follow_source_order() {
        let doc = assemble("* {counter:n}\n* {counter:n}");
        let list = list(&doc.blocks[0]);
        assert_eq!(list.items[0].principal, vec![text("1")]);
        assert_eq!(list.items[1].principal, vec![text("2")]);
    }

    #[test]
    fn list_attributes_attach_to_the_list() {
        let doc = assemble("[square]\n* a");
        assert_eq!(list(&doc.blocks[0]).attributes.style.as_deref(), Some("square"));
    }
}
