//! Sections, discrete headings, generated ids and the document header.

use crate::asg::{self, Author, Block, BlockAttributes, DiscreteHeading, Header, Revision, Section};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::subs;

use super::{Assembler, Open, State};

impl State {
    /// Derive an id from a section title.
    ///
    /// Lowercase, keep alphanumerics, join words with `idseparator`,
    /// prefix with `idprefix`, then suffix a counter on collision. Returns
    /// `None` when `sectids` is unset.
    fn generate_id(&mut self, title: &[asg::InlineElement]) -> Option<String> {
        if self.attributes.is_unset("sectids") {
            return None;
        }
        let prefix = self.attributes.get("idprefix").unwrap_or("_");
        let separator = self.attributes.get("idseparator").unwrap_or("_");

        let mut slug = String::from(prefix);
        let mut pending = false;
        for ch in asg::plain_text(title).chars() {
            if ch.is_alphanumeric() {
                if pending && slug.len() > prefix.len() {
                    slug.push_str(separator);
                }
                pending = false;
                slug.extend(ch.to_lowercase());
            } else if ch.is_whitespace() || matches!(ch, '-' | '_' | '.') {
                pending = true;
            }
        }

        let mut id = slug.clone();
        let mut n = 2;
        while self.ids.contains(&id) {
            id = format!("{slug}{separator}{n}");
            n += 1;
        }
        self.ids.insert(id.clone());
        Some(id)
    }
}

impl Assembler {
    pub(super) fn section(&mut self, line: usize, level: u8, title: &str) {
        self.prepare();
        let mut attributes = self.take_attributes();
        let title = self.state.substitute_one(title, subs::NORMAL, line);
        if attributes.id.is_none() {
            attributes.id = self.state.generate_id(&title);
        }

        let discrete = matches!(attributes.style.as_deref(), Some("discrete" | "float"))
            || self.stack.iter().any(|open| !matches!(open, Open::Section(_)));
        if discrete {
            self.append(Block::DiscreteHeading(DiscreteHeading {
                level,
                title,
                attributes,
            }));
            return;
        }

        let level = if level == 0 {
            Diagnostic::warning(
                DiagnosticKind::SectionOutOfSequence,
                Some(line),
                "level 0 sections can only be used in the document header",
            )
            .emit(&mut self.state.diagnostics);
            1
        } else {
            level
        };

        while matches!(self.stack.last(), Some(Open::Section(s)) if s.level >= level) {
            self.pop();
        }
        let parent = match self.stack.last() {
            Some(Open::Section(s)) => s.level,
            _ => 0,
        };
        if level > parent + 1 {
            if self.fill_section_gaps {
                for filler in parent + 1..level {
                    self.stack.push(Open::Section(Section {
                        level: filler,
                        title: Vec::new(),
                        attributes: BlockAttributes::default(),
                        blocks: Vec::new(),
                    }));
                }
            } else {
                Diagnostic::warning(
                    DiagnosticKind::SectionOutOfSequence,
                    Some(line),
                    format!("section title out of sequence: expected level {}, got level {level}", parent + 1),
                )
                .emit(&mut self.state.diagnostics);
            }
        }

        tracing::debug!(level, line, "section opened");
        self.stack.push(Open::Section(Section {
            level,
            title,
            attributes,
            blocks: Vec::new(),
        }));
    }

    // ── Header ───────────────────────────────────────────────────────

    pub(super) fn document_title(&mut self, line: usize, title: &str) {
        self.pending = Default::default();
        self.pending_title = None;
        let inlines = self.state.substitute_one(title, subs::HEADER, line);
        self.state.attributes.apply("doctitle", Some(title));
        self.header = Some(Header {
            title: inlines,
            ..Header::default()
        });
    }

    pub(super) fn authors(&mut self, authors: Vec<Author>) {
        let table = &mut self.state.attributes;
        for (index, author) in authors.iter().enumerate() {
            let suffix = if index == 0 {
                String::new()
            } else {
                format!("_{}", index + 1)
            };
            table.apply(&format!("author{suffix}"), Some(&author.fullname));
            table.apply(&format!("firstname{suffix}"), Some(&author.firstname));
            table.apply(&format!("authorinitials{suffix}"), Some(&author.initials));
            if let Some(middle) = &author.middlename {
                table.apply(&format!("middlename{suffix}"), Some(middle));
            }
            if let Some(last) = &author.lastname {
                table.apply(&format!("lastname{suffix}"), Some(last));
            }
            if let Some(email) = &author.email {
                table.apply(&format!("email{suffix}"), Some(email));
            }
        }
        let names: Vec<&str> = authors.iter().map(|a| a.fullname.as_str()).collect();
        table.apply("authors", Some(&names.join(", ")));
        self.header.get_or_insert_with(Header::default).authors = authors;
    }

    pub(super) fn revision(&mut self, revision: Revision) {
        let table = &mut self.state.attributes;
        for (name, value) in [
            ("revnumber", &revision.number),
            ("revdate", &revision.date),
            ("revremark", &revision.remark),
        ] {
            if let Some(value) = value {
                table.apply(name, Some(value));
            }
        }
        self.header.get_or_insert_with(Header::default).revision = Some(revision);
    }
}
