//! Placeholder shielding for the substitution phases.
//!
//! A line under substitution is kept as flat text. Whenever a phase turns
//! part of it into inline elements, those elements go into a side table and
//! the text gets a single private-use character in their place. Later
//! phases only ever see plain text and opaque placeholders, so nothing they
//! do can reach into content an earlier phase has already produced.

use crate::asg::InlineElement;

/// First code point of supplementary private use area B.
const MARKER_BASE: u32 = 0x10_0000;
/// Last usable code point of that area.
const MARKER_LAST: u32 = 0x10_FFFD;

/// The placeholder character for table entry `index`.
///
/// Indexes beyond the private use area wrap onto the last code point.
#[must_use]
pub fn element_marker(index: usize) -> char {
    u32::try_from(index)
        .ok()
        .and_then(|i| MARKER_BASE.checked_add(i))
        .filter(|cp| *cp <= MARKER_LAST)
        .and_then(char::from_u32)
        .unwrap_or('\u{10FFFD}')
}

/// The table index a placeholder character stands for.
#[must_use]
pub fn element_index(c: char) -> Option<usize> {
    let cp = u32::from(c);
    (MARKER_BASE..=MARKER_LAST)
        .contains(&cp)
        .then(|| (cp - MARKER_BASE) as usize)
}

/// A line of text with shielded inline elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shielded {
    /// Flat text with placeholder characters.
    pub text: String,
    table: Vec<Vec<InlineElement>>,
}

impl Shielded {
    /// Wrap `line`. Private-use characters already present in the source are
    /// shielded as text right away so they cannot be mistaken for
    /// placeholders.
    #[must_use]
    pub fn new(line: &str) -> Self {
        let mut shielded = Self::default();
        if line.chars().any(|c| element_index(c).is_some()) {
            let mut text = String::with_capacity(line.len());
            for c in line.chars() {
                if element_index(c).is_some() {
                    text.push(shielded.shield(vec![InlineElement::Text(c.to_string())]));
                } else {
                    text.push(c);
                }
            }
            shielded.text = text;
        } else {
            shielded.text = line.to_string();
        }
        shielded
    }

    /// Store `elements` and return the placeholder that stands for them.
    pub fn shield(&mut self, elements: Vec<InlineElement>) -> char {
        self.table.push(elements);
        element_marker(self.table.len() - 1)
    }

    /// The elements stored for placeholder `c`.
    #[must_use]
    pub fn lookup(&self, c: char) -> Option<&[InlineElement]> {
        element_index(c)
            .and_then(|i| self.table.get(i))
            .map(Vec::as_slice)
    }

    /// The raw character a placeholder holding a single special character
    /// stands for.
    #[must_use]
    pub fn special(&self, c: char) -> Option<char> {
        match self.lookup(c) {
            Some([InlineElement::SpecialCharacter(raw)]) => Some(*raw),
            _ => None,
        }
    }

    /// Whether `c` is `raw`, either literally or as a shielded special
    /// character.
    #[must_use]
    pub fn is_char(&self, c: char, raw: char) -> bool {
        c == raw || self.special(c) == Some(raw)
    }

    /// `segment` with every placeholder replaced by the plain text of its
    /// elements. Used for link targets and other values that must be
    /// strings.
    #[must_use]
    pub fn plain(&self, segment: &str) -> String {
        let mut out = String::with_capacity(segment.len());
        for c in segment.chars() {
            match self.lookup(c) {
                Some(elements) => out.push_str(&crate::asg::plain_text(elements)),
                None => out.push(c),
            }
        }
        out
    }

    /// Expand `segment` into inline elements.
    #[must_use]
    pub fn elements(&self, segment: &str) -> Vec<InlineElement> {
        let mut out = Vec::new();
        let mut text = String::new();
        for c in segment.chars() {
            match self.lookup(c) {
                Some(elements) => {
                    if !text.is_empty() {
                        push_merged(&mut out, InlineElement::Text(std::mem::take(&mut text)));
                    }
                    for element in elements {
                        push_merged(&mut out, element.clone());
                    }
                }
                None => text.push(c),
            }
        }
        if !text.is_empty() {
            push_merged(&mut out, InlineElement::Text(text));
        }
        out
    }

    /// Expand the whole line.
    #[must_use]
    pub fn expand(&self) -> Vec<InlineElement> {
        self.elements(&self.text)
    }
}

/// Push `element`, merging it into a preceding text element.
pub(crate) fn push_merged(out: &mut Vec<InlineElement>, element: InlineElement) {
    if let InlineElement::Text(next) = &element {
        if next.is_empty() {
            return;
        }
        if let Some(InlineElement::Text(prev)) = out.last_mut() {
            prev.push_str(next);
            return;
        }
    }
    out.push(element);
}
