//! Section level offsets for included content.

/// One `leveloffset` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LevelOffset {
    /// `+n` or `-n`: added to every level.
    Relative(i32),
    /// `n`: the level of the next section.
    Absolute(i32),
}

impl LevelOffset {
    /// Parse a `leveloffset` value.
    pub(super) fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(rest) = value.strip_prefix('+') {
            rest.parse().ok().map(Self::Relative)
        } else if value.starts_with('-') {
            value.parse().ok().map(Self::Relative)
        } else {
            value.parse().ok().map(Self::Absolute)
        }
    }
}

/// The offsets in force for one include context.
///
/// Every descent clones the stack, so offsets pushed by a child never
/// reach its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct LevelOffsets {
    stack: Vec<LevelOffset>,
}

impl LevelOffsets {
    pub(super) fn push(&mut self, offset: LevelOffset) {
        self.stack.push(offset);
    }

    /// Map a section level through the stack.
    ///
    /// An absolute entry fixes the level of the first section it meets.
    /// The stack then collapses to the relative shift that produced, so
    /// later sections keep their shape below it.
    pub(super) fn apply(&mut self, level: u8) -> u8 {
        let original = i32::from(level);
        let mut result = original;
        let mut absolute = false;
        for offset in &self.stack {
            match *offset {
                LevelOffset::Relative(n) => result += n,
                LevelOffset::Absolute(n) => {
                    result = n;
                    absolute = true;
                }
            }
        }
        if absolute {
            self.stack = vec![LevelOffset::Relative(result - original)];
        }
        u8::try_from(result.clamp(0, 5)).unwrap_or(5)
    }
}
