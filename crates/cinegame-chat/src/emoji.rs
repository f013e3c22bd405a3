//! Emoji sprite lookup for chat lines.

use std::collections::HashMap;

/// A sprite's location in the emoji atlas, in atlas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// One emoji found in a chat line.
#[derive(Debug, Clone, PartialEq)]
pub struct EmojiMatch {
    /// Position in the line, in chars.
    pub char_index: usize,
    pub sequence: String,
    pub rect: Rect,
}

/// Emoji sequence → atlas rectangle.
#[derive(Debug, Clone, Default)]
pub struct EmojiTable {
    entries: HashMap<String, Rect>,
    longest: usize,
}

impl EmojiTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sequence: impl Into<String>, rect: Rect) {
        let sequence = sequence.into();
        let len = sequence.chars().count();
        if len == 0 {
            return;
        }
        self.longest = self.longest.max(len);
        self.entries.insert(sequence, rect);
    }

    pub fn get(&self, sequence: &str) -> Option<Rect> {
        self.entries.get(sequence).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds every emoji in `text`, left to right. At each position the
    /// longest sequence in the table wins, and scanning resumes after it.
    pub fn annotate(&self, text: &str) -> Vec<EmojiMatch> {
        let mut found = Vec::new();
        if self.entries.is_empty() {
            return found;
        }
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        'scan: while i < chars.len() {
            let max = self.longest.min(chars.len() - i);
            for len in (1..=max).rev() {
                let candidate: String = chars[i..i + len].iter().collect();
                if let Some(rect) = self.get(&candidate) {
                    found.push(EmojiMatch {
                        char_index: i,
                        sequence: candidate,
                        rect,
                    });
                    i += len;
                    continue 'scan;
                }
            }
            i += 1;
        }
        found
    }
}

impl<S: Into<String>> FromIterator<(S, Rect)> for EmojiTable {
    fn from_iter<I: IntoIterator<Item = (S, Rect)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (sequence, rect) in iter {
            table.insert(sequence, rect);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAN: &str = "\u{1F468}";
    const FAMILY: &str = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";

    #[test]
    fn test_annotate_prefers_longest_sequence() {
        let table: EmojiTable = [
            (MAN, Rect::new(0.0, 0.0, 1.0, 1.0)),
            (FAMILY, Rect::new(1.0, 0.0, 1.0, 1.0)),
        ]
        .into_iter()
        .collect();

        let found = table.annotate(&format!("hi {FAMILY}!"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sequence, FAMILY);
        assert_eq!(found[0].char_index, 3);
        assert_eq!(found[0].rect, Rect::new(1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_annotate_falls_back_to_shorter_match() {
        let table: EmojiTable = [
            (MAN, Rect::new(0.0, 0.0, 1.0, 1.0)),
            (FAMILY, Rect::new(1.0, 0.0, 1.0, 1.0)),
        ]
        .into_iter()
        .collect();

        let found = table.annotate(&format!("{MAN} {MAN}"));
        let seqs: Vec<_> = found.iter().map(|m| (m.char_index, m.sequence.as_str())).collect();
        assert_eq!(seqs, vec![(0, MAN), (2, MAN)]);
    }

    #[test]
    fn test_annotate_plain_text_finds_nothing() {
        let table: EmojiTable = [("\u{1F600}", Rect::new(0.0, 0.0, 1.0, 1.0))]
            .into_iter()
            .collect();
        assert!(table.annotate("no emoji here").is_empty());
        assert!(EmojiTable::new().annotate("\u{1F600}").is_empty());
    }
}
