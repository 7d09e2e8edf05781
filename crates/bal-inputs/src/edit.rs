use text_size::{TextRange, TextSize};

/// Replaces `delete` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextEdit {
    pub delete: TextRange,
    pub insert: String,
}

impl TextEdit {
    pub fn replace(delete: TextRange, insert: impl Into<String>) -> Self {
        Self { delete, insert: insert.into() }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::replace(TextRange::empty(offset), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::replace(range, String::new())
    }

    pub fn insert_len(&self) -> TextSize {
        TextSize::of(self.insert.as_str())
    }

    /// Length change caused by the edit.
    pub fn delta(&self) -> i64 {
        i64::from(u32::from(self.insert_len())) - i64::from(u32::from(self.delete.len()))
    }

    /// `None` when the deleted range is out of bounds or splits a character.
    pub fn apply(&self, text: &str) -> Option<String> {
        let start = usize::from(self.delete.start());
        let end = usize::from(self.delete.end());
        if end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return None;
        }
        let mut out = String::with_capacity(text.len() - (end - start) + self.insert.len());
        out.push_str(&text[..start]);
        out.push_str(&self.insert);
        out.push_str(&text[end..]);
        Some(out)
    }

    /// Maps an offset in the old text to the new text. Offsets inside the
    /// deleted range have no image.
    pub fn map_offset(&self, offset: TextSize) -> Option<TextSize> {
        if offset <= self.delete.start() {
            Some(offset)
        } else if offset >= self.delete.end() {
            Some(offset - self.delete.len() + self.insert_len())
        } else {
            None
        }
    }

    /// Maps a range that does not overlap the edit.
    pub fn map_range(&self, range: TextRange) -> Option<TextRange> {
        if range.end() <= self.delete.start() {
            Some(range)
        } else if range.start() >= self.delete.end() {
            let start = self.map_offset(range.start())?;
            Some(TextRange::at(start, range.len()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_and_map() {
        let edit = TextEdit::replace(TextRange::new(4.into(), 5.into()), "abc");
        assert_eq!(edit.apply("int x = 1;").as_deref(), Some("int abc = 1;"));
        assert_eq!(edit.delta(), 2);
        assert_eq!(edit.map_offset(2.into()), Some(2.into()));
        assert_eq!(edit.map_offset(6.into()), Some(8.into()));
        assert_eq!(
            edit.map_range(TextRange::new(8.into(), 9.into())),
            Some(TextRange::new(10.into(), 11.into()))
        );
        assert_eq!(edit.map_range(TextRange::new(3.into(), 6.into())), None);
    }

    #[test]
    fn rejects_out_of_bounds_edits() {
        let edit = TextEdit::delete(TextRange::new(2.into(), 40.into()));
        assert_eq!(edit.apply("short"), None);
        let edit = TextEdit::insert(1.into(), "x");
        assert_eq!(edit.apply("é"), None);
    }
}
