//! Forward cursor over inline content.

/// A cursor over the content of one inline snippet.
///
/// Positions are byte offsets into the content; all movement is by whole
/// characters.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// # Panics
    ///
    /// Panics if `position` is past the end or not on a character boundary.
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        assert!(
            self.content.is_char_boundary(position),
            "scanner position {position} is not a character boundary"
        );
        self.position = position;
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.position < self.content.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.content[self.position..].chars().next()
    }

    /// The character before the current position.
    #[inline]
    pub fn peek_previous(&self) -> Option<char> {
        self.content[..self.position].chars().next_back()
    }

    /// Advance past the current character.
    #[inline]
    pub fn next(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    /// Advance if the current character is `c`.
    #[inline]
    pub fn next_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.position += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Advance over a run of `c`, returning its length in characters.
    pub fn match_multiple(&mut self, c: char) -> usize {
        let mut count = 0;
        while self.next_char(c) {
            count += 1;
        }
        count
    }

    /// Advance over spaces, tabs and line endings, returning how many.
    pub fn whitespace(&mut self) -> usize {
        let mut count = 0;
        while let Some(' ' | '\t' | '\n' | '\r' | '\u{0b}' | '\u{0c}') = self.peek() {
            self.next();
            count += 1;
        }
        count
    }

    /// Move to the next occurrence of `c`, returning the number of bytes
    /// skipped. The position is unchanged when there is none.
    pub fn find(&mut self, c: char) -> Option<usize> {
        let skipped = self.content[self.position..].find(c)?;
        self.position += skipped;
        Some(skipped)
    }

    /// Content between two positions.
    #[inline]
    pub fn source(&self, start: usize, end: usize) -> &'a str {
        &self.content[start..end]
    }

    /// Content from the current position to the end.
    #[inline]
    pub fn rest(&self) -> &'a str {
        &self.content[self.position..]
    }

    /// The whole content.
    #[inline]
    pub fn content(&self) -> &'a str {
        self.content
    }
}
