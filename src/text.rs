//! Byte cursors over borrowed input and position diagnostics.
//!
//! Every matcher, scanner and parser in this crate operates on a borrowed
//! [`ParseContext`]: an immutable byte view plus a cursor. The view is
//! never copied; matched slices point back into the caller's buffer.

/// A quoted string with backslash escapes, in either tick style.
///
/// This is the pattern the EBNF front end uses for grammar literals; it is
/// exported because token tables routinely want the same definition.
pub const STRING_PATTERN: &str = r#"'([^'\\]|\\.)*'|"([^"\\]|\\.)*""#;

/// A cursor over an immutable byte view.
#[derive(Debug, Clone)]
pub struct ParseContext<'s> {
    view: &'s [u8],
    c: usize,
}

impl<'s> ParseContext<'s> {
    /// Creates a context positioned at the start of `view`.
    pub fn new(view: &'s [u8]) -> Self {
        ParseContext { view, c: 0 }
    }

    /// Whether the cursor has reached the end of the view.
    #[inline]
    pub fn finished(&self) -> bool {
        self.c >= self.view.len()
    }

    /// The byte under the cursor, if any.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.view.get(self.c).copied()
    }

    /// Consumes and returns the byte under the cursor.
    #[inline]
    pub fn take(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.c += 1;
        }
        ch
    }

    /// Advances the cursor by one byte, saturating at the end of the view.
    #[inline]
    pub fn advance(&mut self) {
        if !self.finished() {
            self.c += 1;
        }
    }

    /// The current cursor offset.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.c
    }

    /// Moves the cursor to `offset`. Used for rewinding after a failed match.
    #[inline]
    pub fn set_cursor(&mut self, offset: usize) {
        self.c = offset;
    }

    /// The full view this context reads from.
    #[inline]
    pub fn view(&self) -> &'s [u8] {
        self.view
    }

    /// The bytes between `start` and the cursor.
    #[inline]
    pub fn slice_from(&self, start: usize) -> &'s [u8] {
        &self.view[start..self.c]
    }
}

/// A 1-based line and column in a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number in bytes, starting at 1.
    pub column: usize,
}

/// Locates `place` within `source`.
///
/// `place` must be a subslice of `source`; the offsets are recovered from
/// the pointers, so a slice of equal bytes taken from another buffer
/// returns `None`.
pub fn position(source: &[u8], place: &[u8]) -> Option<Position> {
    let base = source.as_ptr() as usize;
    let p = place.as_ptr() as usize;
    if p < base || p >= base + source.len() {
        return None;
    }
    let offset = p - base;
    let mut line = 1;
    let mut column = 1;
    for &b in &source[..offset] {
        if b == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Some(Position { line, column })
}

/// Renders the line under the cursor with a `^` marker, plus one line of
/// context on either side.
fn context_lines(ctx: &ParseContext) -> Vec<String> {
    let src = ctx.view();
    let c = ctx.cursor().min(src.len());
    let line_start = src[..c]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line_no = src[..c].iter().filter(|&&b| b == b'\n').count() + 1;
    let line_end = src[c..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| c + i)
        .unwrap_or(src.len());

    let mut out = Vec::new();
    if line_start > 0 {
        let prev_start = src[..line_start - 1]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let prev = String::from_utf8_lossy(&src[prev_start..line_start - 1]);
        out.push(format!("line {:3}: {}", line_no - 1, prev));
    }
    let line = String::from_utf8_lossy(&src[line_start..line_end]);
    out.push(format!("line {:3}: {}", line_no, line));
    out.push(format!("          {:>width$}", "^", width = c - line_start + 1));
    if line_end < src.len() {
        let next_start = line_end + 1;
        let next_end = src[next_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| next_start + i)
            .unwrap_or(src.len());
        let next = String::from_utf8_lossy(&src[next_start..next_end]);
        out.push(format!("line {:3}: {}", line_no + 1, next));
    }
    out
}

/// Logs the cursor's surroundings at error level.
pub fn error_ctx(ctx: &ParseContext) {
    for line in context_lines(ctx) {
        log::error!("{line}");
    }
}

/// Logs the cursor's surroundings at warn level.
pub fn warn_ctx(ctx: &ParseContext) {
    for line in context_lines(ctx) {
        log::warn!("{line}");
    }
}

/// Logs the cursor's surroundings at debug level.
pub fn debug_ctx(ctx: &ParseContext) {
    for line in context_lines(ctx) {
        log::debug!("{line}");
    }
}
