//! The regex compiler and NFA matcher.
//!
//! Patterns are compiled into a graph of [`State`]s, each accepting an
//! inclusive byte range (or nothing at all for epsilon states) and carrying
//! an ordered edge list. Matching is a depth-first walk: the first edge
//! that leads to an accepting walk wins, which is how greedy and lazy
//! repetition are encoded purely in edge order.
//!
//! The dialect is deliberately small and byte-oriented: classes with
//! ranges and `^` negation, groups, `* + ? *? +?`, right-associative `|`,
//! `.` for any byte and the escapes `\n`, `\t`, `\d` (any other `\x` is a
//! literal `x`). There are no anchors, back-references or Unicode classes.
use ahash::AHashSet;
use tinyvec::TinyVec;

use crate::arena::{Arena, Id};
use crate::text::ParseContext;
use crate::utils::{self, ByteSet};

type StateId = Id<State>;

/// A state in the automaton, consuming at most one byte.
#[derive(Debug)]
struct State {
    /// Inclusive byte range accepted by this state; `None` is an epsilon
    /// state that consumes nothing.
    accept: Option<(u8, u8)>,
    /// Outgoing edges. The order encodes match preference.
    edges: TinyVec<[StateId; 2]>,
    /// The terminal state of the subgraph headed here, when this state
    /// heads a compound construct. A state with no `end` is its own end.
    end: Option<StateId>,
    /// Cursor position at the last visit, used to cut unproductive cycles.
    progress: Option<usize>,
}

/// The error type for regex compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid regex at byte {offset}: {kind}")]
pub struct InvalidRegex {
    /// What went wrong.
    pub kind: InvalidRegexKind,
    /// Byte offset into the pattern where the problem was noticed.
    pub offset: usize,
}

/// The ways a pattern can fail to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, displaydoc::Display)]
pub enum InvalidRegexKind {
    /// escape character at end of pattern
    TrailingEscape,
    /// unescaped metacharacter `{0}`
    UnescapedMetacharacter(char),
    /// empty character class
    EmptyClass,
    /// character range contains no values
    EmptyRange,
    /// unmatched class delimiter
    UnbalancedClass,
    /// unmatched group delimiter
    UnbalancedGroup,
    /// pattern ends unexpectedly
    UnexpectedEnd,
}

/// A successful [`Regex::find`] result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'s> {
    /// Byte offset of the match within the searched input.
    pub start: usize,
    /// The matched bytes, borrowed from the input.
    pub text: &'s [u8],
}

/// A compiled regular expression.
///
/// All matching entry points take `&mut self`: the cycle guard lives in the
/// automaton's states and is reset before every top-level match, so a
/// compiled regex can be reused sequentially but not shared concurrently.
#[derive(Debug)]
pub struct Regex {
    states: Arena<State>,
    start: StateId,
    pattern: String,
}

struct Compiler<'p> {
    states: Arena<State>,
    ctx: ParseContext<'p>,
}

impl Compiler<'_> {
    fn state(&mut self, accept: Option<(u8, u8)>) -> StateId {
        self.states.alloc(State {
            accept,
            edges: TinyVec::new(),
            end: None,
            progress: None,
        })
    }

    fn epsilon(&mut self) -> StateId {
        self.state(None)
    }

    fn add_edge(&mut self, from: StateId, to: StateId) {
        self.states[from].edges.push(to);
    }

    fn end_state(&self, state: StateId) -> StateId {
        self.states[state].end.unwrap_or(state)
    }

    fn error(&self, kind: InvalidRegexKind, offset: usize) -> InvalidRegex {
        InvalidRegex { kind, offset }
    }

    /// Takes one input symbol, decoding `\n`, `\t` and stripping the
    /// backslash off any other escape.
    fn take_char(&mut self) -> Result<u8, InvalidRegex> {
        let offset = self.ctx.cursor();
        let ch = self
            .ctx
            .take()
            .ok_or(self.error(InvalidRegexKind::UnexpectedEnd, offset))?;
        if ch == b'\\' {
            let escaped = self
                .ctx
                .take()
                .ok_or(self.error(InvalidRegexKind::TrailingEscape, offset))?;
            return Ok(match escaped {
                b'n' => b'\n',
                b't' => b'\t',
                other => other,
            });
        }
        Ok(ch)
    }

    /// A single top-level symbol: a literal, an escape, `\d` or `.`.
    fn match_symbol(&mut self) -> Result<StateId, InvalidRegex> {
        let offset = self.ctx.cursor();
        let escaped = self.ctx.peek() == Some(b'\\');
        let ch = self.take_char()?;
        if escaped {
            if ch == b'd' {
                return Ok(self.state(Some((b'0', b'9'))));
            }
            return Ok(self.state(Some((ch, ch))));
        }
        match ch {
            b'(' | b')' | b'|' | b'+' | b'*' | b'?' | b'[' | b']' => Err(self.error(
                InvalidRegexKind::UnescapedMetacharacter(ch as char),
                offset,
            )),
            b'.' => Ok(self.state(Some((0, 255)))),
            _ => Ok(self.state(Some((ch, ch)))),
        }
    }

    /// A character class body, after the opening `[` has been consumed.
    ///
    /// The accepted set is collected into a bitmap first; negation inverts
    /// the bitmap, and the node is then built as a fan-out with one child
    /// per maximal contiguous run of accepted bytes.
    fn match_class(&mut self) -> Result<StateId, InvalidRegex> {
        let offset = self.ctx.cursor();
        let mut bitmap = utils::byte_set();
        let mut negate = false;

        if self.ctx.peek() == Some(b'^') {
            negate = true;
            self.ctx.advance();
        }
        if self.ctx.peek() == Some(b']') {
            return Err(self.error(InvalidRegexKind::EmptyClass, offset));
        }

        while self.ctx.peek() != Some(b']') && !self.ctx.finished() {
            let range_offset = self.ctx.cursor();
            let from = self.take_char()?;
            let mut to = from;
            if self.ctx.peek() == Some(b'-') {
                self.ctx.advance();
                to = self.take_char()?;
                if to < from {
                    return Err(self.error(InvalidRegexKind::EmptyRange, range_offset));
                }
            }
            for b in from..=to {
                bitmap.insert(b as usize);
            }
        }

        if negate {
            let mut inverted = utils::byte_set();
            for b in 0..256 {
                if !bitmap.contains(b) {
                    inverted.insert(b);
                }
            }
            bitmap = inverted;
        }

        let class = self.epsilon();
        let terminal = self.epsilon();
        self.states[class].end = Some(terminal);

        let mut run_start = 0usize;
        while run_start < 256 {
            if !bitmap.contains(run_start) {
                run_start += 1;
                continue;
            }
            let mut run_end = run_start + 1;
            while run_end < 256 && bitmap.contains(run_end) {
                run_end += 1;
            }
            let node = self.state(Some((run_start as u8, (run_end - 1) as u8)));
            self.add_edge(node, terminal);
            self.add_edge(class, node);
            run_start = run_end;
        }

        Ok(class)
    }

    /// The next atom of the pattern, or `None` on the expected terminator.
    fn next_match(&mut self, terminator: Option<u8>) -> Result<Option<StateId>, InvalidRegex> {
        let offset = self.ctx.cursor();
        match self.ctx.peek() {
            Some(b'[') => {
                self.ctx.advance();
                let class = self.match_class()?;
                if self.ctx.take() != Some(b']') {
                    return Err(self.error(InvalidRegexKind::UnbalancedClass, offset));
                }
                Ok(Some(class))
            }
            Some(b']') => {
                if terminator == Some(b']') {
                    Ok(None)
                } else {
                    Err(self.error(InvalidRegexKind::UnbalancedClass, offset))
                }
            }
            Some(b')') => {
                if terminator == Some(b')') {
                    Ok(None)
                } else {
                    Err(self.error(InvalidRegexKind::UnbalancedGroup, offset))
                }
            }
            Some(b'(') => {
                self.ctx.advance();
                let group = self.build_automaton(Some(b')'))?;
                if self.ctx.take() != Some(b')') {
                    return Err(self.error(InvalidRegexKind::UnbalancedGroup, offset));
                }
                Ok(Some(group))
            }
            Some(_) => self.match_symbol().map(Some),
            None => Ok(None),
        }
    }

    fn build_automaton(&mut self, terminator: Option<u8>) -> Result<StateId, InvalidRegex> {
        let mut start = self.epsilon();
        let mut next = start;

        while !self.ctx.finished() {
            let new = match self.next_match(terminator)? {
                Some(state) => state,
                None => break,
            };

            if let Some(postfix) = self
                .ctx
                .peek()
                .filter(|&ch| matches!(ch, b'*' | b'+' | b'?'))
            {
                self.ctx.advance();

                let mut greedy = true;
                let optional = postfix == b'*' || postfix == b'?';
                let repeatable = postfix == b'*' || postfix == b'+';
                if repeatable && self.ctx.peek() == Some(b'?') {
                    greedy = false;
                    self.ctx.advance();
                }

                let loop_start = self.epsilon();
                let loop_end = self.epsilon();
                let new_end = self.end_state(new);

                self.add_edge(next, loop_start);
                next = loop_end;

                // The edge order is what the matcher's depth-first walk
                // keys greediness off: a greedy repeat prefers to enter
                // the loop again, a lazy one prefers to exit early.
                if greedy {
                    if repeatable {
                        self.add_edge(new_end, loop_start);
                    }
                    self.add_edge(new_end, loop_end);
                    self.add_edge(loop_start, new);
                    if optional {
                        self.add_edge(loop_start, loop_end);
                    }
                } else {
                    self.add_edge(new_end, loop_end);
                    if repeatable {
                        self.add_edge(new_end, loop_start);
                    }
                    if optional {
                        self.add_edge(loop_start, loop_end);
                    }
                    self.add_edge(loop_start, new);
                }
            } else {
                self.add_edge(next, new);
                next = self.end_state(new);
            }

            let end = self.end_state(next);
            self.states[start].end = Some(end);

            if self.ctx.peek() == Some(b'|') {
                self.ctx.advance();
                let left = start;
                let right = self.build_automaton(terminator)?;
                let parent = self.epsilon();
                self.add_edge(parent, left);
                self.add_edge(parent, right);
                start = parent;
                next = self.epsilon();
                let left_end = self.end_state(left);
                let right_end = self.end_state(right);
                self.add_edge(left_end, next);
                self.add_edge(right_end, next);
            }
        }

        let end = self.end_state(next);
        self.states[start].end = Some(end);
        Ok(start)
    }
}

impl Regex {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRegex`] with the offending byte offset when the
    /// pattern violates the dialect: unescaped metacharacters, empty
    /// classes or ranges, unbalanced delimiters, or a trailing escape.
    pub fn new(pattern: &str) -> Result<Regex, InvalidRegex> {
        let mut compiler = Compiler {
            states: Arena::new(),
            ctx: ParseContext::new(pattern.as_bytes()),
        };
        let start = compiler.build_automaton(None)?;
        Ok(Regex {
            states: compiler.states,
            start,
            pattern: pattern.to_string(),
        })
    }

    /// The source pattern this regex was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the whole of `input` is consumed by the pattern.
    pub fn matches_strict(&mut self, input: &[u8]) -> bool {
        let mut ctx = ParseContext::new(input);
        self.reset();
        self.visit(self.start, &mut ctx, true)
    }

    /// Matches at the context's cursor. On success the cursor advances past
    /// the match and the matched slice is returned; on failure the cursor
    /// is left where it was.
    pub fn matches<'s>(&mut self, ctx: &mut ParseContext<'s>) -> Option<&'s [u8]> {
        let pos = ctx.cursor();
        self.reset();
        if self.visit(self.start, ctx, false) {
            Some(ctx.slice_from(pos))
        } else {
            ctx.set_cursor(pos);
            None
        }
    }

    /// Matches a prefix of a standalone `input`, returning the matched
    /// bytes. Like [`Regex::matches`], the match need not reach the end.
    pub fn matches_prefix<'s>(&mut self, input: &'s [u8]) -> Option<&'s [u8]> {
        let mut ctx = ParseContext::new(input);
        self.matches(&mut ctx)
    }

    /// Finds the leftmost match by attempting [`Regex::matches`] at every
    /// offset of `input`.
    pub fn find<'s>(&mut self, input: &'s [u8]) -> Option<Match<'s>> {
        let mut ctx = ParseContext::new(input);
        for i in 0..input.len() {
            ctx.set_cursor(i);
            self.reset();
            if self.visit(self.start, &mut ctx, false) {
                return Some(Match {
                    start: i,
                    text: &input[i..ctx.cursor()],
                });
            }
        }
        None
    }

    /// Whether the pattern matches the empty string.
    pub fn matches_empty(&mut self) -> bool {
        self.matches_prefix(b"").is_some()
    }

    /// ORs into `set` every byte that can begin a match: the accept ranges
    /// reachable from the start across epsilon states only.
    pub fn first_bytes(&self, set: &mut ByteSet) {
        let mut seen = AHashSet::new();
        self.first_walk(self.start, set, &mut seen);
    }

    fn first_walk(&self, id: StateId, set: &mut ByteSet, seen: &mut AHashSet<StateId>) {
        if !seen.insert(id) {
            return;
        }
        match self.states[id].accept {
            Some((lo, hi)) => {
                for b in lo..=hi {
                    set.insert(b as usize);
                }
            }
            None => {
                for &edge in &self.states[id].edges {
                    self.first_walk(edge, set, seen);
                }
            }
        }
    }

    /// Clears every state's progress marker. Must run before each
    /// top-level match, otherwise the cycle guard sees stale cursors.
    fn reset(&mut self) {
        for state in self.states.iter_mut() {
            state.progress = None;
        }
    }

    fn visit(&mut self, id: StateId, ctx: &mut ParseContext, strict: bool) -> bool {
        if let Some((lo, hi)) = self.states[id].accept {
            match ctx.take() {
                Some(ch) if lo <= ch && ch <= hi => {}
                _ => return false,
            }
        }

        for i in 0..self.states[id].edges.len() {
            let next = self.states[id].edges[i];
            let pos = ctx.cursor();
            // No progress since the last visit means this edge cannot
            // produce a new outcome.
            if self.states[next].progress == Some(pos) {
                continue;
            }
            self.states[next].progress = Some(pos);
            if self.visit(next, ctx, strict) {
                return true;
            }
            ctx.set_cursor(pos);
        }

        self.states[id].edges.is_empty() && (!strict || ctx.finished())
    }
}

/// Compiles `pattern` and strict-matches it against `input` in one step.
///
/// # Errors
///
/// Returns [`InvalidRegex`] if the pattern does not compile.
pub fn matches(pattern: &str, input: &[u8]) -> Result<bool, InvalidRegex> {
    Ok(Regex::new(pattern)?.matches_strict(input))
}
