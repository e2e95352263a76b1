//! Regex-backed token scanning over a shared parse context.
//!
//! A [`Scanner`] owns an ordered list of named tokens, each backed by a
//! compiled [`Regex`]. Registration order is priority order: the first
//! token whose pattern matches at the cursor wins. The scanner itself is
//! stateless with respect to the input; every operation borrows the
//! caller's [`ParseContext`].
use std::sync::Arc;

use crate::regex::{InvalidRegex, Regex};
use crate::text::ParseContext;
use crate::utils::ByteSet;

/// A token definition: a name and a regex source pattern.
#[derive(Debug, Clone, Copy)]
pub struct TokenDef<'a> {
    /// Token name, used for identifier resolution and AST leaves.
    pub name: &'a str,
    /// Regex source the token matches.
    pub pattern: &'a str,
}

/// A registered token with its compiled pattern.
#[derive(Debug)]
pub struct Token {
    pub(crate) name: Arc<str>,
    pub(crate) pattern: Regex,
    pub(crate) id: usize,
}

impl Token {
    /// The token's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The token's id: its position in the definition table.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }
}

/// The error type for [`Scanner`] creation.
#[derive(Debug, thiserror::Error)]
pub enum CreateScannerError {
    /// A token's pattern did not compile.
    #[error("token `{name}`: {source}")]
    InvalidPattern {
        /// Name of the offending token.
        name: String,
        /// The underlying compile error.
        source: InvalidRegex,
    },
}

/// The outcome of a scanning operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scanned<'s> {
    /// A token matched at the cursor.
    Token {
        /// Id of the winning token.
        id: usize,
        /// The matched bytes, borrowed from the input.
        text: &'s [u8],
    },
    /// The cursor is at the end of the input.
    Eof,
    /// No registered token matched.
    NoMatch,
}

/// An ordered, whitespace-skipping token scanner.
#[derive(Debug)]
pub struct Scanner {
    tokens: Vec<Token>,
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n')
}

fn skip_whitespace(ctx: &mut ParseContext) {
    while ctx.peek().is_some_and(is_whitespace) {
        ctx.advance();
    }
}

impl Scanner {
    /// Compiles every definition into a token. Ids are the table indices.
    ///
    /// # Errors
    ///
    /// Returns [`CreateScannerError`] naming the first token whose pattern
    /// fails to compile.
    pub fn new(defs: &[TokenDef]) -> Result<Scanner, CreateScannerError> {
        let mut tokens = Vec::with_capacity(defs.len());
        for (id, def) in defs.iter().enumerate() {
            let pattern = Regex::new(def.pattern).map_err(|source| {
                CreateScannerError::InvalidPattern {
                    name: def.name.to_string(),
                    source,
                }
            })?;
            tokens.push(Token {
                name: Arc::from(def.name),
                pattern,
                id,
            });
        }
        Ok(Scanner { tokens })
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the scanner has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token with the given id.
    pub fn token(&self, id: usize) -> Option<&Token> {
        self.tokens.get(id)
    }

    pub(crate) fn token_mut(&mut self, id: usize) -> Option<&mut Token> {
        self.tokens.get_mut(id)
    }

    /// The id of the first token with the given name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.tokens.iter().position(|t| &*t.name == name)
    }

    /// Scans the next token at the cursor.
    ///
    /// Leading whitespace (space, tab, newline) is skipped, then every
    /// token enabled by `valid` is tried in registration order; the first
    /// match wins and trailing whitespace is skipped as well. A `valid`
    /// mask of `None` means any token is acceptable.
    pub fn next_token<'s>(
        &mut self,
        ctx: &mut ParseContext<'s>,
        valid: Option<&ByteSet>,
    ) -> Scanned<'s> {
        skip_whitespace(ctx);
        if ctx.finished() {
            return Scanned::Eof;
        }
        let mut result = Scanned::NoMatch;
        for token in &mut self.tokens {
            if valid.is_some_and(|mask| !mask.contains(token.id)) {
                continue;
            }
            if let Some(text) = token.pattern.matches(ctx) {
                result = Scanned::Token { id: token.id, text };
                break;
            }
        }
        skip_whitespace(ctx);
        result
    }

    /// Same as [`Scanner::next_token`], but restores the cursor before
    /// returning.
    pub fn peek_token<'s>(
        &mut self,
        ctx: &mut ParseContext<'s>,
        valid: Option<&ByteSet>,
    ) -> Scanned<'s> {
        let here = ctx.cursor();
        let token = self.next_token(ctx, valid);
        ctx.set_cursor(here);
        token
    }

    /// Matches a specific token at the cursor, skipping whitespace before
    /// and after the token body. On failure the cursor is fully restored.
    pub fn match_token<'s>(&mut self, id: usize, ctx: &mut ParseContext<'s>) -> Option<&'s [u8]> {
        let here = ctx.cursor();
        skip_whitespace(ctx);
        let matched = self.tokens.get_mut(id).and_then(|t| t.pattern.matches(ctx));
        match matched {
            Some(text) => {
                skip_whitespace(ctx);
                Some(text)
            }
            None => {
                ctx.set_cursor(here);
                None
            }
        }
    }

    /// Matches a literal byte sequence exactly at the cursor. No
    /// whitespace handling; literals that should float on whitespace must
    /// be registered as tokens instead.
    pub fn match_slice<'s>(&self, literal: &[u8], ctx: &mut ParseContext<'s>) -> Option<&'s [u8]> {
        let start = ctx.cursor();
        if ctx.view()[start..].starts_with(literal) {
            ctx.set_cursor(start + literal.len());
            Some(ctx.slice_from(start))
        } else {
            None
        }
    }

    /// Rewinds the context so the cursor sits where `point` begins.
    ///
    /// `point` must be a slice previously returned from this context's
    /// view, e.g. the text of a scanned token.
    pub fn rewind<'s>(&self, ctx: &mut ParseContext<'s>, point: &'s [u8]) {
        let base = ctx.view().as_ptr() as usize;
        let p = point.as_ptr() as usize;
        debug_assert!(p >= base && p <= base + ctx.view().len());
        ctx.set_cursor(p.saturating_sub(base));
    }

    /// Splits the rest of the input into raw token matches, with no
    /// whitespace skipping. Returns `None` if the cursor gets stuck on
    /// input no token matches; the cursor then marks the failure point.
    pub fn tokenize<'s>(&mut self, ctx: &mut ParseContext<'s>) -> Option<Vec<(usize, &'s [u8])>> {
        let mut out = Vec::new();
        while !ctx.finished() {
            let mut found = None;
            for token in &mut self.tokens {
                if let Some(text) = token.pattern.matches(ctx) {
                    found = Some((token.id, text));
                    break;
                }
            }
            out.push(found?);
        }
        Some(out)
    }
}
