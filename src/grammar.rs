//! The grammar compiler: EBNF text or rule tables lowered to a symbol graph.
//!
//! Grammars arrive either as EBNF source (`identifier = expression .`
//! productions) or as a caller-supplied table of rule strings. Both are
//! parsed into the same expression tree and then lowered into a graph of
//! symbol nodes connected by `next` (sequence) and `alt` (alternation)
//! edges. Loops and optionals are encoded structurally: a repeat is a loop
//! head whose body links back to it, an optional is an extra `alt` edge to
//! an empty symbol. The parser driver in [`crate::parser`] walks this
//! graph directly.
//!
//! The EBNF meta-syntax itself is recognized with the crate's own regexes:
//!
//! ```text
//! syntax     = { production }.
//! production = identifier "=" expression ".".
//! expression = term { "|" term }.
//! term       = factor { factor }.
//! factor     = identifier | string | "(" expression ")"
//!            | "[" expression "]" | "{" expression "}".
//! ```
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::arena::{Arena, Id};
use crate::regex::Regex;
use crate::scanner::Scanner;
use crate::text::{ParseContext, STRING_PATTERN};

pub(crate) type SymbolId = Id<Symbol>;

/// What a symbol node matches.
#[derive(Debug, Clone)]
pub(crate) enum SymbolKind {
    /// Matches without consuming input.
    Empty,
    /// Matches a literal byte sequence exactly.
    Literal(Arc<str>),
    /// Matches whatever the referenced scanner token matches.
    Token(usize),
    /// Recursively parses the referenced production.
    Rule(usize),
}

/// A node in the symbol graph.
#[derive(Debug, Clone)]
pub(crate) struct Symbol {
    pub(crate) kind: SymbolKind,
    /// The continuation within a sequence.
    pub(crate) next: Option<SymbolId>,
    /// The alternative at this choice point.
    pub(crate) alt: Option<SymbolId>,
}

/// A parsed right-hand side: alternated terms.
#[derive(Debug, Clone, Default)]
pub(crate) struct Expression {
    pub(crate) terms: Vec<Term>,
}

/// A sequence of factors.
#[derive(Debug, Clone)]
pub(crate) struct Term {
    pub(crate) factors: Vec<Factor>,
}

/// A minimal grammar element.
#[derive(Debug, Clone)]
pub(crate) enum Factor {
    /// `[ expression ]`
    Optional(Expression),
    /// `{ expression }`
    Repeat(Expression),
    /// `( expression )`
    Group(Expression),
    /// An identifier that has not been linked yet. None survive
    /// [`resolve_expression`].
    Identifier {
        /// The referenced name.
        name: Arc<str>,
        /// Byte offset of the identifier in the text it was parsed from.
        offset: usize,
    },
    /// A resolved reference to another production.
    Rule(usize),
    /// A resolved reference to a scanner token.
    Token(usize),
    /// A quoted literal, without its quotes.
    Literal(Arc<str>),
}

/// A named grammar rule.
#[derive(Debug, Clone)]
pub(crate) struct Production {
    /// The rule's name; empty for placeholder rows in a rule table.
    pub(crate) name: Arc<str>,
    /// The parsed right-hand side, kept for FIRST/FOLLOW analysis.
    pub(crate) expr: Expression,
    /// Entry into the symbol graph; `None` for placeholders.
    pub(crate) start: Option<SymbolId>,
}

/// The error type for grammar compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("grammar error at byte {offset}: {kind}")]
pub struct GrammarError {
    /// What went wrong.
    pub kind: GrammarErrorKind,
    /// Byte offset into the grammar source (or the individual rule string)
    /// where the problem was noticed; 0 when no position applies.
    pub offset: usize,
}

/// The ways a grammar can fail to compile.
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display)]
pub enum GrammarErrorKind {
    /// unknown identifier `{0}`
    UnknownIdentifier(String),
    /// literal string of length zero
    EmptyString,
    /// unbalanced `{0}`
    Unbalanced(char),
    /// unexpected end of grammar
    UnexpectedEof,
    /// duplicate production `{0}`
    DuplicateProduction(String),
    /// expected {0}
    Expected(&'static str),
}

/// The regexes behind the EBNF meta-syntax terminals.
///
/// Compiled per grammar rather than held in a process-global: the patterns
/// are tiny and per-parser construction keeps compilation reentrant.
struct MetaRegexes {
    whitespace: Regex,
    string: Regex,
    assignment: Regex,
    period: Regex,
    identifier: Regex,
    alternation: Regex,
}

impl MetaRegexes {
    fn new() -> MetaRegexes {
        // These patterns are fixed; a compile failure is a bug here, not
        // in user input.
        let compile = |p: &str| match Regex::new(p) {
            Ok(r) => r,
            Err(e) => panic!("built-in grammar pattern `{p}` failed to compile: {e}"),
        };
        MetaRegexes {
            whitespace: compile("[ \n\t]*"),
            string: compile(STRING_PATTERN),
            assignment: compile("[ \n\t]*=[ \n\t]*"),
            period: compile("[ \n\t]*\\."),
            identifier: compile("[a-zA-Z][a-zA-Z0-9]*"),
            alternation: compile("[ \n\t]*\\|[ \n\t]*"),
        }
    }
}

/// Recursive-descent parser for the EBNF meta-syntax.
pub(crate) struct GrammarParser<'g> {
    src: &'g str,
    ctx: ParseContext<'g>,
    meta: MetaRegexes,
}

impl<'g> GrammarParser<'g> {
    pub(crate) fn new(src: &'g str) -> Self {
        GrammarParser {
            src,
            ctx: ParseContext::new(src.as_bytes()),
            meta: MetaRegexes::new(),
        }
    }

    fn error(&self, kind: GrammarErrorKind) -> GrammarError {
        GrammarError {
            kind,
            offset: self.ctx.cursor(),
        }
    }

    fn expected(&self, what: &'static str) -> GrammarError {
        if self.ctx.finished() {
            self.error(GrammarErrorKind::UnexpectedEof)
        } else {
            self.error(GrammarErrorKind::Expected(what))
        }
    }

    fn skip_whitespace(&mut self) {
        let _ = self.meta.whitespace.matches(&mut self.ctx);
    }

    fn match_literal(&mut self, byte: u8) -> bool {
        if self.ctx.peek() == Some(byte) {
            self.ctx.advance();
            true
        } else {
            false
        }
    }

    fn delimited(
        &mut self,
        closing: char,
        build: fn(Expression) -> Factor,
    ) -> Result<Factor, GrammarError> {
        self.ctx.advance();
        let expr = self.expression()?;
        if !self.match_literal(closing as u8) {
            return Err(self.error(GrammarErrorKind::Unbalanced(closing)));
        }
        Ok(build(expr))
    }

    /// One factor, or `None` when the cursor does not start one.
    fn factor(&mut self) -> Result<Option<Factor>, GrammarError> {
        self.skip_whitespace();
        match self.ctx.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let start = self.ctx.cursor();
                if self.meta.string.matches(&mut self.ctx).is_none() {
                    return Err(self.error(GrammarErrorKind::Unbalanced(quote as char)));
                }
                let content = &self.src[start + 1..self.ctx.cursor() - 1];
                if content.is_empty() {
                    return Err(GrammarError {
                        kind: GrammarErrorKind::EmptyString,
                        offset: start,
                    });
                }
                Ok(Some(Factor::Literal(Arc::from(content))))
            }
            Some(b'(') => self.delimited(')', Factor::Group).map(Some),
            Some(b'[') => self.delimited(']', Factor::Optional).map(Some),
            Some(b'{') => self.delimited('}', Factor::Repeat).map(Some),
            _ => {
                let offset = self.ctx.cursor();
                match self.meta.identifier.matches(&mut self.ctx) {
                    Some(_) => Ok(Some(Factor::Identifier {
                        name: Arc::from(&self.src[offset..self.ctx.cursor()]),
                        offset,
                    })),
                    None => Ok(None),
                }
            }
        }
    }

    /// One term: a non-empty run of factors.
    fn term(&mut self) -> Result<Option<Term>, GrammarError> {
        let first = match self.factor()? {
            Some(f) => f,
            None => return Ok(None),
        };
        let mut factors = vec![first];
        while let Some(f) = self.factor()? {
            factors.push(f);
        }
        Ok(Some(Term { factors }))
    }

    /// An expression: terms separated by `|`.
    pub(crate) fn expression(&mut self) -> Result<Expression, GrammarError> {
        let mut terms = Vec::new();
        loop {
            match self.term()? {
                Some(t) => terms.push(t),
                None => return Err(self.expected("a term")),
            }
            if self.meta.alternation.matches(&mut self.ctx).is_none() {
                break;
            }
        }
        Ok(Expression { terms })
    }

    fn identifier(&mut self) -> Result<Arc<str>, GrammarError> {
        let start = self.ctx.cursor();
        match self.meta.identifier.matches(&mut self.ctx) {
            Some(_) => Ok(Arc::from(&self.src[start..self.ctx.cursor()])),
            None => Err(self.expected("an identifier")),
        }
    }

    fn production(&mut self) -> Result<(Arc<str>, Expression), GrammarError> {
        self.skip_whitespace();
        let name = self.identifier()?;
        if self.meta.assignment.matches(&mut self.ctx).is_none() {
            return Err(self.expected("`=`"));
        }
        let expr = self.expression()?;
        if self.meta.period.matches(&mut self.ctx).is_none() {
            return Err(self.expected("`.`"));
        }
        Ok((name, expr))
    }

    /// The whole grammar: productions until end of input.
    pub(crate) fn syntax(&mut self) -> Result<Vec<(Arc<str>, Expression)>, GrammarError> {
        let mut productions = Vec::new();
        while !self.ctx.finished() {
            productions.push(self.production()?);
            self.skip_whitespace();
        }
        Ok(productions)
    }
}

/// Links every identifier factor to a production (first match by name) or,
/// failing that, a scanner token.
pub(crate) fn resolve_expression(
    expr: &mut Expression,
    productions: &AHashMap<Arc<str>, usize>,
    scanner: &Scanner,
) -> Result<(), GrammarError> {
    for term in &mut expr.terms {
        for factor in &mut term.factors {
            match factor {
                Factor::Optional(e) | Factor::Repeat(e) | Factor::Group(e) => {
                    resolve_expression(e, productions, scanner)?;
                }
                Factor::Identifier { name, offset } => {
                    if let Some(&rule) = productions.get(name.as_ref()) {
                        *factor = Factor::Rule(rule);
                    } else if let Some(token) = scanner.find(name) {
                        *factor = Factor::Token(token);
                    } else {
                        return Err(GrammarError {
                            kind: GrammarErrorKind::UnknownIdentifier(name.to_string()),
                            offset: *offset,
                        });
                    }
                }
                Factor::Rule(_) | Factor::Token(_) | Factor::Literal(_) => {}
            }
        }
    }
    Ok(())
}

fn empty_symbol(symbols: &mut Arena<Symbol>) -> SymbolId {
    symbols.alloc(Symbol {
        kind: SymbolKind::Empty,
        next: None,
        alt: None,
    })
}

/// Finds the last symbol of an `alt` chain, or `None` when the chain is
/// circular (hare and tortoise).
fn tail_alt(symbols: &Arena<Symbol>, start: SymbolId) -> Option<SymbolId> {
    let mut slow = start;
    let mut fast = start;
    loop {
        fast = match symbols[fast].alt {
            None => return Some(fast),
            Some(f) => f,
        };
        fast = match symbols[fast].alt {
            None => return Some(fast),
            Some(f) => f,
        };
        if let Some(s) = symbols[slow].alt {
            slow = s;
        }
        if slow == fast {
            return None;
        }
    }
}

/// Appends `new_tail` as the last alternative of `chain`.
///
/// A circular alt chain cannot arise from lowering; finding one is fatal.
fn append_alt(symbols: &mut Arena<Symbol>, chain: SymbolId, new_tail: SymbolId) {
    match tail_alt(symbols, chain) {
        Some(tail) => symbols[tail].alt = Some(new_tail),
        None => panic!("circular alt chain"),
    }
}

/// Sets `tail` as the `next` of every end-reachable node under `head`.
fn append_all_nexts(
    symbols: &mut Arena<Symbol>,
    head: SymbolId,
    tail: SymbolId,
    seen: &mut AHashSet<SymbolId>,
) {
    if !seen.insert(head) {
        return;
    }
    let mut current = Some(head);
    while let Some(symbol) = current {
        if symbol == tail {
            break;
        }
        match symbols[symbol].next {
            None => symbols[symbol].next = Some(tail),
            Some(next) => append_all_nexts(symbols, next, tail, seen),
        }
        current = symbols[symbol].alt;
    }
}

/// Wraps `sub` in a loop: every end of `sub` links back to a new loop
/// head, whose `alt` is an empty symbol that exits the loop.
fn make_repeatable(symbols: &mut Arena<Symbol>, sub: SymbolId) -> SymbolId {
    let loop_head = empty_symbol(symbols);
    let mut seen = AHashSet::new();
    append_all_nexts(symbols, sub, loop_head, &mut seen);
    symbols[loop_head].next = Some(sub);
    let exit = empty_symbol(symbols);
    symbols[loop_head].alt = Some(exit);
    loop_head
}

/// Makes `sub` skippable: an empty symbol is appended to every end of
/// `sub` and added as its last alternative.
fn make_optional(symbols: &mut Arena<Symbol>, sub: SymbolId) -> SymbolId {
    let exit = empty_symbol(symbols);
    let mut seen = AHashSet::new();
    append_all_nexts(symbols, sub, exit, &mut seen);
    append_alt(symbols, sub, exit);
    sub
}

struct FactorSymbols {
    head: SymbolId,
    tail: SymbolId,
}

fn lower_factor(symbols: &mut Arena<Symbol>, factor: &Factor) -> FactorSymbols {
    match factor {
        Factor::Optional(e) | Factor::Repeat(e) | Factor::Group(e) => {
            let mut sub = match lower_expression(symbols, e) {
                Some(sub) => sub,
                None => panic!("empty subexpression"),
            };
            if matches!(factor, Factor::Repeat(_)) {
                sub = make_repeatable(symbols, sub);
            } else if matches!(factor, Factor::Optional(_)) {
                sub = make_optional(symbols, sub);
            }

            // Subexpressions can have many terminating states; consolidate
            // them into a single empty symbol the caller can hook onto.
            let tail = empty_symbol(symbols);
            let mut seen = AHashSet::new();
            append_all_nexts(symbols, sub, tail, &mut seen);
            FactorSymbols { head: sub, tail }
        }
        Factor::Rule(rule) => {
            let symbol = symbols.alloc(Symbol {
                kind: SymbolKind::Rule(*rule),
                next: None,
                alt: None,
            });
            FactorSymbols {
                head: symbol,
                tail: symbol,
            }
        }
        Factor::Token(token) => {
            let symbol = symbols.alloc(Symbol {
                kind: SymbolKind::Token(*token),
                next: None,
                alt: None,
            });
            FactorSymbols {
                head: symbol,
                tail: symbol,
            }
        }
        Factor::Literal(text) => {
            let symbol = symbols.alloc(Symbol {
                kind: SymbolKind::Literal(text.clone()),
                next: None,
                alt: None,
            });
            FactorSymbols {
                head: symbol,
                tail: symbol,
            }
        }
        Factor::Identifier { name, .. } => panic!("unresolved identifier `{name}` in lowering"),
    }
}

fn lower_term(symbols: &mut Arena<Symbol>, term: &Term) -> Option<SymbolId> {
    let mut head = None;
    let mut tail: Option<SymbolId> = None;
    for factor in &term.factors {
        let lowered = lower_factor(symbols, factor);
        match tail {
            None => head = Some(lowered.head),
            Some(t) => symbols[t].next = Some(lowered.head),
        }
        tail = Some(lowered.tail);
    }
    head
}

/// Lowers an expression to its start symbol: terms chained via `alt`.
/// Returns `None` for an empty (placeholder) expression.
pub(crate) fn lower_expression(symbols: &mut Arena<Symbol>, expr: &Expression) -> Option<SymbolId> {
    let mut start = None;
    for term in &expr.terms {
        let Some(term_head) = lower_term(symbols, term) else {
            continue;
        };
        match start {
            None => start = Some(term_head),
            Some(chain) => append_alt(symbols, chain, term_head),
        }
    }
    start
}
