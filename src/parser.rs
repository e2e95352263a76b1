//! The backtracking parser driver and the AST it produces.
//!
//! A [`Parser`] owns its productions, the symbol graph and the scanner.
//! Parsing is a depth-first walk of the graph with an explicit stack of
//! alt frames: whenever a symbol matches and has an alternative, the
//! pre-match cursor and the alternative are remembered; on a dead end the
//! top frame is resumed, but only if its saved cursor still equals the
//! current one. Backtracking is therefore local to a production and
//! bounded by the choice points traversed, never recursive per alt.
use std::sync::Arc;

use ahash::AHashMap;

use crate::arena::Arena;
use crate::grammar::{
    lower_expression, resolve_expression, Expression, GrammarError, GrammarErrorKind,
    GrammarParser, Production, Symbol, SymbolId, SymbolKind,
};
use crate::scanner::{CreateScannerError, Scanned, Scanner, TokenDef};
use crate::text::ParseContext;

/// A row in a grammar rule table.
///
/// The row's position in the table is the rule's id and surfaces as the
/// AST node kind, so tables are typically indexed by an enum. A row with
/// an empty name is a placeholder that keeps later ids aligned.
#[derive(Debug, Clone, Copy)]
pub struct RuleDef<'a> {
    /// Production name; empty for a placeholder row.
    pub name: &'a str,
    /// The production's right-hand side in EBNF.
    pub rule: &'a str,
}

/// The error type for [`Parser`] construction.
#[derive(Debug, thiserror::Error)]
pub enum CreateParserError {
    #[error("{0}")]
    /// The grammar did not compile.
    Grammar(#[from] GrammarError),
    #[error("{0}")]
    /// A scanner token did not compile.
    Scanner(#[from] CreateScannerError),
}

/// The error type for a failed parse.
///
/// The parse context's cursor marks the furthest progress; feed it to
/// [`crate::text::error_ctx`] to log the surrounding source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("parse failed at byte {offset}")]
pub struct ParseError {
    /// Cursor offset at which the parse gave up.
    pub offset: usize,
}

/// What an AST node was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// A production, identified by its rule-table position.
    Rule(usize),
    /// A scanner token, identified by its id.
    Token(usize),
    /// A literal string symbol.
    Literal,
}

/// A node of the abstract syntax tree.
///
/// Ranges borrow the parsed input, so an AST may outlive its parser as
/// long as the input buffer outlives the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast<'s> {
    /// The input bytes this node covers.
    pub range: &'s [u8],
    /// Name of the production or token; for literal leaves, the literal
    /// text itself.
    pub name: Arc<str>,
    /// What produced this node.
    pub id: NodeId,
    /// Children in source order. Dropping a node drops the subtree.
    pub children: Vec<Ast<'s>>,
}

impl Ast<'_> {
    /// Renders the subtree as an indented listing, one node per line, with
    /// `\n` shown as `^` and `\t` as `>`.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&self.name);
        out.push_str(" '");
        for ch in String::from_utf8_lossy(self.range).chars() {
            match ch {
                '\n' => out.push('^'),
                '\t' => out.push('>'),
                other => out.push(other),
            }
        }
        out.push('\'');
        out.push('\n');
        for child in &self.children {
            child.write_tree(out, depth + 1);
        }
    }
}

/// A grammar compiled to a symbol graph, ready to parse input.
#[derive(Debug)]
pub struct Parser {
    pub(crate) productions: Vec<Production>,
    pub(crate) symbols: Arena<Symbol>,
    pub(crate) scanner: Scanner,
}

impl Parser {
    /// Builds a parser from a rule table and a token table.
    ///
    /// Identifiers inside rules resolve to the first production with that
    /// name, then to the first token; an unresolved name fails grammar
    /// compilation.
    ///
    /// # Errors
    ///
    /// Returns [`CreateParserError`] when a token pattern or a rule does
    /// not compile, a name cannot be resolved, or two non-placeholder
    /// rules share a name.
    pub fn from_rules(rules: &[RuleDef], tokens: &[TokenDef]) -> Result<Parser, CreateParserError> {
        let scanner = Scanner::new(tokens)?;
        let mut productions = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.name.is_empty() {
                productions.push(Production {
                    name: Arc::from(""),
                    expr: Expression::default(),
                    start: None,
                });
                continue;
            }
            let mut grammar = GrammarParser::new(rule.rule);
            let expr = grammar.expression()?;
            productions.push(Production {
                name: Arc::from(rule.name),
                expr,
                start: None,
            });
        }
        Self::finalize(productions, scanner)
    }

    /// Builds a parser from EBNF source and a token table.
    ///
    /// Rule ids are assigned in order of appearance, so the first
    /// production in the text has id 0.
    ///
    /// # Errors
    ///
    /// Returns [`CreateParserError`] under the same conditions as
    /// [`Parser::from_rules`].
    pub fn from_ebnf(grammar: &str, tokens: &[TokenDef]) -> Result<Parser, CreateParserError> {
        let scanner = Scanner::new(tokens)?;
        let mut meta = GrammarParser::new(grammar);
        let productions = meta
            .syntax()?
            .into_iter()
            .map(|(name, expr)| Production {
                name,
                expr,
                start: None,
            })
            .collect();
        Self::finalize(productions, scanner)
    }

    fn finalize(
        mut productions: Vec<Production>,
        scanner: Scanner,
    ) -> Result<Parser, CreateParserError> {
        let mut names = AHashMap::with_capacity(productions.len());
        for (rule, production) in productions.iter().enumerate() {
            if production.name.is_empty() {
                continue;
            }
            if names.insert(production.name.clone(), rule).is_some() {
                return Err(GrammarError {
                    kind: GrammarErrorKind::DuplicateProduction(production.name.to_string()),
                    offset: 0,
                }
                .into());
            }
        }

        for production in &mut productions {
            resolve_expression(&mut production.expr, &names, &scanner)?;
        }

        let mut symbols = Arena::new();
        for production in &mut productions {
            if production.name.is_empty() {
                continue;
            }
            production.start = lower_expression(&mut symbols, &production.expr);
        }

        Ok(Parser {
            productions,
            symbols,
            scanner,
        })
    }

    /// Number of productions, including placeholders.
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    /// Whether the parser has no productions.
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// The name of the production with the given rule id.
    pub fn production_name(&self, rule: usize) -> Option<&str> {
        self.productions.get(rule).map(|p| &*p.name)
    }

    /// The rule id of the first production with the given name.
    pub fn find_production(&self, name: &str) -> Option<usize> {
        self.productions.iter().position(|p| &*p.name == name)
    }

    /// The scanner this parser drives.
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Parses `ctx` starting from the production with id `start_rule`.
    ///
    /// Succeeds only if the start rule matches and the next token after it
    /// is end-of-input; trailing input fails the parse.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] with the furthest cursor offset reached.
    pub fn parse<'s>(
        &mut self,
        ctx: &mut ParseContext<'s>,
        start_rule: usize,
    ) -> Result<Ast<'s>, ParseError> {
        let node = parse_production(
            &self.productions,
            &self.symbols,
            &mut self.scanner,
            ctx,
            start_rule,
        );
        let at_eof = matches!(self.scanner.next_token(ctx, None), Scanned::Eof);
        match node {
            Some(node) if at_eof => Ok(node),
            _ => Err(ParseError {
                offset: ctx.cursor(),
            }),
        }
    }
}

/// A saved choice point: the alternative to try and the cursor it is
/// valid at.
struct AltFrame {
    cursor: usize,
    symbol: SymbolId,
}

fn parse_production<'s>(
    productions: &[Production],
    symbols: &Arena<Symbol>,
    scanner: &mut Scanner,
    ctx: &mut ParseContext<'s>,
    rule: usize,
) -> Option<Ast<'s>> {
    let production = productions.get(rule)?;
    production.start?;

    let start = ctx.cursor();
    let mut node = Ast {
        range: ctx.slice_from(start),
        name: production.name.clone(),
        id: NodeId::Rule(rule),
        children: Vec::new(),
    };
    let mut stack: Vec<AltFrame> = Vec::new();
    let mut matched = true;
    let mut x = production.start;

    while let Some(current) = x {
        let frame_cursor = ctx.cursor();
        let symbol = &symbols[current];
        let mut child = None;

        matched = match &symbol.kind {
            SymbolKind::Empty => true,
            SymbolKind::Rule(sub_rule) => {
                match parse_production(productions, symbols, scanner, ctx, *sub_rule) {
                    Some(sub) => {
                        child = Some(sub);
                        true
                    }
                    None => false,
                }
            }
            SymbolKind::Token(token) => {
                match (scanner.match_token(*token, ctx), scanner.token(*token)) {
                    (Some(text), Some(def)) => {
                        child = Some(Ast {
                            range: text,
                            name: def.name_arc(),
                            id: NodeId::Token(*token),
                            children: Vec::new(),
                        });
                        true
                    }
                    _ => false,
                }
            }
            SymbolKind::Literal(literal) => match scanner.match_slice(literal.as_bytes(), ctx) {
                Some(text) => {
                    child = Some(Ast {
                        range: text,
                        name: literal.clone(),
                        id: NodeId::Literal,
                        children: Vec::new(),
                    });
                    true
                }
                None => false,
            },
        };

        if let Some(child) = child {
            node.children.push(child);
        }

        // Pick the next state; when the `next` edge is taken, remember the
        // alternative so a later dead end at this cursor can retry it.
        if matched {
            if let Some(alt) = symbol.alt {
                stack.push(AltFrame {
                    cursor: frame_cursor,
                    symbol: alt,
                });
            }
        }
        x = if matched { symbol.next } else { symbol.alt };

        if x.is_none() && !matched {
            if let Some(frame) = stack.pop() {
                if frame.cursor == ctx.cursor() {
                    x = Some(frame.symbol);
                }
            }
        }
    }

    if matched {
        node.range = ctx.slice_from(start);
        Some(node)
    } else {
        None
    }
}
