/*!
# parsekit

This crate is a grammar-driven parsing toolkit. It compiles a small
byte-oriented regex dialect into nondeterministic finite automata, compiles
EBNF grammars (together with a regex-backed token set) into a linked symbol
graph, and drives a scanner and a backtracking top-down parser that
produces an abstract syntax tree. A companion LL(1) analyzer computes
FIRST/FOLLOW sets over the same symbol graph and reports conflicts.

Here is a quick example of how this crate works:

```rust
use parsekit::{NodeId, ParseContext, Parser, RuleDef, TokenDef};

let tokens = [TokenDef { name: "number", pattern: "-?\\d+" }];
let rules = [
    RuleDef { name: "expression", rule: "term {('+' | '-') term}" },
    RuleDef { name: "term", rule: "factor {('*' | '/') factor}" },
    RuleDef { name: "factor", rule: "digits | '(' expression ')'" },
    RuleDef { name: "digits", rule: "number" },
];
let mut parser = Parser::from_rules(&rules, &tokens).unwrap();
assert!(parser.is_ll1());

let mut ctx = ParseContext::new(b"(1+2)*3");
let ast = parser.parse(&mut ctx, 0).unwrap();
assert_eq!(ast.id, NodeId::Rule(0));
assert_eq!(ast.range, b"(1+2)*3");
```

# Overview

The primary type is [`Parser`]. The most important methods are:

- [`Parser::from_rules`]: compiles a table of `(name, rule)` pairs plus a
  token table into a parser. The row position is the rule id and surfaces
  as the AST node kind, so tables are typically indexed by an enum;
  empty-named rows are placeholders that keep later ids aligned.
- [`Parser::from_ebnf`]: compiles a full EBNF source text instead
  (`identifier = expression .` productions, ids in order of appearance).
- [`Parser::parse`]: parses a borrowed input from a start rule and returns
  an [`Ast`] whose ranges point back into the input buffer.
- [`Parser::is_ll1`] / [`Parser::ll1_conflicts`]: FIRST/FOLLOW analysis.
  Conflicts are diagnostics; the parser still runs on non-LL(1) grammars
  but may backtrack.

The pieces underneath are usable on their own: [`Regex`] for the automata,
[`Scanner`] for ordered first-match-wins tokenization, and
[`ParseContext`] as the shared cursor every component borrows.

# Grammar syntax

```text
syntax     = { production }.
production = identifier "=" expression ".".
expression = term { "|" term }.
term       = factor { factor }.
factor     = identifier | string | "(" expression ")"
           | "[" expression "]" | "{" expression "}".
```

`[ e ]` is optional, `{ e }` repeats zero or more times, `|` alternates,
and quoted strings (single or double ticks) match literally. Identifiers
refer to other productions first and to scanner tokens second.

Whitespace is skipped around token matches but **not** around literal
strings; a literal that should float on whitespace must be registered as a
token instead.

```rust
use parsekit::{ParseContext, Parser};

let grammar = "A = [ 'a' ] [ 'b' ] .\n";
let mut parser = Parser::from_ebnf(grammar, &[]).unwrap();
let mut ctx = ParseContext::new(b"ab");
assert!(parser.parse(&mut ctx, 0).is_ok());
```

# Regex dialect

Byte-oriented and deliberately small: character classes with ranges and
`^` negation, groups, the postfix operators `*`, `+`, `?` and their lazy
variants `*?`, `+?`, right-associative `|`, `.` for any byte, and the
escapes `\n`, `\t`, `\d` (any other `\x` is a literal `x`). No anchors,
no back-references, no Unicode classes. Matching is NFA-backed depth-first
search; edge order encodes greediness.

```rust
use parsekit::Regex;

let mut re = Regex::new("(a|b)*c").unwrap();
assert!(re.matches_strict(b"babbac"));
assert!(!re.matches_strict(b"babbab"));
```

A compiled [`Regex`] is reusable but not reentrant: the cycle guard lives
in the automaton nodes, which is why every matching method takes
`&mut self`. Two threads should compile their own instances.

# Diagnostics

Errors are returned, never thrown: [`InvalidRegex`] from regex
compilation, [`CreateParserError`] from grammar compilation and
[`ParseError`] from parsing, which leaves the context cursor at the
furthest progress. [`text::position`] maps a matched slice back to line
and column, and [`text::error_ctx`] logs a three-line caret window through
the [`log`] facade.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod analysis;
pub mod arena;
pub mod grammar;
pub mod parser;
pub mod regex;
pub mod scanner;
pub mod text;
pub mod utils;

pub use analysis::{Conflict, ConflictSet};
pub use grammar::{GrammarError, GrammarErrorKind};
pub use parser::{Ast, CreateParserError, NodeId, ParseError, Parser, RuleDef};
pub use regex::{InvalidRegex, InvalidRegexKind, Match, Regex};
pub use scanner::{CreateScannerError, Scanned, Scanner, Token, TokenDef};
pub use text::{ParseContext, Position, STRING_PATTERN};
