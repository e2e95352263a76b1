//! FIRST/FOLLOW computation and LL(1) conflict detection.
//!
//! The analyzer shares the parser's symbol graph and expression trees.
//! FIRST and FOLLOW sets are built as lists of lazily expanded follow
//! descriptors and only flattened to byte bitmaps when the intersection
//! checks run. A grammar is LL(1) iff no production's
//! alternatives share a first byte and no optional tail's first set
//! intersects the follow set of the production containing it.
//!
//! Conflicts are diagnostics, not errors: the parser still runs on a
//! non-LL(1) grammar but may backtrack.
use ahash::AHashSet;

use crate::arena::Arena;
use crate::grammar::{Expression, Factor, Production, Symbol, SymbolId, SymbolKind, Term};
use crate::parser::Parser;
use crate::scanner::Scanner;
use crate::utils::{self, ByteSet};

const LOOKAHEAD: i32 = 1;

/// A lazily expanded member of a FIRST or FOLLOW set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Lookahead {
    /// A literal's first byte.
    Char(u8),
    /// Every byte a scanner token can start with.
    Token(usize),
    /// The FIRST set of a production.
    First(usize),
    /// The FOLLOW set of a production.
    Follow(usize),
}

/// Which set a conflict was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConflictSet {
    /// Two alternatives of the owning production share a first byte.
    First,
    /// An optional tail's first set intersects the owner's follow set.
    Follow,
}

/// Two productions competing for the same lookahead byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// Rule id of the first production involved.
    pub a: usize,
    /// Rule id of the second production involved.
    pub b: usize,
    /// The byte both productions allow.
    pub byte: u8,
    /// Whether the clash is in the first or the follow set.
    pub set: ConflictSet,
    /// Rule id of the production the conflict was found in.
    pub owner: usize,
}

/// A descriptor expanded to a byte bitmap, tagged with the production it
/// came from for reporting.
#[derive(Clone)]
struct Record {
    set: ByteSet,
    production: usize,
}

fn token_matches_empty(scanner: &mut Scanner, token: usize) -> bool {
    scanner
        .token_mut(token)
        .is_some_and(|t| t.pattern.matches_empty())
}

/// Whether a factor can match the empty string.
fn factor_optional(productions: &[Production], scanner: &mut Scanner, factor: &Factor) -> bool {
    match factor {
        Factor::Optional(_) | Factor::Repeat(_) => true,
        Factor::Group(e) => expression_optional(productions, scanner, e),
        Factor::Rule(rule) => expression_optional(productions, scanner, &productions[*rule].expr),
        Factor::Token(token) => token_matches_empty(scanner, *token),
        Factor::Literal(_) => false,
        Factor::Identifier { name, .. } => panic!("unresolved identifier `{name}` in analysis"),
    }
}

/// Whether every term of `expr` consists only of optional factors.
fn expression_optional(
    productions: &[Production],
    scanner: &mut Scanner,
    expr: &Expression,
) -> bool {
    for term in &expr.terms {
        for factor in &term.factors {
            if !factor_optional(productions, scanner, factor) {
                return false;
            }
        }
    }
    true
}

/// Walks a term's factors left to right, appending descriptors until the
/// first factor that cannot be skipped. Returns whether the whole term
/// was optional.
fn populate_first_term(
    productions: &[Production],
    scanner: &mut Scanner,
    term: &Term,
    out: &mut Vec<Lookahead>,
) -> bool {
    for factor in &term.factors {
        match factor {
            Factor::Optional(e) | Factor::Repeat(e) => {
                // These can be skipped, so the following factor also
                // contributes to the first set.
                populate_first_expr(productions, scanner, e, out);
            }
            Factor::Group(e) => {
                if populate_first_expr(productions, scanner, e, out)
                    || expression_optional(productions, scanner, e)
                {
                    continue;
                }
                return false;
            }
            Factor::Rule(rule) => {
                out.push(Lookahead::First(*rule));
                if expression_optional(productions, scanner, &productions[*rule].expr) {
                    continue;
                }
                return false;
            }
            Factor::Literal(text) => {
                if let Some(&first) = text.as_bytes().first() {
                    out.push(Lookahead::Char(first));
                }
                return false;
            }
            Factor::Token(token) => {
                out.push(Lookahead::Token(*token));
                if token_matches_empty(scanner, *token) {
                    continue;
                }
                return false;
            }
            Factor::Identifier { name, .. } => {
                panic!("unresolved identifier `{name}` in analysis")
            }
        }
    }
    true
}

/// FIRST of an expression: the union over its terms. Returns whether all
/// terms were optional.
fn populate_first_expr(
    productions: &[Production],
    scanner: &mut Scanner,
    expr: &Expression,
    out: &mut Vec<Lookahead>,
) -> bool {
    let mut all_optional = true;
    for term in &expr.terms {
        if !populate_first_term(productions, scanner, term, out) {
            all_optional = false;
        }
    }
    all_optional
}

/// Adds the descriptors of every symbol reachable within `k` consuming
/// steps of `start` to `out`.
fn add_symbols(
    symbols: &Arena<Symbol>,
    start: Option<SymbolId>,
    k: i32,
    out: &mut Vec<Lookahead>,
) {
    if k <= 0 {
        return;
    }
    let mut alt = start;
    while let Some(current) = alt {
        let symbol = &symbols[current];
        let descriptor = match &symbol.kind {
            SymbolKind::Empty => {
                add_symbols(symbols, symbol.next, k, out);
                alt = symbol.alt;
                continue;
            }
            SymbolKind::Rule(rule) => Lookahead::First(*rule),
            SymbolKind::Token(token) => Lookahead::Token(*token),
            SymbolKind::Literal(text) => match text.as_bytes().first() {
                Some(&first) => Lookahead::Char(first),
                None => {
                    alt = symbol.alt;
                    continue;
                }
            },
        };
        if !out.contains(&descriptor) {
            out.push(descriptor);
            add_symbols(symbols, symbol.next, k - 1, out);
        }
        alt = symbol.alt;
    }
}

/// Whether the end of the production containing `start` is reachable
/// within `k` consuming steps.
fn symbol_at_end(
    productions: &[Production],
    scanner: &mut Scanner,
    symbols: &Arena<Symbol>,
    start: Option<SymbolId>,
    k: i32,
) -> bool {
    if k < 0 {
        return false;
    }
    let Some(first) = start else {
        return true;
    };
    let mut alt = Some(first);
    while let Some(current) = alt {
        let symbol = &symbols[current];
        if let SymbolKind::Rule(rule) = symbol.kind {
            if expression_optional(productions, scanner, &productions[rule].expr) {
                return symbol_at_end(productions, scanner, symbols, symbol.next, k);
            }
        }
        let remaining = if matches!(symbol.kind, SymbolKind::Empty) {
            k
        } else {
            k - 1
        };
        if symbol_at_end(productions, scanner, symbols, symbol.next, remaining) {
            return true;
        }
        alt = symbol.alt;
    }
    false
}

/// One pass over the symbol graph applying the three FOLLOW rules: (R1)
/// whatever follows an occurrence of a production joins its follow set,
/// (R2) a production at the end of a repeat sees the repeat's start again
/// via the loop edge, (R3) a production at the end of another production
/// inherits the owner's follow set.
fn follow_walker(
    productions: &[Production],
    symbols: &Arena<Symbol>,
    scanner: &mut Scanner,
    start: Option<SymbolId>,
    seen: &mut AHashSet<SymbolId>,
    follows: &mut [Vec<Lookahead>],
    owner: usize,
) {
    // Alt chains cannot cycle by construction; next chains can, so the
    // inner loop runs a hare alongside the tortoise.
    let mut alt = start;
    while let Some(head) = alt {
        let mut slow = Some(head);
        let mut fast = Some(head);
        loop {
            let Some(current) = slow else { break };
            if seen.insert(current) {
                follow_walker(productions, symbols, scanner, Some(current), seen, follows, owner);
                if let SymbolKind::Rule(rule) = symbols[current].kind {
                    // R1, R2: everything one consuming step after this
                    // occurrence joins the production's follow set.
                    let mut next = symbols[current].next;
                    while let Some(n) = next {
                        add_symbols(symbols, Some(n), LOOKAHEAD, &mut follows[rule]);
                        next = symbols[n].alt;
                    }
                    follow_walker(
                        productions,
                        symbols,
                        scanner,
                        productions[rule].start,
                        seen,
                        follows,
                        rule,
                    );
                    // R3: at the end of the owning production, the
                    // owner's follow set applies as well.
                    if symbol_at_end(productions, scanner, symbols, Some(current), LOOKAHEAD) {
                        follows[rule].push(Lookahead::Follow(owner));
                    }
                }
            }
            slow = symbols[current].next;
            fast = fast.and_then(|f| symbols[f].next);
            fast = fast.and_then(|f| symbols[f].next);
            if slow == fast {
                break;
            }
        }
        alt = symbols[head].alt;
    }
}

fn populate_follow(
    productions: &[Production],
    symbols: &Arena<Symbol>,
    scanner: &mut Scanner,
    follows: &mut [Vec<Lookahead>],
) {
    let mut seen = AHashSet::new();
    for rule in 0..productions.len() {
        follow_walker(
            productions,
            symbols,
            scanner,
            productions[rule].start,
            &mut seen,
            follows,
            rule,
        );
    }
}

/// Expands a descriptor into the set of reachable bytes.
fn expand(
    scanner: &Scanner,
    firsts: &[Vec<Lookahead>],
    follows: &[Vec<Lookahead>],
    entry: &Lookahead,
    set: &mut ByteSet,
    seen: &mut AHashSet<Lookahead>,
) {
    if !seen.insert(entry.clone()) {
        return;
    }
    match entry {
        Lookahead::Char(byte) => {
            set.insert(*byte as usize);
        }
        Lookahead::Token(token) => {
            if let Some(t) = scanner.token(*token) {
                t.pattern().first_bytes(set);
            }
        }
        Lookahead::First(rule) => {
            for e in &firsts[*rule] {
                expand(scanner, firsts, follows, e, set, seen);
            }
        }
        Lookahead::Follow(rule) => {
            for e in &follows[*rule] {
                expand(scanner, firsts, follows, e, set, seen);
            }
        }
    }
}

/// Flattens descriptors to byte bitmaps, tagging each with the production
/// it stands for.
fn populate_maps(
    scanner: &Scanner,
    firsts: &[Vec<Lookahead>],
    follows: &[Vec<Lookahead>],
    owner: usize,
    entries: &[Lookahead],
) -> Vec<Record> {
    entries
        .iter()
        .map(|entry| {
            let mut set = utils::byte_set();
            let mut production = owner;
            match entry {
                Lookahead::Char(byte) => {
                    set.insert(*byte as usize);
                }
                Lookahead::Token(token) => {
                    if let Some(t) = scanner.token(*token) {
                        t.pattern().first_bytes(&mut set);
                    }
                }
                Lookahead::First(rule) | Lookahead::Follow(rule) => {
                    production = *rule;
                    let mut seen = AHashSet::new();
                    expand(scanner, firsts, follows, entry, &mut set, &mut seen);
                }
            }
            Record { set, production }
        })
        .collect()
}

/// Finds a byte allowed by two different records.
fn check_intersection(records: &[Record], owner: usize, which: ConflictSet) -> Option<Conflict> {
    for byte in 0..256 {
        let mut seen: Option<usize> = None;
        for record in records {
            if !record.set.contains(byte) {
                continue;
            }
            if let Some(a) = seen {
                return Some(Conflict {
                    a,
                    b: record.production,
                    byte: byte as u8,
                    set: which,
                    owner,
                });
            }
            seen = Some(record.production);
        }
    }
    None
}

/// The first LL(1) conflict in production `rule`, if any.
fn get_conflicts(
    productions: &[Production],
    scanner: &mut Scanner,
    firsts: &[Vec<Lookahead>],
    follows: &[Vec<Lookahead>],
    rule: usize,
) -> Option<Conflict> {
    // Rules 1 and 2: alternative terms must not share start bytes, and a
    // skippable factor must not share start bytes with its successor.
    // Both fall out of a pairwise check over the flat first-set records.
    let first_map = populate_maps(scanner, firsts, follows, rule, &firsts[rule]);
    if let Some(conflict) = check_intersection(&first_map, rule, ConflictSet::First) {
        return Some(conflict);
    }

    let follow_map = populate_maps(scanner, firsts, follows, rule, &follows[rule]);

    // Rule 3: the first set of an optional tail must be disjoint from the
    // follow set of the production containing it. Walk each term's
    // factors from the back for as long as they are skippable.
    for term in &productions[rule].expr.terms {
        for factor in term.factors.iter().rev() {
            let mut optional = false;
            match factor {
                Factor::Optional(e) | Factor::Repeat(e) => {
                    optional = true;
                    let mut expr_first = Vec::new();
                    populate_first_expr(productions, scanner, e, &mut expr_first);
                    let mut map = populate_maps(scanner, firsts, follows, rule, &expr_first);
                    map.extend(follow_map.iter().cloned());
                    if let Some(conflict) = check_intersection(&map, rule, ConflictSet::Follow) {
                        return Some(conflict);
                    }
                }
                Factor::Group(e) => {
                    if expression_optional(productions, scanner, e) {
                        optional = true;
                        let mut expr_first = Vec::new();
                        populate_first_expr(productions, scanner, e, &mut expr_first);
                        let mut map = populate_maps(scanner, firsts, follows, rule, &expr_first);
                        map.extend(follow_map.iter().cloned());
                        if let Some(conflict) = check_intersection(&map, rule, ConflictSet::Follow)
                        {
                            return Some(conflict);
                        }
                    }
                }
                Factor::Rule(sub) => {
                    if expression_optional(productions, scanner, &productions[*sub].expr) {
                        optional = true;
                        let mut map = populate_maps(scanner, firsts, follows, *sub, &firsts[*sub]);
                        map.extend(follow_map.iter().cloned());
                        if let Some(conflict) = check_intersection(&map, rule, ConflictSet::Follow)
                        {
                            return Some(conflict);
                        }
                    }
                }
                Factor::Token(token) => {
                    if token_matches_empty(scanner, *token) {
                        optional = true;
                        let entries = [Lookahead::Token(*token)];
                        let mut map = populate_maps(scanner, firsts, follows, rule, &entries);
                        map.extend(follow_map.iter().cloned());
                        if let Some(conflict) = check_intersection(&map, rule, ConflictSet::Follow)
                        {
                            return Some(conflict);
                        }
                    }
                }
                Factor::Literal(_) => {}
                Factor::Identifier { name, .. } => {
                    panic!("unresolved identifier `{name}` in analysis")
                }
            }
            if !optional {
                break;
            }
        }
    }
    None
}

impl Parser {
    /// Computes FIRST/FOLLOW for every production and reports every
    /// production's first LL(1) conflict. An empty result means the
    /// grammar is LL(1).
    ///
    /// Conflicts are also logged at debug level with production names.
    pub fn ll1_conflicts(&mut self) -> Vec<Conflict> {
        let Parser {
            ref productions,
            ref symbols,
            ref mut scanner,
        } = *self;

        let count = productions.len();
        let mut firsts: Vec<Vec<Lookahead>> = vec![Vec::new(); count];
        for rule in 0..count {
            let mut out = Vec::new();
            populate_first_expr(productions, scanner, &productions[rule].expr, &mut out);
            firsts[rule] = out;
        }

        let mut follows: Vec<Vec<Lookahead>> = vec![Vec::new(); count];
        populate_follow(productions, symbols, scanner, &mut follows);

        let mut conflicts = Vec::new();
        for rule in 0..count {
            if let Some(conflict) = get_conflicts(productions, scanner, &firsts, &follows, rule) {
                log::debug!(
                    "productions `{}` and `{}` are in conflict: both allow '{}' in the {} set of `{}`",
                    productions[conflict.a].name,
                    productions[conflict.b].name,
                    utils::display_byte(conflict.byte),
                    conflict.set,
                    productions[conflict.owner].name,
                );
                conflicts.push(conflict);
            }
        }
        conflicts
    }

    /// Whether the grammar is LL(1): no production has a first/first or
    /// first/follow clash after expanding all descriptors to byte sets.
    pub fn is_ll1(&mut self) -> bool {
        self.ll1_conflicts().is_empty()
    }
}
