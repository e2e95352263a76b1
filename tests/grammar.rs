use parsekit::{
    Conflict, ConflictSet, CreateParserError, GrammarErrorKind, NodeId, ParseContext, Parser,
    RuleDef, TokenDef, STRING_PATTERN,
};

fn check_cases(parser: &mut Parser, start: usize, cases: &[(&str, bool)]) {
    for &(input, expected) in cases {
        let mut ctx = ParseContext::new(input.as_bytes());
        let result = parser.parse(&mut ctx, start);
        assert_eq!(
            result.is_ok(),
            expected,
            "parsing `{input}` from `{}`",
            parser.production_name(start).unwrap_or("?"),
        );
    }
}

fn expect_ll1(expected: bool, rules: &[RuleDef], tokens: &[TokenDef]) {
    let mut parser = Parser::from_rules(rules, tokens).unwrap();
    assert_eq!(
        parser.is_ll1(),
        expected,
        "expected is_ll1 == {expected} for {rules:?}",
    );
}

#[test]
fn arithmetic_grammar_from_ebnf() {
    let grammar = "expression = term {('+' | '-' ) term } .\n\
                   term       = factor {('*' | '/') factor } .\n\
                   factor     = ( digits | '(' expression ')' ) .\n\
                   digits     = digit { opt [ '!' ] hash digit } .\n\
                   opt        = [ '?' ] .\n\
                   hash       = [ '#' ] .\n\
                   digit      = '0' | '1' | '2' | '3' | '4' | '5' | \
                   '6' | '7' | '8' | '9' .\n";

    let mut parser = Parser::from_ebnf(grammar, &[]).unwrap();
    assert_eq!(parser.find_production("digits"), Some(3));

    let cases = [
        ("12?!#1", true),
        ("1?", false),
        ("", false),
        ("()", false),
        ("1?2", true),
        ("23", true),
        ("45*67", true),
        ("1?1", true),
        ("1+1", true),
        ("(1+1)", true),
    ];
    check_cases(&mut parser, 0, &cases);
}

#[test]
fn calculator_with_number_token() {
    let tokens = [TokenDef { name: "number", pattern: r"-?\d+" }];
    let rules = [
        RuleDef { name: "expression", rule: "term {('+' | '-') term }" },
        RuleDef { name: "term", rule: "factor {('*' | '/') factor }" },
        RuleDef { name: "factor", rule: "digits | '(' expression ')'" },
        RuleDef { name: "digits", rule: "number" },
    ];
    let mut parser = Parser::from_rules(&rules, &tokens).unwrap();
    assert!(parser.is_ll1());

    let cases = [("1+2*3", true), ("(1+2)*3", true), ("()", false)];
    check_cases(&mut parser, 0, &cases);
}

#[test]
fn lookahead_within_one_production() {
    let grammars = [
        "A = { B | C } .\nB = 'b' .\nC = 'c' .\n",
        "A = B | C .\nB = 'bb' .\nC = 'bc' .\n",
    ];
    for grammar in grammars {
        let mut parser = Parser::from_ebnf(grammar, &[]).unwrap();
        let mut ctx = ParseContext::new(b"bc");
        assert!(parser.parse(&mut ctx, 0).is_ok(), "grammar {grammar}");
    }
}

// Token ids (0..=8) and rule ids (9..=12) share one numbering, which is
// why the rule table below starts with nine placeholder rows.
const STRING: usize = 0;
const NUMBER: usize = 1;
const COLON: usize = 4;
const LSQBRK: usize = 5;
const RSQBRK: usize = 6;
const OBJECT: usize = 9;
const LIST: usize = 10;
const KEYVALUE: usize = 12;

fn json_parser() -> Parser {
    let tokens = [
        TokenDef { name: "string", pattern: STRING_PATTERN },
        TokenDef { name: "number", pattern: r"-?(\d+|\d+\.\d*|\d*\.\d+)" },
        TokenDef { name: "boolean", pattern: "true|false" },
        TokenDef { name: "comma", pattern: "," },
        TokenDef { name: "colon", pattern: ":" },
        TokenDef { name: "lsqbrk", pattern: r"\[" },
        TokenDef { name: "rsqbrk", pattern: r"\]" },
        TokenDef { name: "lcbrk", pattern: "{" },
        TokenDef { name: "rcbrk", pattern: "}" },
    ];
    let hole = RuleDef { name: "", rule: "" };
    let rules = [
        hole,
        hole,
        hole,
        hole,
        hole,
        hole,
        hole,
        hole,
        hole,
        RuleDef {
            name: "object",
            rule: "( lcbrk keyvalues rcbrk | lsqbrk list rsqbrk | number | string | boolean )",
        },
        RuleDef { name: "list", rule: "[ object { comma object } ] " },
        RuleDef { name: "keyvalues", rule: "[ keyvalue { comma keyvalue } ]" },
        RuleDef { name: "keyvalue", rule: "string colon object" },
    ];
    Parser::from_rules(&rules, &tokens).unwrap()
}

#[test]
fn json_grammar_is_ll1() {
    assert!(json_parser().is_ll1());
}

#[test]
fn json_end_to_end() {
    let mut parser = json_parser();
    let cases = [
        ("", false),
        ("[1", false),
        ("[1,2,45,-3]", true),
        ("[1 , 2 , 45 , -3 ]", true),
        ("{\"a\":1}", true),
        (
            "{\"key one\": [1,2,45,-3],\"number\":1,\"obj\":{ \"v\": \"str\"}}",
            true,
        ),
    ];
    check_cases(&mut parser, OBJECT, &cases);
}

#[test]
fn json_list_ast_shape() {
    let mut parser = json_parser();
    let input = b"[1,2,45,-3]";
    let mut ctx = ParseContext::new(input);
    let ast = parser.parse(&mut ctx, OBJECT).unwrap();

    assert_eq!(ast.id, NodeId::Rule(OBJECT));
    assert_eq!(ast.range, &input[..]);
    let kinds: Vec<NodeId> = ast.children.iter().map(|c| c.id).collect();
    assert_eq!(
        kinds,
        vec![
            NodeId::Token(LSQBRK),
            NodeId::Rule(LIST),
            NodeId::Token(RSQBRK),
        ]
    );

    let list = &ast.children[1];
    let numbers: Vec<&[u8]> = list
        .children
        .iter()
        .filter(|c| c.id == NodeId::Rule(OBJECT))
        .map(|c| {
            assert_eq!(c.children.len(), 1);
            assert_eq!(c.children[0].id, NodeId::Token(NUMBER));
            c.children[0].range
        })
        .collect();
    assert_eq!(numbers, vec![&b"1"[..], &b"2"[..], &b"45"[..], &b"-3"[..]]);

    insta::assert_snapshot!(ast.tree().trim_end(), @r"
object '[1,2,45,-3]'
  lsqbrk '['
  list '1,2,45,-3'
    object '1'
      number '1'
    comma ','
    object '2'
      number '2'
    comma ','
    object '45'
      number '45'
    comma ','
    object '-3'
      number '-3'
  rsqbrk ']'
");
}

#[test]
fn json_object_node_covers_surrounding_whitespace() {
    let mut parser = json_parser();
    let input = b" 1 ";
    let mut ctx = ParseContext::new(input);
    let ast = parser.parse(&mut ctx, OBJECT).unwrap();

    assert_eq!(ast.id, NodeId::Rule(OBJECT));
    assert_eq!(ast.range, b" 1 ");
    assert_eq!(ast.children.len(), 1);
    assert_eq!(ast.children[0].id, NodeId::Token(NUMBER));
    assert_eq!(ast.children[0].range, b"1");
}

#[test]
fn json_keyvalue_as_start_rule() {
    let mut parser = json_parser();
    let input = b"\"a\":\"b\"";
    let mut ctx = ParseContext::new(input);
    let ast = parser.parse(&mut ctx, KEYVALUE).unwrap();

    assert_eq!(ast.id, NodeId::Rule(KEYVALUE));
    assert_eq!(ast.range, &input[..]);
    assert_eq!(ast.children.len(), 3);
    assert_eq!(ast.children[0].id, NodeId::Token(STRING));
    assert_eq!(ast.children[0].range, b"\"a\"");
    assert!(ast.children[0].children.is_empty());
    assert_eq!(ast.children[1].id, NodeId::Token(COLON));
    assert_eq!(ast.children[2].id, NodeId::Rule(OBJECT));
    let value = &ast.children[2];
    assert_eq!(value.children.len(), 1);
    assert_eq!(value.children[0].id, NodeId::Token(STRING));
    assert_eq!(value.children[0].range, b"\"b\"");
}

#[test]
fn reparsing_yields_identical_asts() {
    let mut parser = json_parser();
    let input = b"{\"a\":1}";

    let mut ctx = ParseContext::new(input);
    let first = parser.parse(&mut ctx, OBJECT).unwrap();
    let mut ctx = ParseContext::new(input);
    let second = parser.parse(&mut ctx, OBJECT).unwrap();
    assert_eq!(first, second);
}

#[test]
fn optional_repeat_prefix() {
    let grammar = "B = [ A { A 'x' } ] 'z' .\nA = '1' .\n";
    let mut parser = Parser::from_ebnf(grammar, &[]).unwrap();
    let cases = [
        ("z", true),
        ("1", false),
        ("1xz", false),
        ("11xz", true),
        ("11x", false),
        ("x", false),
    ];
    check_cases(&mut parser, 0, &cases);
}

#[test]
fn multiple_optionals() {
    let grammar = "A = [ 'a' ] [ 'b' ] .\n";
    let mut parser = Parser::from_ebnf(grammar, &[]).unwrap();
    let cases = [
        ("", true),
        ("a", true),
        ("b", true),
        ("ab", true),
        ("aa", false),
        ("c", false),
        ("bc", false),
        ("bcd", false),
        ("abb", false),
    ];
    check_cases(&mut parser, 0, &cases);
}

#[test]
fn nested_optionals() {
    let grammar = "A = [ 'a' ] [ 'b' [ 'c' ] [ 'd' ] ] .\n";
    let mut parser = Parser::from_ebnf(grammar, &[]).unwrap();
    let cases = [
        ("abb", false),
        ("", true),
        ("a", true),
        ("b", true),
        ("ab", true),
        ("aa", false),
        ("c", false),
        ("bc", true),
        ("bcd", true),
        ("abcd", true),
    ];
    check_cases(&mut parser, 0, &cases);
}

#[test]
fn ll1_first_conflicts() {
    let none: &[TokenDef] = &[];

    expect_ll1(
        true,
        &[
            RuleDef { name: "dong", rule: "'a' strong | 'g' string" },
            RuleDef { name: "string", rule: "'\"' alpha { alpha } '\"'" },
            RuleDef { name: "strong", rule: "'\"' alpha { alpha } '\"'" },
            RuleDef { name: "alpha", rule: "'h' | 'n' | 'g'" },
        ],
        none,
    );

    // Rule 1: alternative terms must not share start symbols.
    expect_ll1(
        true,
        &[
            RuleDef { name: "A", rule: "B | C" },
            RuleDef { name: "B", rule: "'b'" },
            RuleDef { name: "C", rule: "'c'" },
        ],
        none,
    );
    {
        let rules = [
            RuleDef { name: "A", rule: "B | C" },
            RuleDef { name: "B", rule: "'b'" },
            RuleDef { name: "C", rule: "'b'" },
        ];
        let mut parser = Parser::from_rules(&rules, none).unwrap();
        assert_eq!(
            parser.ll1_conflicts(),
            vec![Conflict {
                a: 1,
                b: 2,
                byte: b'b',
                set: ConflictSet::First,
                owner: 0,
            }]
        );
    }
    expect_ll1(true, &[RuleDef { name: "A", rule: "'b' | 'c'" }], none);
    expect_ll1(false, &[RuleDef { name: "A", rule: "'bc' | 'bb'" }], none);

    // Rule 2: a skippable factor must not share start symbols with its
    // successor.
    expect_ll1(true, &[RuleDef { name: "A", rule: "'b' 'b'" }], none);
    expect_ll1(false, &[RuleDef { name: "A", rule: "[ 'b' ] 'b' " }], none);
    expect_ll1(
        true,
        &[
            RuleDef { name: "A", rule: "B 'b'" },
            RuleDef { name: "B", rule: "[ 'a' ] { 'd' }" },
        ],
        none,
    );
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'b'" },
            RuleDef { name: "B", rule: "'a' { 'b' }" },
        ],
        none,
    );
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'b'" },
            RuleDef { name: "B", rule: "[ 'a' ] { 'b' }" },
        ],
        none,
    );
}

#[test]
fn ll1_follow_conflicts() {
    let none: &[TokenDef] = &[];

    // A term ending in an optional tail.
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'b' { 'x' }" },
        ],
        none,
    );
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'b' [ 'x' ]" },
        ],
        none,
    );
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'b' { [ 'x' ] }" },
        ],
        none,
    );
    expect_ll1(
        true,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'b' { [ 'x' ] } 'x' " },
        ],
        none,
    );
    expect_ll1(
        true,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'b' 'x' " },
        ],
        none,
    );
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "{ 'x' } " },
        ],
        none,
    );

    // A term ending in a production that can match the empty string.
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'a' C" },
            RuleDef { name: "C", rule: "{ 'x' }" },
        ],
        none,
    );
    expect_ll1(
        true,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'a' C" },
            RuleDef { name: "C", rule: "'x' { 'y' } 'x'" },
        ],
        none,
    );

    // A term ending in a token whose regex can match the empty string.
    let tokens = [TokenDef { name: "X", pattern: "x*" }];
    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'a' X" },
        ],
        &tokens,
    );
    expect_ll1(
        true,
        &[
            RuleDef { name: "A", rule: "B 'x'" },
            RuleDef { name: "B", rule: "'a' X 'x'" },
        ],
        &tokens,
    );

    expect_ll1(
        false,
        &[
            RuleDef { name: "A", rule: "B | C" },
            RuleDef {
                name: "B",
                rule: "('a' | 'b' | 'c' | 'd' | 'e' | 'f') 'b'",
            },
            RuleDef {
                name: "C",
                rule: "('e' | 'f' | 'g' | 'h' | 'i' | 'j') 'c'",
            },
        ],
        none,
    );
}

#[test]
fn grammar_errors() {
    let kind = |result: Result<Parser, CreateParserError>| match result.unwrap_err() {
        CreateParserError::Grammar(e) => e.kind,
        other => panic!("expected a grammar error, got {other}"),
    };

    assert_eq!(
        kind(Parser::from_rules(
            &[RuleDef { name: "A", rule: "missing" }],
            &[],
        )),
        GrammarErrorKind::UnknownIdentifier("missing".to_string()),
    );
    assert_eq!(
        kind(Parser::from_rules(
            &[
                RuleDef { name: "A", rule: "'a'" },
                RuleDef { name: "A", rule: "'b'" },
            ],
            &[],
        )),
        GrammarErrorKind::DuplicateProduction("A".to_string()),
    );
    assert_eq!(
        kind(Parser::from_rules(&[RuleDef { name: "A", rule: "''" }], &[])),
        GrammarErrorKind::EmptyString,
    );
    assert_eq!(
        kind(Parser::from_rules(
            &[RuleDef { name: "A", rule: "( 'a'" }],
            &[],
        )),
        GrammarErrorKind::Unbalanced(')'),
    );
    assert_eq!(
        kind(Parser::from_ebnf("A = 'a'", &[])),
        GrammarErrorKind::UnexpectedEof,
    );
}
