use parsekit::regex::matches;
use parsekit::{InvalidRegexKind, Regex, STRING_PATTERN};

#[test]
fn strict_match_table() {
    let cases: &[(&str, &str, bool)] = &[
        ("h+", "h", true),
        ("h+", "", false),
        ("h+", "hh", true),
        ("h+", "hhh", true),
        (r"\(", "(", true),
        ("[a-e]", "a", true),
        ("[a-e]", "e", true),
        ("[a-e]", "f", false),
        ("[a-e0-3]", "1", true),
        ("[a-e0-3]", "a", true),
        ("[a-e0-3]", "4", false),
        ("[a-z][a-zA-Z]*[a-z]", "hHELLO", false),
        ("[a-z][a-zA-Z]*[a-z]", "hHELLo", true),
        ("[b-eg-j]", "a", false),
        ("[b-eg-j]", "e", true),
        ("[b-eg-j]", "f", false),
        ("[b-eg-j]", "j", true),
        ("[b-eg-j]", "k", false),
        ("[^b-eg-j]", "a", true),
        ("[^b-eg-j]", "e", false),
        ("[^b-eg-j]", "f", true),
        ("[^b-eg-j]", "j", false),
        ("[^b-eg-j]", "k", true),
        ("[b-e]|[g-j]", "a", false),
        ("[b-e]|[g-j]", "e", true),
        ("[b-e]|[g-j]", "f", false),
        ("[b-e]|[g-j]", "j", true),
        ("[b-e]|[g-j]", "k", false),
        ("[^.]", ".", false),
        ("[^.]", "x", true),
        ("[^^]", "^", false),
        ("[^^]", ".", true),
        ("a?", "a", true),
        ("a?", "", true),
        ("a?", "aa", false),
        ("a?", "b", false),
        ("a?", "ab", false),
        ("a?", "ba", false),
        ("a?b", "b", true),
        ("a?b", "ab", true),
        ("ba?", "b", true),
        ("ba?", "ba", true),
        ("ab?c", "ac", true),
        ("ab?c", "abc", true),
        ("ab?c", "c", false),
        ("(abc[de])?f", "f", true),
        ("(abc[de])?f", "abcef", true),
        ("(abc[de])?f", "abcf", false),
        ("(abc[de])?f", "abcdf", true),
        ("(abc[de])?f", "abcd", false),
        ("(abc[de]?)?f", "abcdf", true),
        ("(abc[de]?)?f", "abcf", true),
        ("(abc[de]?)?f", "abc", false),
        ("(a|)c", "ac", true),
        ("(a|b)*c", "ac", true),
        ("(a|b)*c", "bc", true),
        ("(a|b)*c", "c", true),
        ("(a|b)*?c", "babbac", true),
        ("(a|b)*?c", "babbab", false),
        ("(a|b)*c", "babbac", true),
        ("(a|b)*c", "babbab", false),
        ("", "", true),
        ("", "a", false),
        (".", "", false),
        (".", "x", true),
        ("[ab][cd]", "ac", true),
        ("[ab][cd]", "bc", true),
        ("[ab][cd]", "ad", true),
        ("[ab][cd]", "bd", true),
        ("[ab][cd][ef]", "acf", true),
        ("[ab][cd][ef]", "acg", false),
        ("abab", "abab", true),
        ("abab", "aba", false),
        ("[ab]", "a", true),
        ("[ab]", "b", true),
        ("[ab]", "c", false),
        ("[a.b]", "a", true),
        ("[a.b]", "b", true),
        ("[a.b]", ".", true),
        ("[a.b]", "c", false),
        ("ab|cd", "ab", true),
        ("ab|cd", "cd", true),
        ("ab|cd", "acd", false),
        ("ab|cd", "a", false),
        ("ab|cd", "bcd", false),
        ("(ab|cd)", "ab", true),
        ("(ab|cd)", "cd", true),
        ("(ab|cd)", "acd", false),
        ("(ab|cd)", "a", false),
        ("(ab|cd)", "bcd", false),
        ("((ab)*|cd)", "ababab", true),
        ("((ab)*?|cd)", "ababab", true),
        ("((ab)*|cd)", "cd", true),
        ("a|b*", "a", true),
        ("a|b*", "", true),
        ("a|b*", "b", true),
        ("a|b*", "bb", true),
        (r"\.", "x", false),
        (r"\.", ".", true),
        ("a", ".", false),
        (r"\d+", "123", true),
        (r"\d+", "12a", false),
        (r"\d+", "", false),
        ("abc.def.*ghi", "abcidefasdfghi", true),
        ("abc.def.*ghi", "abcidefasdfghig", false),
        ("abc.def.*?ghi", "abcidefasdfghig", false),
        ("a*b*c", "aaaaaaaac", true),
        ("a*?b*?c", "aaaaaaaac", true),
        ("ab*", "a", true),
        ("ab*", "ab", true),
        ("ab*", "abab", false),
        ("ab*", "abb", true),
    ];

    for &(pattern, input, expected) in cases {
        let got = matches(pattern, input.as_bytes())
            .unwrap_or_else(|e| panic!("pattern `{pattern}` failed to compile: {e}"));
        assert_eq!(got, expected, "pattern `{pattern}` on input `{input}`");
    }
}

#[test]
fn invalid_patterns_fail_to_compile() {
    assert_eq!(
        Regex::new("h+*").unwrap_err().kind,
        InvalidRegexKind::UnescapedMetacharacter('*'),
    );
    assert_eq!(
        Regex::new("[]").unwrap_err().kind,
        InvalidRegexKind::EmptyClass,
    );
    assert_eq!(
        Regex::new("(ab").unwrap_err().kind,
        InvalidRegexKind::UnbalancedGroup,
    );
    assert_eq!(
        Regex::new("]").unwrap_err().kind,
        InvalidRegexKind::UnbalancedClass,
    );
    assert_eq!(
        Regex::new("ab\\").unwrap_err().kind,
        InvalidRegexKind::TrailingEscape,
    );
}

#[test]
fn greediness_controls_prefix_length() {
    let cases: &[(&str, &str, usize)] = &[
        ("[0-9]+", "123.456", 3),
        ("[0-9]*", "123.456", 3),
        ("[0-9]+?", "123.456", 1),
        ("[0-9]*?", "123.456", 0),
        (".*?ab", "123123abab", 8),
        (".*?.*?ab", "123123abab", 8),
        (".*ab", "123123abab", 10),
    ];
    for &(pattern, input, expected) in cases {
        let mut re = Regex::new(pattern).unwrap();
        let text = re
            .matches_prefix(input.as_bytes())
            .unwrap_or_else(|| panic!("pattern `{pattern}` did not match a prefix of `{input}`"));
        assert_eq!(
            text.len(),
            expected,
            "pattern `{pattern}` on input `{input}`"
        );
    }
}

#[test]
fn find_locates_leftmost_match() {
    struct Case {
        pattern: &'static str,
        input: &'static str,
        at: Option<(usize, usize)>,
    }
    let cases = [
        Case {
            pattern: STRING_PATTERN,
            input: r#"quote "\"""#,
            at: Some((6, 4)),
        },
        Case {
            pattern: ".*ab",
            input: "hello abcd",
            at: Some((0, 8)),
        },
        Case {
            pattern: "ble.*ab",
            input: "hello abcd",
            at: None,
        },
        Case {
            pattern: "ble.*ab",
            input: "asdf blegab",
            at: Some((5, 6)),
        },
        Case {
            pattern: r#""[^"]*""#,
            input: r#""str" "other str""#,
            at: Some((0, 5)),
        },
        Case {
            pattern: r#""[^"]*""#,
            input: r#""str \"escaped!""#,
            at: Some((0, 7)),
        },
        Case {
            pattern: STRING_PATTERN,
            input: r#"empty """#,
            at: Some((6, 2)),
        },
        Case {
            pattern: STRING_PATTERN,
            input: r#"ab "runaway string"#,
            at: None,
        },
        Case {
            pattern: STRING_PATTERN,
            input: r#"ab "runaway string \" 2"#,
            at: None,
        },
        Case {
            pattern: STRING_PATTERN,
            input: r#"leading "str \"escaped!" rest"#,
            at: Some((8, 16)),
        },
        Case {
            pattern: STRING_PATTERN,
            input: r#"ab "str \"escaped!" rest"#,
            at: Some((3, 16)),
        },
    ];

    for case in &cases {
        let mut re = Regex::new(case.pattern).unwrap();
        let found = re.find(case.input.as_bytes());
        match case.at {
            None => assert!(
                found.is_none(),
                "pattern `{}` unexpectedly matched in `{}`",
                case.pattern,
                case.input
            ),
            Some((start, len)) => {
                let m = found.unwrap_or_else(|| {
                    panic!("pattern `{}` missing in `{}`", case.pattern, case.input)
                });
                assert_eq!(m.start, start, "offset of `{}`", case.pattern);
                assert_eq!(m.text.len(), len, "length of `{}`", case.pattern);
                assert_eq!(m.text, &case.input.as_bytes()[start..start + len]);
            }
        }
    }
}

#[test]
fn first_bytes_collects_epsilon_reachable_ranges() {
    let mut set = parsekit::utils::byte_set();
    Regex::new("(a|b)*c").unwrap().first_bytes(&mut set);
    let got: Vec<usize> = set.ones().collect();
    assert_eq!(got, vec![b'a' as usize, b'b' as usize, b'c' as usize]);

    let mut set = parsekit::utils::byte_set();
    Regex::new(r"\d+").unwrap().first_bytes(&mut set);
    let got: Vec<usize> = set.ones().collect();
    assert_eq!(got, (b'0'..=b'9').map(|b| b as usize).collect::<Vec<_>>());
}

#[test]
fn compile_and_drop_is_repeatable() {
    for _ in 0..100 {
        let mut re = Regex::new("(a|b)*c").unwrap();
        assert!(re.matches_strict(b"abc"));
    }
}
