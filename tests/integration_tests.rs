mod integration_tests_helper {

    use dfaviz::{build_followpos_table, build_syntax_tree, construct_dfa, ParseError, DFA};

    pub fn get_dfa(regex: &str) -> DFA {
        let syntax_tree = build_syntax_tree(regex);

        // assert parsing the regex was successful
        assert!(syntax_tree.is_ok(), "failed to parse {}", regex);

        let syntax_tree = syntax_tree.unwrap();

        let followpos = build_followpos_table(&syntax_tree);

        construct_dfa(&syntax_tree, &followpos)
    }

    pub fn get_error(regex: &str) -> ParseError {
        let result = build_syntax_tree(regex);
        assert!(result.is_err(), "expected {} to be rejected", regex);

        let err = result.unwrap_err();
        err.downcast_ref::<ParseError>().unwrap().clone()
    }

    pub fn assert_language(regex: &str, accepted: &[&str], rejected: &[&str]) {
        let dfa = get_dfa(regex);
        for input in accepted {
            assert!(dfa.accepts(input), "{} should accept {:?}", regex, input);
        }
        for input in rejected {
            assert!(!dfa.accepts(input), "{} should reject {:?}", regex, input);
        }
    }
}

mod integration_tests {
    use crate::integration_tests_helper::{assert_language, get_dfa, get_error};

    use dfaviz::fa::FA;
    use dfaviz::{load_dfa, regex_to_dfa, save_dfa, ParseError};

    #[test]
    fn test_concatenation() {
        assert_language("ab", &["ab"], &["", "a", "b", "ba", "abb", "aab"]);
    }

    #[test]
    fn test_star() {
        assert_language(
            "a*b",
            &["b", "ab", "aab", "aaab"],
            &["a", "ba", "", "abb"],
        );
    }

    #[test]
    fn test_alternation() {
        assert_language("a|b", &["a", "b"], &["ab", "", "ba", "aa"]);
    }

    #[test]
    fn test_plus() {
        assert_language("a+", &["a", "aa", "aaa"], &["", "b", "ab"]);
    }

    #[test]
    fn test_grouped_star() {
        assert_language(
            "(a|b)*c",
            &["c", "ac", "bac", "ababc"],
            &["ab", "cc", "", "ca"],
        );
    }

    #[test]
    fn test_alternation_chain() {
        assert_language("a|b|c", &["a", "b", "c"], &["", "ab", "abc"]);
    }

    #[test]
    fn test_plus_on_group() {
        assert_language(
            "(ab)+c",
            &["abc", "ababc", "abababc"],
            &["c", "abac", "ab", "abcab"],
        );
    }

    #[test]
    fn test_nested_plus() {
        assert_language(
            "a*((b)+|a)+",
            &["a", "b", "bb", "aab", "abab", "bbba"],
            &["", "c", "ac"],
        );
    }

    #[test]
    fn test_mixed_operators() {
        assert_language(
            "ab|c+|(ab|cd)+",
            &["ab", "c", "ccc", "cd", "abcd", "cdab", "ababab"],
            &["", "a", "abc", "cdc", "d"],
        );
    }

    #[test]
    fn test_explicit_concatenation_operator() {
        assert_language("a.b", &["ab"], &["a.b", "a", "b"]);
    }

    #[test]
    fn test_classic_dfa_shape() {
        let dfa = get_dfa("(a|b)*abb");
        assert_eq!(dfa.get_num_states(), 4);
        assert_eq!(dfa.get_acceptor_states().count_ones(), 1);
        assert_language(
            "(a|b)*abb",
            &["abb", "aabb", "babb", "ababb"],
            &["", "ab", "abba", "bbb"],
        );
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        for regex in ["(a|b)*abb", "ab|c+|(ab|cd)+", "a*((bc)+|(c|d)*|aa)+"] {
            let first = get_dfa(regex);
            let second = get_dfa(regex);
            assert_eq!(first.get_num_states(), second.get_num_states());
            assert_eq!(first.get_acceptor_states(), second.get_acceptor_states());
            for state_id in 0..first.get_num_states() {
                assert_eq!(
                    first.get_state_transitions(state_id),
                    second.get_state_transitions(state_id)
                );
            }
        }
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            get_error("("),
            ParseError::UnbalancedParentheses(_)
        ));
        assert!(matches!(
            get_error("(a|b"),
            ParseError::UnbalancedParentheses(_)
        ));
        assert!(matches!(get_error("|a"), ParseError::MissingOperand(_)));
        assert!(matches!(get_error("a|"), ParseError::MissingOperand(_)));
        assert!(matches!(get_error("+"), ParseError::MissingOperand(_)));
        assert!(matches!(
            get_error("a**"),
            ParseError::NoGrammarRuleApplies(_)
        ));
    }

    #[test]
    fn test_regex_to_dfa_reports_errors() {
        let result = regex_to_dfa("a|");
        assert!(result.is_err());
        let err = result.unwrap_err();
        match err.downcast_ref::<ParseError>() {
            Some(ParseError::MissingOperand(_)) => {}
            other => panic!("Expected MissingOperand, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load_dfa() {
        let dfa = regex_to_dfa("(a|b)*c").unwrap();
        let path = std::env::temp_dir().join(format!("dfaviz_test_{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();

        assert!(save_dfa(&dfa, &path).is_ok());
        let loaded = load_dfa(&path);
        let _ = std::fs::remove_file(&path);

        let loaded = loaded.unwrap();
        assert_eq!(loaded.get_num_states(), dfa.get_num_states());
        assert_eq!(loaded.get_regex(), "(a|b)*c");
        for input in ["c", "abc", "bbac"] {
            assert!(loaded.accepts(input));
        }
        assert!(!loaded.accepts("ab"));
    }

    #[test]
    fn test_load_dfa_with_missing_start_state() {
        let dfa = regex_to_dfa("a").unwrap();
        let path = std::env::temp_dir().join(format!(
            "dfaviz_missing_start_{}.json",
            std::process::id()
        ));
        let path = path.to_string_lossy().to_string();
        save_dfa(&dfa, &path).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["start_state"] = serde_json::json!(3);
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = load_dfa(&path);
        let _ = std::fs::remove_file(&path);

        let err = loaded.unwrap_err();
        assert!(format!("{:?}", err).contains("Start state 3"));
    }

    #[test]
    fn test_load_dfa_with_dangling_transition() {
        let dfa = regex_to_dfa("ab").unwrap();
        let path = std::env::temp_dir().join(format!(
            "dfaviz_dangling_{}.json",
            std::process::id()
        ));
        let path = path.to_string_lossy().to_string();
        save_dfa(&dfa, &path).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["states"][0]["transitions"]["a"] = serde_json::json!(9);
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = load_dfa(&path);
        let _ = std::fs::remove_file(&path);

        let err = loaded.unwrap_err();
        assert!(format!("{:?}", err).contains("missing state 9"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_dfa("this/file/does/not/exist.json").is_err());
    }
}
