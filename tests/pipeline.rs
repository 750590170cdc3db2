//! End-to-end pipeline tests: the JSON example languages, the staged
//! compiler, and the self-hosting loop (the shipped grammar file
//! reproducing the bootstrap behavior).

use rlmeta::{
    bootstrap, compile_chain, load_grammar, CompileError, Language, RuleTable, Value,
    JSON_GRAMMAR, RLMETA_GRAMMAR, SUPPORT,
};

fn bootstrap_rules() -> RuleTable {
    let mut rules = RuleTable::new();
    bootstrap::register(&mut rules);
    rules
}

#[test]
fn json_roundtrip_is_idempotent() {
    let json = Language::json().expect("load json");
    for text in [
        " 134 ",
        " [ 1 , 2 , 3 ] ",
        " { \"hello\" : [1, false, true, null], \"there\": \"hello\" } ",
        "{\"a\": {\"b\": [[]]}, \"c\": {}}",
        " \"plain\" ",
    ] {
        let once = json.pretty(&json.parse(text).expect("parse")).expect("pretty");
        let twice = json.pretty(&json.parse(&once).expect("reparse")).expect("repretty");
        assert_eq!(once, twice, "not idempotent for {:?}", text);
    }
}

#[test]
fn json_pretty_matches_canonical_output() {
    let json = Language::json().expect("load json");
    let tree = json
        .parse(" { \"hello\" : [1, false, true, null], \"there\": \"hello\" } ")
        .expect("parse");
    let expected = "{\n    \"hello\": [\n        1,\n        false,\n        true,\n        null\n    ],\n    \"there\": \"hello\"\n}\n";
    assert_eq!(json.pretty(&tree).expect("pretty"), expected);
}

#[test]
fn json_tokenize_covers_the_document_without_gaps() {
    let json = Language::json().expect("load json");
    for text in ["[1, 2]", "{\"key\": [1, {\"x\": null}]}", " 134 "] {
        let tree = json.parse(text).expect("parse");
        let mut pos = tree.range().start;
        for token in tree.tokenize() {
            assert_eq!(token.start, pos, "gap in tokens for {:?}", text);
            pos = token.end;
        }
        assert_eq!(pos, tree.range().end);
        assert_eq!(tree.range().size(), text.chars().count());
    }
}

#[test]
fn grammar_language_roundtrips_through_canonical_form() {
    let grammar = Language::grammar();
    let source = "Grammar { foo = . }";
    let pretty = grammar.pretty(&grammar.parse(source).expect("parse")).expect("pretty");
    assert_eq!(pretty, "Grammar {\n  foo =\n    | .\n}\n");
    // Canonical output reparses to the same tree shape.
    let again = grammar.pretty(&grammar.parse(&pretty).expect("reparse")).expect("repretty");
    assert_eq!(again, pretty);
}

#[test]
fn malformed_input_reports_marked_position() {
    let rules = bootstrap_rules();
    let err = compile_chain(
        &rules,
        &["Parser.file", "CodeGenerator.astInner"],
        Value::str("Grammar { rule = % % "),
    )
    .expect_err("unterminated grammar");
    match &err {
        CompileError::Match { stream, .. } => {
            assert!(stream.contains("<ERROR POSITION>"));
        }
        other => panic!("expected a match diagnostic, got {:?}", other),
    }
    let rendered = err.to_string();
    assert!(rendered.contains("ERROR:"));
    assert!(rendered.contains("POSITION:"));
    assert!(rendered.contains("STREAM:"));
}

#[test]
fn generated_code_has_structs_counters_and_registrations() {
    let rules = bootstrap_rules();
    let out = compile_chain(
        &rules,
        &["Parser.file", "CodeGenerator.astInner"],
        Value::str("Json { file = <space>:r !. -> Node(\"Document\" r \"\" []) space = ' '* }"),
    )
    .expect("compile");
    let code = out.as_str().expect("text");

    assert!(code.contains("pub struct Matcher_Json_0;"));
    assert!(code.contains("impl Match for Matcher_Json_0 {"));
    assert!(code.contains("fn run(&self, stream: &mut Stream) -> MatchResult {"));
    assert!(code.contains("pub fn register_Json(rules: &mut RuleTable) {"));
    assert!(code.contains("rules.define(\"Json.file\", &Matcher_Json_"));
    assert!(code.contains("rules.define(\"Json.space\", &Matcher_Json_"));
    assert!(code.contains("stream.match_range("));
    assert!(code.contains("stream.match_item(&|item| item.is_char(' '), \"' '\")"));
    assert!(code.contains("stream.action_eval("));
    assert!(code.contains("Expr::call("));
    assert!(code.contains("Expr::lookup(\"r\")"));
    // The support prelude plus the generated module form one source file.
    assert!(SUPPORT.contains("use rlmeta::"));
}

#[test]
fn self_compilation_emits_both_bootstrap_namespaces() {
    let rules = bootstrap_rules();
    let out = compile_chain(
        &rules,
        &["Parser.file", "CodeGenerator.astInner"],
        Value::str(RLMETA_GRAMMAR),
    )
    .expect("self-compile");
    let code = out.as_str().expect("text");
    assert!(code.contains("pub fn register_Parser(rules: &mut RuleTable) {"));
    assert!(code.contains("pub fn register_CodeGenerator(rules: &mut RuleTable) {"));
    assert!(code.contains("rules.define(\"Parser.file\", &Matcher_Parser_"));
    assert!(code.contains("rules.define(\"CodeGenerator.matcher\", &Matcher_CodeGenerator_"));
    assert!(code.contains("stream.match_call_rule(\"CodeGenerator\")"));
}

#[test]
fn loaded_grammar_file_reproduces_bootstrap_parsing() {
    // Load the shipped grammar file; its Parser/CodeGenerator definitions
    // replace the hand-built ones in this table.
    let mut loaded = bootstrap_rules();
    load_grammar(RLMETA_GRAMMAR, &mut loaded).expect("load rlmeta.rlmeta");

    let pristine = bootstrap_rules();
    for source in [
        "Grammar { foo = . }",
        JSON_GRAMMAR,
        "G { r = 'a'-'z':x (!'!' .)*:ys -> { x ys } -> [] : acc -> acc }",
    ] {
        let a = compile_chain(&pristine, &["Parser.file"], Value::str(source))
            .expect("bootstrap parse")
            .as_node()
            .expect("node")
            .as_list();
        let b = compile_chain(&loaded, &["Parser.file"], Value::str(source))
            .expect("loaded parse")
            .as_node()
            .expect("node")
            .as_list();
        assert_eq!(a, b, "parse divergence for {:?}", source);
    }
}

#[test]
fn loaded_grammar_file_reproduces_bootstrap_codegen() {
    let mut loaded = bootstrap_rules();
    load_grammar(RLMETA_GRAMMAR, &mut loaded).expect("load rlmeta.rlmeta");
    let pristine = bootstrap_rules();

    let source = "Tiny { top = %:x !. -> x leaf = . -> \"leaf\" }";
    let stages = ["Parser.file", "CodeGenerator.astInner"];
    let a = compile_chain(&pristine, &stages, Value::str(source)).expect("bootstrap codegen");
    let b = compile_chain(&loaded, &stages, Value::str(source)).expect("loaded codegen");
    assert_eq!(a.as_str().expect("text"), b.as_str().expect("text"));
}

#[test]
fn loaded_json_grammar_survives_a_loaded_parser() {
    // Full self-hosting loop: the loaded Parser loads a further grammar.
    let mut rules = bootstrap_rules();
    load_grammar(RLMETA_GRAMMAR, &mut rules).expect("load rlmeta.rlmeta");
    load_grammar(JSON_GRAMMAR, &mut rules).expect("load json via loaded parser");
    let out = compile_chain(&rules, &["JsonParser.file"], Value::str("[1, 2]"))
        .expect("parse json");
    let node = out.as_node().expect("node");
    assert_eq!(node.name(), "Document");
    assert_eq!(node.children()[0].children().len(), 2);
}

#[test]
fn ordered_choice_is_deterministic_across_runs() {
    let json = Language::json().expect("load json");
    let first = json.parse(" true ").expect("parse").as_list();
    for _ in 0..5 {
        assert_eq!(json.parse(" true ").expect("parse").as_list(), first);
    }
}
