//! Grammar unparser
//!
//! `GrammarPrettyPrinter.pretty` renders a parsed grammar AST back to
//! canonical source: one rule per block, every alternative on its own
//! `|` line. It is the pretty half of the grammar language's
//! parse/pretty pair, the same shape the JSON grammars expose.
//!
//! Built by hand rather than loaded from surface syntax: the unnamed
//! `Set` form needs an exact-item guard on the empty string, which the
//! grammar language cannot spell.

use crate::bootstrap::{fmt, invoke, item0, item1, items, txt, var};
use crate::matcher::{
    action, any_item, bind, call, call_by_name, choice, eq_value, match_list, not_, scope, seq,
    star,
};
use crate::rules::RuleTable;
use crate::value::Value;

const NS: &str = "GrammarPrettyPrinter";

fn rule(name: &str) -> String {
    format!("{}.{}", NS, name)
}

/// Register the grammar unparser.
pub fn register(rules: &mut RuleTable) {
    rules.define(
        rule("pretty"),
        choice(vec![scope(seq(vec![
            bind("x", call_by_name(NS)),
            not_(any_item()),
            action(var("x")),
        ]))]),
    );
    rules.define(
        rule("ast"),
        choice(vec![scope(seq(vec![
            match_list(seq(vec![
                bind("x", call_by_name(NS)),
                not_(any_item()),
            ])),
            action(var("x")),
        ]))]),
    );
    rules.define(
        rule("File"),
        choice(vec![scope(seq(vec![
            any_item(),
            bind("xs", star(call(&rule("ast")))),
            not_(any_item()),
            action(invoke("join", vec![var("xs")])),
        ]))]),
    );
    rules.define(
        rule("Namespace"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            bind("ys", star(call(&rule("ast")))),
            action(fmt(vec![
                var("x"),
                txt(" {\n"),
                invoke("indent", vec![invoke("join", vec![var("ys")]), txt("  ")]),
                txt("}\n"),
            ])),
        ]))]),
    );
    rules.define(
        rule("Rule"),
        choice(vec![scope(seq(vec![
            match_list(seq(vec![
                bind("x", any_item()),
                bind("y", call(&rule("ast"))),
            ])),
            action(fmt(vec![
                var("x"),
                txt(" =\n"),
                invoke("indent", vec![var("y"), txt("  ")]),
            ])),
        ]))]),
    );
    rules.define(
        rule("Or"),
        choice(vec![scope(seq(vec![
            bind("xs", star(call(&rule("orAlt")))),
            action(invoke("join", vec![var("xs")])),
        ]))]),
    );
    rules.define(
        rule("orAlt"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(fmt(vec![txt("| "), var("x"), txt("\n")])),
        ]))]),
    );
    rules.define(
        rule("Scope"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(var("x")),
        ]))]),
    );
    rules.define(
        rule("And"),
        choice(vec![
            scope(seq(vec![
                bind("x", call(&rule("ast"))),
                bind("xs", star(call(&rule("ast")))),
                action(invoke(
                    "join",
                    vec![items(vec![item0(var("x")), item1(var("xs"))]), txt(" ")],
                )),
            ])),
            scope(seq(vec![action(txt(""))])),
        ]),
    );
    rules.define(
        rule("Bind"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            bind("y", call(&rule("ast"))),
            action(fmt(vec![var("y"), txt(":"), var("x")])),
        ]))]),
    );
    rules.define(
        rule("Star"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(fmt(vec![var("x"), txt("*")])),
        ]))]),
    );
    rules.define(
        rule("Not"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(fmt(vec![txt("!"), var("x")])),
        ]))]),
    );
    rules.define(
        rule("MatchCallRule"),
        choice(vec![scope(seq(vec![action(txt("%"))]))]),
    );
    rules.define(
        rule("MatchRule"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            action(var("x")),
        ]))]),
    );
    rules.define(
        rule("MatchObject"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(var("x")),
        ]))]),
    );
    rules.define(rule("Any"), choice(vec![scope(seq(vec![action(txt("."))]))]));
    rules.define(
        rule("Eq"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            action(invoke("repr", vec![invoke("chr", vec![var("x")])])),
        ]))]),
    );
    rules.define(
        rule("Range"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            bind("y", any_item()),
            action(fmt(vec![
                invoke("repr", vec![invoke("chr", vec![var("x")])]),
                txt("-"),
                invoke("repr", vec![invoke("chr", vec![var("y")])]),
            ])),
        ]))]),
    );
    rules.define(
        rule("MatchList"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(fmt(vec![txt("["), var("x"), txt("]")])),
        ]))]),
    );
    rules.define(
        rule("MatchRange"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(fmt(vec![txt("<"), var("x"), txt(">")])),
        ]))]),
    );
    rules.define(
        rule("Action"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            action(fmt(vec![txt("-> "), var("x")])),
        ]))]),
    );
    rules.define(
        rule("Set"),
        choice(vec![
            scope(seq(vec![
                eq_value(Value::str("")),
                bind("y", call(&rule("ast"))),
                bind("z", call(&rule("ast"))),
                action(fmt(vec![var("y"), txt(" -> "), var("z")])),
            ])),
            scope(seq(vec![
                bind("x", any_item()),
                bind("y", call(&rule("ast"))),
                bind("z", call(&rule("ast"))),
                action(fmt(vec![
                    var("y"),
                    txt(" : "),
                    var("x"),
                    txt(" -> "),
                    var("z"),
                ])),
            ])),
        ]),
    );
    rules.define(
        rule("String"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            action(invoke("repr", vec![var("x")])),
        ]))]),
    );
    rules.define(
        rule("List"),
        choice(vec![
            scope(seq(vec![
                bind("x", call(&rule("ast"))),
                bind("xs", star(call(&rule("ast")))),
                action(fmt(vec![
                    txt("["),
                    invoke(
                        "join",
                        vec![items(vec![item0(var("x")), item1(var("xs"))]), txt(" ")],
                    ),
                    txt("]"),
                ])),
            ])),
            scope(seq(vec![action(txt("[]"))])),
        ]),
    );
    rules.define(
        rule("ListItem"),
        choice(vec![
            scope(seq(vec![
                eq_value(Value::Int(0)),
                bind("y", call(&rule("ast"))),
                action(var("y")),
            ])),
            scope(seq(vec![
                eq_value(Value::Int(1)),
                bind("y", call(&rule("ast"))),
                action(fmt(vec![txt("~"), var("y")])),
            ])),
            scope(seq(vec![
                eq_value(Value::Int(2)),
                bind("y", call(&rule("ast"))),
                action(fmt(vec![txt("~~"), var("y")])),
            ])),
            scope(seq(vec![
                eq_value(Value::Int(3)),
                bind("y", call(&rule("ast"))),
                action(fmt(vec![txt("~~~"), var("y")])),
            ])),
        ]),
    );
    rules.define(
        rule("Format"),
        choice(vec![
            scope(seq(vec![
                bind("x", call(&rule("ast"))),
                bind("xs", star(call(&rule("ast")))),
                action(fmt(vec![
                    txt("{ "),
                    invoke(
                        "join",
                        vec![items(vec![item0(var("x")), item1(var("xs"))]), txt(" ")],
                    ),
                    txt(" }"),
                ])),
            ])),
            scope(seq(vec![action(txt("{}"))])),
        ]),
    );
    rules.define(
        rule("Call"),
        choice(vec![scope(seq(vec![
            bind("x", call(&rule("ast"))),
            bind("ys", star(call(&rule("ast")))),
            action(fmt(vec![
                var("x"),
                txt("("),
                invoke("join", vec![items(vec![item1(var("ys"))]), txt(" ")]),
                txt(")"),
            ])),
        ]))]),
    );
    rules.define(
        rule("Lookup"),
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            action(var("x")),
        ]))]),
    );
}
