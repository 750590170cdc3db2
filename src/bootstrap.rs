//! Bootstrap grammars
//!
//! The toolkit's own grammar language is defined with the same matcher
//! vocabulary it compiles: `Parser` turns grammar source into a node
//! tree, `CodeGenerator` turns that tree (in bridge format) into Rust
//! matcher source. Both are assembled here as [`Matcher`] data; the
//! shipped `rlmeta.rlmeta` holds the same grammars in surface syntax, so
//! a rebuilt toolkit can regenerate this module's behavior from source.
//!
//! Rule bodies follow the grammar file rule for rule; the helper
//! functions at the bottom keep the action expressions readable.

use crate::action::Expr;
use crate::matcher::{
    action, any_item, bind, call, call_by_name, char_range, chars, choice, match_list,
    match_range, not_, scope, seq, star, Matcher,
};
use crate::rules::RuleTable;

/// Register both bootstrap grammars.
pub fn register(rules: &mut RuleTable) {
    register_parser(rules);
    register_code_generator(rules);
}

/// The grammar-language parser: `Parser.file` turns grammar source text
/// into a `File` node tree.
pub fn register_parser(rules: &mut RuleTable) {
    rules.define(
        "Parser.file",
        choice(vec![scope(seq(vec![
            bind(
                "r",
                match_range(seq(vec![
                    bind(
                        "xs",
                        star(choice(vec![scope(seq(vec![
                            call("Parser.space"),
                            call("Parser.namespace"),
                        ]))])),
                    ),
                    call("Parser.space"),
                ])),
            ),
            not_(any_item()),
            action(invoke(
                "Node",
                vec![txt("File"), var("r"), txt(""), var("xs")],
            )),
        ]))]),
    );
    rules.define(
        "Parser.namespace",
        choice(vec![scope(seq(vec![
            bind(
                "r",
                match_range(seq(vec![
                    bind("x", call("Parser.name")),
                    call("Parser.space"),
                    chars("{"),
                    bind("ys", star(call("Parser.rule"))),
                    call("Parser.space"),
                    chars("}"),
                ])),
            ),
            action(invoke(
                "Node",
                vec![txt("Namespace"), var("r"), var("x"), var("ys")],
            )),
        ]))]),
    );
    rules.define(
        "Parser.rule",
        choice(vec![scope(seq(vec![
            bind(
                "r",
                match_range(seq(vec![
                    bind("x", call("Parser.name")),
                    call("Parser.space"),
                    chars("="),
                    bind("y", call("Parser.choice")),
                ])),
            ),
            action(invoke(
                "Node",
                vec![
                    txt("Rule"),
                    var("r"),
                    items(vec![item0(var("x")), item0(var("y"))]),
                ],
            )),
        ]))]),
    );
    rules.define(
        "Parser.choice",
        choice(vec![scope(seq(vec![
            choice(vec![
                choice(vec![scope(seq(vec![call("Parser.space"), chars("|")]))]),
                seq(vec![]),
            ]),
            bind("x", call("Parser.sequence")),
            bind(
                "xs",
                star(choice(vec![scope(seq(vec![
                    call("Parser.space"),
                    chars("|"),
                    call("Parser.sequence"),
                ]))])),
            ),
            action(items(vec![
                item0(txt("Or")),
                item0(var("x")),
                item1(var("xs")),
            ])),
        ]))]),
    );
    rules.define(
        "Parser.sequence",
        choice(vec![scope(seq(vec![
            bind("xs", star(call("Parser.expr"))),
            bind("ys", call("Parser.maybeAction")),
            action(items(vec![
                item0(txt("Scope")),
                item0(items(vec![
                    item0(txt("And")),
                    item1(var("xs")),
                    item1(var("ys")),
                ])),
            ])),
        ]))]),
    );
    rules.define(
        "Parser.expr",
        choice(vec![
            scope(seq(vec![
                bind("x", call("Parser.expr1")),
                call("Parser.space"),
                chars(":"),
                bind("y", call("Parser.name")),
                action(items(vec![
                    item0(txt("Bind")),
                    item0(var("y")),
                    item0(var("x")),
                ])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("["),
                bind("xs", star(call("Parser.expr"))),
                call("Parser.space"),
                chars("]"),
                action(items(vec![
                    item0(txt("MatchList")),
                    item0(items(vec![item0(txt("And")), item1(var("xs"))])),
                ])),
            ])),
            scope(seq(vec![call("Parser.expr1")])),
        ]),
    );
    rules.define(
        "Parser.expr1",
        choice(vec![
            scope(seq(vec![
                bind("x", call("Parser.expr2")),
                call("Parser.space"),
                chars("*"),
                action(items(vec![item0(txt("Star")), item0(var("x"))])),
            ])),
            scope(seq(vec![
                bind("x", call("Parser.expr2")),
                call("Parser.space"),
                chars("?"),
                action(items(vec![
                    item0(txt("Or")),
                    item0(var("x")),
                    item0(items(vec![item0(txt("And"))])),
                ])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("!"),
                bind("x", call("Parser.expr2")),
                action(items(vec![item0(txt("Not")), item0(var("x"))])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("%"),
                action(items(vec![item0(txt("MatchCallRule"))])),
            ])),
            scope(seq(vec![call("Parser.expr2")])),
        ]),
    );
    rules.define(
        "Parser.expr2",
        choice(vec![
            scope(seq(vec![
                bind("x", call("Parser.name")),
                not_(choice(vec![scope(seq(vec![
                    call("Parser.space"),
                    chars("="),
                ]))])),
                action(items(vec![item0(txt("MatchRule")), item0(var("x"))])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                bind("x", call("Parser.char")),
                chars("-"),
                bind("y", call("Parser.char")),
                action(items(vec![
                    item0(txt("MatchObject")),
                    item0(items(vec![
                        item0(txt("Range")),
                        item0(var("x")),
                        item0(var("y")),
                    ])),
                ])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("'"),
                bind(
                    "xs",
                    star(choice(vec![scope(seq(vec![
                        not_(chars("'")),
                        call("Parser.matchChar"),
                    ]))])),
                ),
                chars("'"),
                action(items(vec![item0(txt("And")), item1(var("xs"))])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("."),
                action(items(vec![
                    item0(txt("MatchObject")),
                    item0(items(vec![item0(txt("Any"))])),
                ])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("("),
                bind("x", call("Parser.choice")),
                call("Parser.space"),
                chars(")"),
                action(var("x")),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("<"),
                bind("xs", star(call("Parser.expr"))),
                call("Parser.space"),
                chars(">"),
                action(items(vec![
                    item0(txt("MatchRange")),
                    item0(items(vec![item0(txt("And")), item1(var("xs"))])),
                ])),
            ])),
        ]),
    );
    rules.define(
        "Parser.matchChar",
        choice(vec![scope(seq(vec![
            bind("x", call("Parser.innerChar")),
            action(items(vec![
                item0(txt("MatchObject")),
                item0(items(vec![item0(txt("Eq")), item0(var("x"))])),
            ])),
        ]))]),
    );
    rules.define(
        "Parser.maybeAction",
        choice(vec![
            scope(seq(vec![
                bind("x", call("Parser.actionExpr")),
                action(items(vec![item0(items(vec![
                    item0(txt("Action")),
                    item0(var("x")),
                ]))])),
            ])),
            scope(seq(vec![action(items(vec![]))])),
        ]),
    );
    rules.define(
        "Parser.actionExpr",
        choice(vec![
            scope(seq(vec![
                call("Parser.space"),
                chars("->"),
                bind("x", call("Parser.hostExpr")),
                bind(
                    "y",
                    choice(vec![
                        scope(seq(vec![
                            call("Parser.space"),
                            chars(":"),
                            call("Parser.name"),
                        ])),
                        scope(seq(vec![action(txt(""))])),
                    ]),
                ),
                bind("z", call("Parser.actionExpr")),
                action(items(vec![
                    item0(txt("Set")),
                    item0(var("y")),
                    item0(var("x")),
                    item0(var("z")),
                ])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("->"),
                call("Parser.hostExpr"),
            ])),
        ]),
    );
    rules.define(
        "Parser.hostExpr",
        choice(vec![
            scope(seq(vec![
                call("Parser.space"),
                bind("x", call("Parser.string")),
                action(items(vec![item0(txt("String")), item0(var("x"))])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("["),
                bind("xs", star(call("Parser.hostListItem"))),
                call("Parser.space"),
                chars("]"),
                action(items(vec![item0(txt("List")), item1(var("xs"))])),
            ])),
            scope(seq(vec![
                call("Parser.space"),
                chars("{"),
                bind("xs", star(call("Parser.hostExpr"))),
                call("Parser.space"),
                chars("}"),
                action(items(vec![item0(txt("Format")), item1(var("xs"))])),
            ])),
            scope(seq(vec![
                bind("x", call("Parser.var")),
                call("Parser.space"),
                chars("("),
                bind("ys", star(call("Parser.hostExpr"))),
                call("Parser.space"),
                chars(")"),
                action(items(vec![
                    item0(txt("Call")),
                    item0(var("x")),
                    item1(var("ys")),
                ])),
            ])),
            scope(seq(vec![call("Parser.var")])),
        ]),
    );
    rules.define(
        "Parser.hostListItem",
        choice(vec![scope(seq(vec![
            call("Parser.space"),
            bind("ys", star(chars("~"))),
            bind("x", call("Parser.hostExpr")),
            action(items(vec![
                item0(txt("ListItem")),
                item0(invoke("len", vec![var("ys")])),
                item0(var("x")),
            ])),
        ]))]),
    );
    rules.define(
        "Parser.var",
        choice(vec![scope(seq(vec![
            bind("x", call("Parser.name")),
            not_(choice(vec![scope(seq(vec![
                call("Parser.space"),
                chars("="),
            ]))])),
            action(items(vec![item0(txt("Lookup")), item0(var("x"))])),
        ]))]),
    );
    rules.define(
        "Parser.string",
        choice(vec![scope(seq(vec![
            chars("\""),
            bind(
                "xs",
                star(choice(vec![scope(seq(vec![
                    not_(chars("\"")),
                    call("Parser.innerChar"),
                ]))])),
            ),
            chars("\""),
            action(invoke("join", vec![items(vec![item0(var("xs"))])])),
        ]))]),
    );
    rules.define(
        "Parser.char",
        choice(vec![scope(seq(vec![
            chars("'"),
            not_(chars("'")),
            bind("x", call("Parser.innerChar")),
            chars("'"),
            action(var("x")),
        ]))]),
    );
    rules.define(
        "Parser.innerChar",
        choice(vec![
            scope(seq(vec![chars("\\"), call("Parser.escape")])),
            scope(seq(vec![any_item()])),
        ]),
    );
    rules.define(
        "Parser.escape",
        choice(vec![
            scope(seq(vec![chars("\\"), action(txt("\\"))])),
            scope(seq(vec![chars("'"), action(txt("'"))])),
            scope(seq(vec![chars("\""), action(txt("\""))])),
            scope(seq(vec![chars("n"), action(txt("\n"))])),
        ]),
    );
    rules.define(
        "Parser.name",
        choice(vec![scope(seq(vec![
            call("Parser.space"),
            bind("x", call("Parser.nameStart")),
            bind("xs", star(call("Parser.nameChar"))),
            action(invoke(
                "join",
                vec![items(vec![item0(var("x")), item0(var("xs"))])],
            )),
        ]))]),
    );
    rules.define(
        "Parser.nameStart",
        choice(vec![
            scope(seq(vec![char_range('a', 'z')])),
            scope(seq(vec![char_range('A', 'Z')])),
        ]),
    );
    rules.define(
        "Parser.nameChar",
        choice(vec![
            scope(seq(vec![char_range('a', 'z')])),
            scope(seq(vec![char_range('A', 'Z')])),
            scope(seq(vec![char_range('0', '9')])),
        ]),
    );
    rules.define(
        "Parser.space",
        choice(vec![scope(seq(vec![star(choice(vec![
            scope(seq(vec![chars(" ")])),
            scope(seq(vec![chars("\n")])),
        ]))]))]),
    );
}

/// The code generator: `CodeGenerator.astInner` turns a grammar AST in
/// bridge format into Rust matcher source.
///
/// Each construct occurrence becomes one zero-sized struct implementing
/// `Match`, named `Matcher_<Namespace>_<n>` by an accumulator-backed
/// counter, followed by a per-namespace registration function. The
/// `matchers`/`ids` accumulators and the `body` runtime binding thread
/// through the templates exactly like the surface grammar spells out.
pub fn register_code_generator(rules: &mut RuleTable) {
    rules.define(
        "CodeGenerator.astInner",
        choice(vec![scope(seq(vec![
            bind("x", call_by_name("CodeGenerator")),
            not_(any_item()),
            action(var("x")),
        ]))]),
    );
    rules.define(
        "CodeGenerator.ast",
        choice(vec![scope(seq(vec![
            match_list(seq(vec![bind("x", call("CodeGenerator.astInner"))])),
            action(var("x")),
        ]))]),
    );
    rules.define(
        "CodeGenerator.File",
        choice(vec![scope(seq(vec![
            any_item(),
            bind("xs", star(call("CodeGenerator.ast"))),
            not_(any_item()),
            action(invoke("join", vec![items(vec![item0(var("xs"))])])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Namespace",
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            bind("ys", star(call("CodeGenerator.ast"))),
            action(let_(
                "namespace",
                var("x"),
                let_(
                    "ids",
                    items(vec![]),
                    let_(
                        "matchers",
                        items(vec![]),
                        fmt(vec![
                            var("matchers"),
                            txt("pub fn register_"),
                            var("namespace"),
                            txt("(rules: &mut RuleTable) {\n"),
                            invoke("indent", vec![fmt(vec![var("ys")])]),
                            txt("}\n"),
                        ]),
                    ),
                ),
            )),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Rule",
        choice(vec![scope(seq(vec![
            match_list(seq(vec![
                bind("x", any_item()),
                bind("y", call("CodeGenerator.ast")),
            ])),
            action(fmt(vec![
                txt("rules.define(\""),
                var("namespace"),
                txt("."),
                var("x"),
                txt("\", "),
                var("y"),
                txt(");\n"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Or",
        matcher_template(
            vec![bind("x", call("CodeGenerator.astList"))],
            fmt(vec![
                txt("stream.operator_or(&["),
                var("x"),
                txt("])"),
            ]),
        ),
    );
    rules.define(
        "CodeGenerator.Scope",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.with_scope("), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.And",
        matcher_template(
            vec![bind("x", call("CodeGenerator.astList"))],
            fmt(vec![
                txt("stream.operator_and(&["),
                var("x"),
                txt("])"),
            ]),
        ),
    );
    rules.define(
        "CodeGenerator.Bind",
        matcher_template(
            vec![
                bind("x", call("CodeGenerator.repr")),
                bind("y", call("CodeGenerator.ast")),
            ],
            fmt(vec![
                txt("{ let action = Match::run("),
                var("y"),
                txt(", stream)?; stream.bind("),
                var("x"),
                txt(", action) }"),
            ]),
        ),
    );
    rules.define(
        "CodeGenerator.Star",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.operator_star("), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.Not",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.operator_not("), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.MatchCallRule",
        matcher_template(
            vec![],
            fmt(vec![
                txt("stream.match_call_rule(\""),
                var("namespace"),
                txt("\")"),
            ]),
        ),
    );
    rules.define(
        "CodeGenerator.MatchRule",
        matcher_template(
            vec![bind("x", any_item())],
            fmt(vec![
                txt("stream.match_rule(\""),
                var("namespace"),
                txt("."),
                var("x"),
                txt("\")"),
            ]),
        ),
    );
    rules.define(
        "CodeGenerator.MatchObject",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.match_item(&"), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.MatchList",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.match_list("), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.MatchRange",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.match_range("), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.Action",
        matcher_template(
            vec![bind("x", call("CodeGenerator.ast"))],
            fmt(vec![txt("stream.action_eval("), var("x"), txt(")")]),
        ),
    );
    rules.define(
        "CodeGenerator.Any",
        choice(vec![scope(seq(vec![action(txt("|_| true, \"any\""))]))]),
    );
    rules.define(
        "CodeGenerator.Eq",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.charRepr")),
            action(fmt(vec![
                txt("|item| item.is_char("),
                var("x"),
                txt("), "),
                invoke("repr", vec![var("x")]),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Range",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.charRepr")),
            bind("y", call("CodeGenerator.charRepr")),
            action(fmt(vec![
                txt("|item| item.in_char_range("),
                var("x"),
                txt(", "),
                var("y"),
                txt("), "),
                invoke(
                    "repr",
                    vec![invoke(
                        "join",
                        vec![items(vec![
                            item0(var("x")),
                            item0(txt("-")),
                            item0(var("y")),
                        ])],
                    )],
                ),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Set",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.repr")),
            bind("y", call("CodeGenerator.ast")),
            bind("z", call("CodeGenerator.ast")),
            action(fmt(vec![
                txt("Expr::set("),
                var("x"),
                txt(", "),
                var("y"),
                txt(", "),
                var("z"),
                txt(")"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.String",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.repr")),
            action(fmt(vec![txt("Expr::text("), var("x"), txt(")")])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.List",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.astList")),
            action(fmt(vec![
                txt("Expr::list(vec!["),
                var("x"),
                txt("])"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.ListItem",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.repr")),
            bind("y", call("CodeGenerator.ast")),
            action(fmt(vec![
                txt("Expr::splice("),
                var("x"),
                txt(", "),
                var("y"),
                txt(")"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Format",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.astList")),
            action(fmt(vec![
                txt("Expr::format(vec!["),
                var("x"),
                txt("])"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Call",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.ast")),
            bind("y", call("CodeGenerator.astList")),
            action(fmt(vec![
                txt("Expr::call("),
                var("x"),
                txt(", vec!["),
                var("y"),
                txt("])"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.Lookup",
        choice(vec![scope(seq(vec![
            bind("x", call("CodeGenerator.repr")),
            action(fmt(vec![txt("Expr::lookup("), var("x"), txt(")")])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.astList",
        choice(vec![scope(seq(vec![
            bind("xs", star(call("CodeGenerator.ast"))),
            action(fmt(vec![
                txt("\n"),
                invoke(
                    "indent",
                    vec![invoke("join", vec![var("xs"), txt(",\n")])],
                ),
                txt("\n"),
            ])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.matcher",
        choice(vec![scope(seq(vec![action(let_(
            "id",
            fmt(vec![
                txt("Matcher_"),
                var("namespace"),
                txt("_"),
                invoke("len", vec![var("ids")]),
            ]),
            let_(
                "",
                invoke("append", vec![var("ids"), var("id")]),
                let_(
                    "",
                    invoke(
                        "append",
                        vec![
                            var("matchers"),
                            fmt(vec![
                                txt("pub struct "),
                                var("id"),
                                txt(";\nimpl Match for "),
                                var("id"),
                                txt(" {\n"),
                                invoke(
                                    "indent",
                                    vec![fmt(vec![
                                        txt(
                                            "fn run(&self, stream: &mut Stream) -> MatchResult {\n",
                                        ),
                                        invoke(
                                            "indent",
                                            vec![fmt(vec![var("body"), txt("\n")])],
                                        ),
                                        txt("}\n"),
                                    ])],
                                ),
                                txt("}\n"),
                            ]),
                        ],
                    ),
                    fmt(vec![txt("&"), var("id")]),
                ),
            ),
        ))]))]),
    );
    rules.define(
        "CodeGenerator.repr",
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            action(invoke("repr", vec![var("x")])),
        ]))]),
    );
    rules.define(
        "CodeGenerator.charRepr",
        choice(vec![scope(seq(vec![
            bind("x", any_item()),
            action(invoke("repr", vec![invoke("chr", vec![var("x")])])),
        ]))]),
    );
}

/// The shared shape of the per-construct generator rules: match the
/// `matcher` counter rule, capture the construct's pieces, then bind the
/// rendered `body` into the runtime and yield the matcher reference.
fn matcher_template(captures: Vec<Matcher>, body: Expr) -> Matcher {
    let mut parts = vec![bind("m", call("CodeGenerator.matcher"))];
    parts.extend(captures);
    parts.push(action(let_("body", body, var("m"))));
    choice(vec![scope(seq(parts))])
}

pub(crate) fn txt(s: &str) -> Expr {
    Expr::text(s)
}

pub(crate) fn var(name: &str) -> Expr {
    Expr::lookup(name)
}

pub(crate) fn invoke(helper: &str, args: Vec<Expr>) -> Expr {
    Expr::call(Expr::lookup(helper), args)
}

pub(crate) fn items(exprs: Vec<Expr>) -> Expr {
    Expr::list(exprs)
}

pub(crate) fn item0(expr: Expr) -> Expr {
    Expr::splice(0, expr)
}

pub(crate) fn item1(expr: Expr) -> Expr {
    Expr::splice(1, expr)
}

pub(crate) fn fmt(exprs: Vec<Expr>) -> Expr {
    Expr::format(exprs)
}

pub(crate) fn let_(name: &str, value: Expr, cont: Expr) -> Expr {
    Expr::set(name, value, cont)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Runtime;
    use crate::stream::{Stream, Subject};
    use crate::value::Value;

    fn parse_grammar(source: &str) -> Value {
        let mut rules = RuleTable::new();
        register(&mut rules);
        let mut stream = Stream::new(Subject::from_text(source), &rules);
        let action = stream.match_rule("Parser.file").expect("parse");
        action.eval(&Runtime::new()).expect("eval")
    }

    fn v(s: &str) -> Value {
        Value::str(s)
    }

    #[test]
    fn test_parse_minimal_grammar() {
        let ast = parse_grammar("Grammar { foo = . }");
        let node = ast.as_node().expect("node");
        assert_eq!(node.name(), "File");
        assert_eq!(node.range(), crate::range::Range::new(0, 19));
        let ns = &node.children()[0];
        assert_eq!(ns.name(), "Namespace");
        assert_eq!(ns.value(), &v("Grammar"));
        let rule = &ns.children()[0];
        assert_eq!(rule.name(), "Rule");
        assert_eq!(
            rule.value(),
            &Value::list(vec![
                v("foo"),
                Value::list(vec![
                    v("Or"),
                    Value::list(vec![
                        v("Scope"),
                        Value::list(vec![
                            v("And"),
                            Value::list(vec![
                                v("MatchObject"),
                                Value::list(vec![v("Any")]),
                            ]),
                        ]),
                    ]),
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_bindings_star_and_actions() {
        let ast = parse_grammar("G { r = x:a y* -> { x } }");
        let node = ast.as_node().expect("node");
        let rule = &node.children()[0].children()[0];
        let body = rule.value().as_list().expect("list").borrow()[1].clone();
        assert_eq!(
            body,
            Value::list(vec![
                v("Or"),
                Value::list(vec![
                    v("Scope"),
                    Value::list(vec![
                        v("And"),
                        Value::list(vec![
                            v("Bind"),
                            v("a"),
                            Value::list(vec![v("MatchRule"), v("x")]),
                        ]),
                        Value::list(vec![
                            v("Star"),
                            Value::list(vec![v("MatchRule"), v("y")]),
                        ]),
                        Value::list(vec![
                            v("Action"),
                            Value::list(vec![
                                v("Format"),
                                Value::list(vec![v("Lookup"), v("x")]),
                            ]),
                        ]),
                    ]),
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_string_escapes_and_char_ranges() {
        let ast = parse_grammar("G { r = 'a'-'z' -> \"x\\n\" }");
        let node = ast.as_node().expect("node");
        let rule = &node.children()[0].children()[0];
        let body = rule.value().as_list().expect("list").borrow()[1].clone();
        assert_eq!(
            body,
            Value::list(vec![
                v("Or"),
                Value::list(vec![
                    v("Scope"),
                    Value::list(vec![
                        v("And"),
                        Value::list(vec![
                            v("MatchObject"),
                            Value::list(vec![v("Range"), Value::Char('a'), Value::Char('z')]),
                        ]),
                        Value::list(vec![
                            v("Action"),
                            Value::list(vec![v("String"), v("x\n")]),
                        ]),
                    ]),
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_failure_positions_at_offending_character() {
        let mut rules = RuleTable::new();
        register(&mut rules);
        let mut stream = Stream::new(Subject::from_text("Grammar { foo = ) }"), &rules);
        let err = stream.match_rule("Parser.file").unwrap_err();
        assert_eq!(err.index, 16);
    }

    #[test]
    fn test_codegen_emits_matcher_structs_and_registration() {
        let mut rules = RuleTable::new();
        register(&mut rules);
        let ast = {
            let mut stream =
                Stream::new(Subject::from_text("Grammar { foo = . }"), &rules);
            let action = stream.match_rule("Parser.file").expect("parse");
            action.eval(&Runtime::new()).expect("eval")
        };
        let subject = Subject::from_value(&ast).expect("subject");
        let mut stream = Stream::new(subject, &rules);
        let action = stream.match_rule("CodeGenerator.astInner").expect("generate");
        let code = action.eval(&Runtime::new()).expect("eval");
        let code = code.as_str().expect("text").to_string();

        assert!(code.contains("pub struct Matcher_Grammar_0;"));
        assert!(code.contains("impl Match for Matcher_Grammar_0 {"));
        assert!(code.contains("fn run(&self, stream: &mut Stream) -> MatchResult {"));
        assert!(code.contains("stream.match_item(&|_| true, \"any\")"));
        assert!(code.contains("pub fn register_Grammar(rules: &mut RuleTable) {"));
        assert!(code.contains("rules.define(\"Grammar.foo\", &Matcher_Grammar_"));
        // One struct per construct occurrence: Any, And, Scope, Or.
        assert!(code.contains("Matcher_Grammar_3"));
    }

    #[test]
    fn test_codegen_unique_counters_across_rules() {
        let mut rules = RuleTable::new();
        register(&mut rules);
        let mut stream = Stream::new(Subject::from_text("G { a = . b = . }"), &rules);
        let ast = stream
            .match_rule("Parser.file")
            .expect("parse")
            .eval(&Runtime::new())
            .expect("eval");
        let subject = Subject::from_value(&ast).expect("subject");
        let mut stream = Stream::new(subject, &rules);
        let code = stream
            .match_rule("CodeGenerator.astInner")
            .expect("generate")
            .eval(&Runtime::new())
            .expect("eval");
        let code = code.as_str().expect("text").to_string();
        // Counters keep climbing across rules; no name is emitted twice.
        for id in 0..8 {
            let def = format!("pub struct Matcher_G_{};", id);
            assert_eq!(code.matches(&def).count(), 1, "{}", def);
        }
    }
}
