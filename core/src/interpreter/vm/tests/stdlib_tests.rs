//! Tests for builtins called from scripts

use super::helpers::{run_output, run_source};

#[test]
fn test_print_formats_values() {
    let source = r#"
        print(1, 2.5, -0.125, true, "text");
        print();
        print(print, typeof);
        f = print(1);
        print(f);
    "#;
    assert_eq!(
        run_output(source),
        "1 2.5 -0.125 true text\n\n[Function: print] [Function: typeof]\n1\nundefined\n"
    );
}

#[test]
fn test_typeof() {
    let source = r#"
        function f() { }
        print(typeof(1), typeof(true), typeof("s"), typeof(f), typeof(print));
        print(typeof(typeof(1)));
        print(typeof());
    "#;
    assert_eq!(
        run_output(source),
        "number boolean string function function\nstring\nundefined\n"
    );
}

#[test]
fn test_builtins_are_values() {
    let source = r#"
        say = print;
        say("via alias");
        print(say == print);
    "#;
    assert_eq!(run_output(source), "via alias\ntrue\n");
}

#[test]
fn test_assert_passes_through() {
    let (result, output) = run_source("assert(1 < 2); print(\"ok\");");
    assert!(result.is_ok());
    assert_eq!(output, "ok\n");
}
