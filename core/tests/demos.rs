//! End-to-end tests running the demo scripts through the public API

use std::path::PathBuf;

use jss_core::benchmark::{self, driver_program, sum_numbers_bridge_closed, LOOP_SCRIPT};
use jss_core::repl::ReplSession;
use jss_core::{Config, Interpreter, Value, VmConfig};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn run_file(name: &str) -> String {
    let mut interpreter = Interpreter::new(Vec::new(), &VmConfig::default());
    interpreter.run_file(&demo(name)).expect("demo should run");
    String::from_utf8(interpreter.output().clone()).unwrap()
}

#[test]
fn test_loop_driver_with_small_input() {
    let program = driver_program(LOOP_SCRIPT, 3000).unwrap();
    let mut interpreter = Interpreter::new(Vec::new(), &VmConfig::default());
    let result = interpreter.run_program(&program).unwrap();

    assert_eq!(result, Value::Undefined);
    let output = String::from_utf8(interpreter.output().clone()).unwrap();
    assert_eq!(output, format!("{}\n", sum_numbers_bridge_closed(3000).unwrap()));
    assert_eq!(output, "3000000\n");
    assert_eq!(interpreter.global("x"), Some(Value::Num(3000.0)));
}

#[test]
fn test_loop_script_matches_file_on_disk() {
    let on_disk = std::fs::read_to_string(demo("loop.js")).unwrap();
    assert_eq!(on_disk, LOOP_SCRIPT);
}

#[test]
fn test_loop_driver_value_for_full_input() {
    // the full run takes too long for a debug test build; check the
    // value it must print instead
    assert_eq!(
        sum_numbers_bridge_closed(benchmark::DEFAULT_N).unwrap().to_string(),
        "300000000000000"
    );
}

#[test]
fn test_fib_demo() {
    assert_eq!(run_file("fib.js"), "10946\n");
}

#[test]
fn test_repl_session_defines_and_reuses_functions() {
    let mut session = ReplSession::new(Vec::new(), &Config::default());
    for line in LOOP_SCRIPT.split("\nx = ").next().unwrap().lines() {
        session.feed(line).unwrap();
    }
    session.feed("print(sum_numbers(10), sum_numbers_bridge(10));").unwrap();

    let output = String::from_utf8(session.interpreter().output().clone()).unwrap();
    assert_eq!(output, "10 27\n");
}
