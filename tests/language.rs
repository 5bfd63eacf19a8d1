use cobra_interpreter::{Config, ErrorKind, Mode, Outcome, Session, Transcript, run_script};

fn assert_prints(src: &str, expected: &[&str]) {
    match run_script(src) {
        Ok(transcript) => assert_eq!(transcript.lines, expected, "script: {src}"),
        Err(e) => panic!("Script failed: {e}"),
    }
}

fn assert_failure(src: &str, kind: ErrorKind) {
    match run_script(src) {
        Ok(_) => panic!("Script succeeded but was expected to fail: {src}"),
        Err(e) => assert_eq!(ErrorKind::of(&e), Some(kind), "script: {src}"),
    }
}

#[test]
fn operator_precedence() {
    assert_prints("print(2 + 3 * 4)", &["14"]);
    assert_prints("print((2 + 3) * 4)", &["20"]);
    assert_prints("print(((1)))", &["1"]);
}

#[test]
fn integer_division_is_exact_or_float() {
    for (a, b) in [(12_i64, 4_i64), (13, 4), (-12, 4), (1, 3), (100, 7)] {
        let src = format!("print({a} / {b})");
        let transcript = run_script(&src).unwrap();
        let expected = if a % b == 0 {
            (a / b).to_string()
        } else {
            (a as f64 / b as f64).to_string()
        };
        assert_eq!(transcript.lines, [expected], "{src}");
    }
}

#[test]
fn division_by_zero_literals() {
    assert_failure("print(1 / 0)", ErrorKind::DivideByZero);
    assert_failure("print(1 / 0.0)", ErrorKind::DivideByZero);
    assert_failure("print(1.5 / 0)", ErrorKind::DivideByZero);
}

#[test]
fn variables() {
    assert_prints("set x = 5 print(x + 3)", &["8"]);
    assert_prints("set s = \"a\" print(s + 1)", &["a1"]);
    assert_failure("set s = \"a\" print(1 + s)", ErrorKind::InvalidOperand);
    assert_failure("print(never_set)", ErrorKind::UndeclaredVariable);
}

#[test]
fn reassignment_overwrites() {
    assert_prints("set x = 1 set x = \"two\" print(x)", &["two"]);
}

#[test]
fn malformed_number_stops_before_any_output() {
    let mut session = Session::new(Transcript::default(), Config::default());
    let error = session
        .run_source(None, "print(1.2.3)", Mode::Script)
        .unwrap_err();
    assert_eq!(ErrorKind::of(&error), Some(ErrorKind::MalformedNumber));
    assert!(session.output().lines.is_empty());
}

#[test]
fn quit_first_skips_everything_after() {
    let mut session = Session::new(Transcript::default(), Config::default());
    let outcome = session
        .run_source(None, "quit\nprint(1)\nprint(oops)\n1 / 0", Mode::Script)
        .unwrap();
    assert_eq!(outcome, Outcome::Quit);
    assert!(session.output().lines.is_empty());
}

#[test]
fn statements_without_terminators() {
    assert_prints("print(1) print(2)\nprint(3)", &["1", "2", "3"]);
}

#[test]
fn unrecognized_input() {
    assert_failure("print(1) ?", ErrorKind::UnrecognizedCharacter);
    assert_failure("if", ErrorKind::UnrecognizedCommand);
    assert_failure("\"loose string\"", ErrorKind::UnrecognizedCommand);
    assert_failure("print(1 2)", ErrorKind::TokenMismatch);
}

#[test]
fn unterminated_string_runs_to_end() {
    assert_prints("print(1) set s = \"open", &["1"]);
}

#[test]
fn negative_literal_quirk() {
    // `-3` lexes as a literal, so it starts a new statement instead of subtracting
    assert_failure("print(5 -3)", ErrorKind::TokenMismatch);
    assert_prints("print(5 - 3)", &["2"]);
}
