use hlc::compile::{resolve, scan, structure};
use hlc::token::Token;
use hlc::{split, Error, ErrorKind, Session};

fn resolved(session: &mut Session, code: &str) -> Result<Vec<Token>, Error> {
    let inputs = split("test.hl", code, |_| Ok(Vec::new()))?;
    let tokens = scan(session, inputs)?;
    let tokens = structure(session, tokens)?;
    resolve(session, tokens)
}

/// Labels and instructions as text, one per line.
fn listing(code: &str) -> Vec<String> {
    let mut session = Session::default();
    let tokens = resolved(&mut session, code).unwrap();
    let lines = tokens
        .iter()
        .filter(|token| matches!(token, Token::Label(_) | Token::InstructionLine(_)))
        .map(|token| token.to_string().trim().to_string())
        .collect::<Vec<_>>();
    for line in &lines {
        println!("{line}");
    }
    lines
}

fn labels(code: &str) -> usize {
    let mut session = Session::default();
    resolved(&mut session, code).unwrap();
    session.label_count()
}

fn error(code: &str) -> Error {
    let mut session = Session::default();
    match resolved(&mut session, code) {
        Ok(tokens) => panic!("expected an error, got {} token(s)", tokens.len()),
        Err(err) => {
            println!("{err}");
            err
        }
    }
}

macro_rules! case {
    ($name:ident, $body:expr, $labels:expr) => {
        #[test]
        fn $name() {
            let code = format!("function main() {{\n{}\n}}\n", $body);
            assert_eq!(labels(&code), $labels);
        }
    };
}

case!(if_mints_one_label, "if (zero) inx", 1);
case!(if_else_mints_two_labels, "if (zero) inx else dex", 2);
case!(while_mints_two_labels, "while (not zero) dex", 2);
case!(do_while_mints_one_label, "do dex while (not zero)", 1);
case!(forever_mints_one_label, "forever nop", 1);
case!(
    switch_mints_one_label_per_case_and_one_end,
    "switch (a) {\ncase #1 inx\ncase #2 inx\ncase #3 inx\ndefault dex\n}",
    4
);
case!(far_tests_add_a_label, "if (far zero) inx", 2);
case!(nested_conditionals_add_up, "forever {\nif (carry) inx else dex\n}", 3);

#[test]
fn if_lowering() {
    assert_eq!(
        listing("function main() {\nif (zero) inx\n}"),
        vec!["main:", "bne _L0", "inx", "_L0:", "rts"]
    );
}

#[test]
fn far_if_lowering() {
    assert_eq!(
        listing("function main() {\nif (far zero) inx\n}"),
        vec!["main:", "beq _L1", "jmp _L0", "_L1:", "inx", "_L0:", "rts"]
    );
}

#[test]
fn if_else_lowering() {
    assert_eq!(
        listing("function main() {\nif (carry) inx else dex\n}"),
        vec!["main:", "bcc _L0", "inx", "jmp _L1", "_L0:", "dex", "_L1:", "rts"]
    );
}

#[test]
fn while_lowering() {
    assert_eq!(
        listing("function main() {\nwhile (not zero) dex\n}"),
        vec!["main:", "_L0:", "beq _L1", "dex", "jmp _L0", "_L1:", "rts"]
    );
}

#[test]
fn do_while_lowering() {
    assert_eq!(
        listing("function main() {\ndo dex while (not zero)\n}"),
        vec!["main:", "_L0:", "dex", "bne _L0", "rts"]
    );
    assert_eq!(
        listing("function main() {\ndo dex while (far minus)\n}"),
        vec!["main:", "_L0:", "dex", "bpl _L1", "jmp _L0", "_L1:", "rts"]
    );
}

#[test]
fn switch_lowering() {
    let code = "function noreturn main() {\n\
                switch (a) {\n\
                case #1 { ldx #4 }\n\
                case #2 { ldx #5 }\n\
                default { ldx #6 }\n\
                }\n\
                }\n";
    assert_eq!(
        listing(code),
        vec![
            "main:", "cmp #1", "bne _L0", "ldx #4", "jmp _L2", "_L0:", "cmp #2", "bne _L1",
            "ldx #5", "jmp _L2", "_L1:", "ldx #6", "_L2:",
        ]
    );
}

#[test]
fn switch_on_index_registers() {
    let lines = listing("function main() {\nswitch (y) {\ncase #0 nop\n}\n}");
    assert_eq!(lines, vec!["main:", "cpy #0", "bne _L0", "nop", "jmp _L1", "_L0:", "_L1:", "rts"]);
}

#[test]
fn subroutine_calls_become_jsr() {
    let lines = listing("function main() {\nsetup()\n}\nfunction setup() {\nnop\n}\n");
    assert_eq!(lines, vec!["main:", "jsr setup", "rts", "setup:", "nop", "rts"]);
}

#[test]
fn interrupts_return_with_rti() {
    let lines = listing("interrupt on_irq() {\nif (zero) return\npla\n}");
    assert_eq!(lines, vec!["on_irq:", "bne _L0", "rti", "_L0:", "pla", "rti"]);
}

#[test]
fn inline_functions_are_spliced() {
    let code = "inline poke(addr, value) {\nlda #value\nsta addr\n}\n\
                function main() {\npoke($2000, 1)\npoke($2001, 2)\n}\n";
    assert_eq!(
        listing(code),
        vec!["main:", "lda #1", "sta 0x2000", "lda #2", "sta 0x2001", "rts"]
    );
}

#[test]
fn nested_inline_functions() {
    let code = "inline one() {\ninx\n}\ninline two() {\none()\none()\n}\nfunction main() {\ntwo()\n}\n";
    assert_eq!(listing(code), vec!["main:", "inx", "inx", "rts"]);
}

#[test]
fn names_resolve_through_scopes() {
    let code = "enum color { red, green = 4 }\n\
                byte shadow : $300\n\
                function main() {\nlda #color.green\nsta shadow\nlda #sizeof(word)\n}\n";
    assert_eq!(
        listing(code),
        vec!["main:", "lda #4", "sta 0x300", "lda #2", "rts"]
    );
}

#[test]
fn zero_page_only_for_small_constants() {
    let mut session = Session::default();
    let code = "byte fast : $10\nbyte slow\nfunction main() {\nlda fast\nlda slow\n}\n";
    let tokens = resolved(&mut session, code).unwrap();
    let sizes = tokens
        .iter()
        .filter_map(|token| match token {
            Token::InstructionLine(line) => line.size(),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(sizes, vec![2, 3, 1]);
}

#[test]
fn resolving_twice_changes_nothing() {
    let code = "function main() {\nforever {\nif (carry) inx else dex\nsub()\n}\n}\nfunction sub() {\nnop\n}\n";
    let mut session = Session::default();
    let once = resolved(&mut session, code).unwrap();
    let labels = session.label_count();
    let twice = resolve(&mut session, once.clone()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(session.label_count(), labels);
}

#[test]
fn recursive_inline_is_a_convergence_error() {
    let err = error("inline spin() {\nnop\nspin()\n}\nfunction main() {\nspin()\n}\n");
    assert_eq!(err.kind(), ErrorKind::Convergence);
    assert!(matches!(err, Error::RecursiveMacro(_, name) if name == "spin"));
}

#[test]
fn mutually_recursive_inlines() {
    let err = error("inline a() {\nb()\n}\ninline b() {\na()\n}\nfunction main() {\na()\n}\n");
    assert_eq!(err.kind(), ErrorKind::Convergence);
}

#[test]
fn unknown_symbols_stop_progress() {
    let err = error("function main() {\njmp nowhere\n}\n");
    match err {
        Error::NoProgress { stage, stuck, .. } => {
            assert_eq!(stage, "resolve");
            assert_eq!(stuck.len(), 1);
            assert!(stuck[0].ends_with("jmp nowhere"), "{}", stuck[0]);
        }
        other => panic!("expected no progress, got {other}"),
    }
}

#[test]
fn reference_errors() {
    assert!(matches!(error("function main() {\nmissing()\n}"), Error::UnknownFunction(..)));
    assert!(matches!(
        error("byte x\nfunction main() {\nx()\n}"),
        Error::NotAFunction(..)
    ));
    assert!(matches!(
        error("inline f(a) {\nnop\n}\nfunction main() {\nf()\n}"),
        Error::ArgumentCount(_, _, 1, 0)
    ));
    assert!(matches!(
        error("function main() {\njmp #1\n}"),
        Error::InvalidOperand(..)
    ));
    assert_eq!(error("function main() {\nmissing()\n}").kind(), ErrorKind::Reference);
}

#[test]
fn braces_do_not_change_output() {
    assert_eq!(
        listing("function main() {\nif (zero) {\ninx\n}\n}"),
        listing("function main() {\nif (zero) inx\n}")
    );
}

#[test]
fn self_referencing_definitions() {
    let err = error("struct node {\nbyte value\nnode next\n}\nnode head\n");
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert!(matches!(err, Error::RecursiveDefinition(_, name) if name == "node"));

    assert!(matches!(
        error("typedef cell cell\ncell c\n"),
        Error::RecursiveDefinition(_, name) if name == "cell"
    ));
    assert!(matches!(
        error("byte x : x\nfunction main() {\nlda x\n}\n"),
        Error::RecursiveDefinition(_, name) if name == "x"
    ));
    assert!(matches!(
        error("byte a : b + 1\nbyte b : a\nfunction main() {\nlda a\n}\n"),
        Error::RecursiveDefinition(..)
    ));
}
