use arch::{Cpu, Mos6502, Mos65C02, Op, Operand};
use hlc::grammer::{lexer::Lexer, parsercore::Parser};
use hlc::token::{DeclKind, Dim, Expr, InitValue, Token, TypeDecl};
use hlc::{Error, ErrorKind};

fn parse_with(cpu: &dyn Cpu, code: &str) -> (Vec<Token>, Vec<Error>) {
    for (idx, line) in code.lines().enumerate() {
        println!("{:>2}: {}", idx, line);
    }
    let tokens = Lexer::new("test.hl", code).parse();
    let (ast, errors) = Parser::new(tokens.into_iter()).parse(cpu);
    for (idx, token) in ast.iter().enumerate() {
        println!("{:>2}: {}", idx, token);
    }
    for err in &errors {
        println!("error: {err}");
    }
    (ast, errors)
}

fn parse(code: &str) -> Vec<Token> {
    let (ast, errors) = parse_with(&Mos6502, code);
    assert!(errors.is_empty(), "{errors:?}");
    ast
}

fn operand(code: &str) -> Operand<Expr> {
    match parse(code).as_slice() {
        [Token::InstructionLine(line)] => line.operand.clone(),
        other => panic!("expected one instruction, got {other:?}"),
    }
}

macro_rules! case {
    ($name:ident, $code:expr, $expects:expr) => {
        #[test]
        fn $name() {
            assert_eq!(operand($code), $expects);
        }
    };
}

case!(implied, "rts", Operand::None);
case!(accumulator, "asl a", Operand::Accumulator);
case!(immediate_folds, "lda #(1 + 2) * 3", Operand::Immediate(Expr::Number(9)));
case!(low_byte, "lda #<$1234", Operand::Immediate(Expr::Number(0x34)));
case!(high_byte, "lda #hi($1234)", Operand::Immediate(Expr::Number(0x12)));
case!(char_value, "cmp #'A'", Operand::Immediate(Expr::Number(65)));
case!(absolute, "sta $2000", Operand::Address(Expr::Number(0x2000)));
case!(indexed_x, "lda table,x", Operand::IndexedX(Expr::Name("table".into())));
case!(indexed_y, "ldx table, Y", Operand::IndexedY(Expr::Name("table".into())));
case!(indirect, "jmp (vector)", Operand::Indirect(Expr::Name("vector".into())));
case!(indexed_indirect, "lda ($20,x)", Operand::IndexedIndirect(Expr::Number(0x20)));
case!(indirect_indexed, "lda ($20),y", Operand::IndirectIndexed(Expr::Number(0x20)));
case!(dotted_name, "lda pos.x", Operand::Address(Expr::Name("pos.x".into())));

#[test]
fn labels_and_calls() {
    let ast = parse("loop:\n  wait_vblank()\n  fill(0, 8); jmp loop\n");
    assert_eq!(ast.len(), 4);
    assert!(matches!(&ast[0], Token::Label(label) if label.name == "loop"));
    match &ast[2] {
        Token::FunctionCall(call) => {
            assert_eq!(call.name, "fill");
            assert_eq!(call.args, vec![Expr::Number(0), Expr::Number(8)]);
        }
        other => panic!("expected a call, got {other}"),
    }
    assert!(matches!(&ast[3], Token::InstructionLine(line) if line.op == Op::JMP));
}

#[test]
fn conditionals() {
    let ast = parse("if (far not carry) {\n} else\nswitch (reg.x)\ncase #2\ndefault\ndo\nwhile (minus)");
    let kinds = ast
        .iter()
        .filter_map(|token| match token {
            Token::ConditionalDecl(decl) => Some(decl.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec!["if (far not carry)", "else", "switch (reg.x)", "case #2", "default", "do", "while (minus)"]
    );
    assert!(matches!(&ast[1], Token::ScopeBegin(_)));
    assert!(matches!(&ast[2], Token::ScopeEnd(_)));
}

#[test]
fn bad_conditions_are_errors() {
    let (_, errors) = parse_with(&Mos6502, "if (sometimes) inx\nwhile ()");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|err| err.kind() == ErrorKind::Syntax));
}

#[test]
fn functions() {
    let ast = parse("function main() {\ninline add(a, b) {\ninterrupt.irq noreturn on_irq() {");
    let decls = ast
        .iter()
        .filter_map(|token| match token {
            Token::FunctionDecl(decl) => Some(decl.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(decls, vec!["function main()", "inline add(a, b)", "interrupt.irq noreturn on_irq()"]);
}

#[test]
fn only_inline_functions_take_params() {
    let (_, errors) = parse_with(&Mos6502, "function f(a) {");
    assert!(matches!(errors.as_slice(), [Error::UnexpectedParams(_, name)] if name == "f"));
}

#[test]
fn variables_carry_their_initializer_separately() {
    let ast = parse("byte table[] = { 1, 2,\n 3 }\nshared word ptr : $10\nchar msg[4] = \"hey\"");
    assert_eq!(ast.len(), 5);
    match (&ast[0], &ast[1]) {
        (Token::Variable(var), Token::Initializer(init)) => {
            assert_eq!(var.ty, "byte");
            assert_eq!(var.dim, Dim::Array(None));
            assert_eq!(
                init.value,
                InitValue::Values(vec![Expr::Number(1), Expr::Number(2), Expr::Number(3)])
            );
        }
        other => panic!("expected a variable and its initializer, got {other:?}"),
    }
    match &ast[2] {
        Token::Variable(var) => {
            assert!(var.shared);
            assert_eq!(var.address, Some(Expr::Number(0x10)));
        }
        other => panic!("expected a variable, got {other}"),
    }
    assert!(matches!(&ast[4], Token::Initializer(init) if init.value == InitValue::Text("hey".into())));
}

#[test]
fn type_declarations() {
    let ast = parse("struct point {\n byte x\n byte y\n}\nenum dir { up, down = 4, left }\ntypedef byte name[8]");
    assert_eq!(ast.len(), 3);
    match &ast[1] {
        Token::TypeDecl(TypeDecl::Enum(def, _)) => {
            let members = def.members.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>();
            assert_eq!(members, vec![("up", 0), ("down", 4), ("left", 5)]);
        }
        other => panic!("expected an enum, got {other}"),
    }
    match &ast[0] {
        Token::TypeDecl(TypeDecl::Struct(def, _)) => assert_eq!(def.fields.len(), 2),
        other => panic!("expected a struct, got {other}"),
    }
}

#[test]
fn cpu_restricts_mnemonics() {
    let (_, errors) = parse_with(&Mos6502, "stz $00");
    assert!(matches!(errors.as_slice(), [Error::UnsupportedOp(_, op, "6502")] if op == "stz"));

    let (ast, errors) = parse_with(&Mos65C02, "stz $00");
    assert!(errors.is_empty());
    assert!(matches!(&ast[0], Token::InstructionLine(line) if line.op == Op::STZ));
}

#[test]
fn errors_recover_at_the_next_line() {
    let (ast, errors) = parse_with(&Mos6502, "nop\nlda #)\ninx\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(ast.len(), 2);
}

#[test]
fn case_values_accept_expressions() {
    let ast = parse("case dir.up + 1");
    assert!(matches!(
        &ast[0],
        Token::ConditionalDecl(decl) if matches!(&decl.kind, DeclKind::Case(Expr::Binary(..)))
    ));
}
