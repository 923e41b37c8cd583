use arch::Mos6502;
use hlc::linker::Placement;
use hlc::{compile, split, Error, ErrorKind, Image, Session};

fn build(code: &str) -> Result<Image, Error> {
    let mut session = Session::default();
    let inputs = split("test.hl", code, |name| match name {
        "four.bin" => Ok(vec![1, 2, 3, 4]),
        _ => Err(Error::UnknownDirective(Default::default(), name.to_string())),
    })?;
    compile(&mut session, inputs)
}

fn bytes(code: &str) -> Vec<u8> {
    let image = build(code).unwrap();
    let bytes = image.bytes();
    println!("{}", bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" "));
    bytes
}

fn layout_error(code: &str) -> Error {
    match build(code) {
        Ok(image) => panic!("expected an error, got {} byte(s)", image.bytes().len()),
        Err(err) => {
            println!("{err}");
            err
        }
    }
}

fn placement(name: &str, address: u16, size: usize) -> Placement {
    Placement {
        name: name.to_string(),
        address,
        size,
    }
}

macro_rules! case {
    ($name:ident, $code:expr, $expects:expr) => {
        #[test]
        fn $name() {
            assert_eq!(bytes($code), $expects);
        }
    };
}

case!(
    backward_jump,
    "#rom.org 0x8000, 0x10\nfunction noreturn main() {\nlda #1\nforever nop\n}\n#rom.end\n",
    vec![0xA9, 0x01, 0xEA, 0x4C, 0x02, 0x80, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
);

case!(
    forward_branch,
    "#rom.org 0x8000\nfunction main() {\nif (zero) inx\n}\n#rom.end\n",
    vec![0xD0, 0x01, 0xE8, 0x60]
);

case!(
    subroutine_call,
    "#rom.org 0xC000\nfunction noreturn main() {\nwait()\n}\nfunction wait() {\n}\n#rom.end\n",
    vec![0x20, 0x03, 0xC0, 0x60]
);

case!(
    setpad_value,
    "#setpad $EA\n#rom.org 0x8000, 4\nrts\n#rom.end\n",
    vec![0x60, 0xEA, 0xEA, 0xEA]
);

case!(
    setpad_text_tiles_from_region_start,
    "#setpad \"ab\"\n#rom.org 0x8000, 5\nrts\n#rom.end\n",
    vec![0x60, b'b', b'a', b'b', b'a']
);

case!(
    align_and_incbin,
    "#rom.org 0x8000\nnop\n#align 4\n#incbin \"four.bin\"\n#rom.end\n",
    vec![0xEA, 0xFF, 0xFF, 0xFF, 1, 2, 3, 4]
);

case!(
    gaps_between_regions_are_padded,
    "#rom.org 0x8000\nnop\n#rom.end\n#rom.org 0x8003\nrts\n#rom.end\n",
    vec![0xEA, 0xFF, 0xFF, 0x60]
);

case!(
    banks_in_number_order,
    "#rom.banksize 2\n#rom.bank 1\n#rom.org 0x8000\nnop\n#rom.end\n#rom.bank 0\n#rom.org 0x8000\nrts\n#rom.end\n",
    vec![0x60, 0xFF, 0xEA, 0xFF]
);

case!(
    open_regions_close_at_the_end,
    "#rom.org 0x8000, 2\nnop\n",
    vec![0xEA, 0xFF]
);

#[test]
fn data_and_ram() {
    let code = "#ram.org 0x0200, 0x10\n\
                byte counter\n\
                word ptr\n\
                #ram.end\n\
                #rom.org 0x8000\n\
                byte table[] = { 1, 2, 3 }\n\
                word entry = main\n\
                function noreturn main() {\n\
                lda table,x\n\
                sta counter\n\
                }\n\
                #rom.end\n";
    let image = build(code).unwrap();
    assert_eq!(
        image.bytes(),
        vec![1, 2, 3, 0x05, 0x80, 0xBD, 0x00, 0x80, 0x8D, 0x00, 0x02]
    );
    assert_eq!(image.ram, vec![placement("counter", 0x200, 1), placement("ptr", 0x201, 2)]);
    assert_eq!(image.data, vec![placement("table", 0x8000, 3), placement("entry", 0x8003, 2)]);
    assert_eq!(image.labels.get("main"), Some(&0x8005));
    hlc::binprint(&image, &Mos6502);
}

#[test]
fn locals_are_qualified_by_function() {
    let code = "#ram.org 0x0300\n\
                #rom.org 0x8000\n\
                function noreturn main() {\n\
                byte tmp\n\
                inc tmp\n\
                }\n";
    let image = build(code).unwrap();
    assert_eq!(image.ram, vec![placement("main.tmp", 0x300, 1)]);
    assert_eq!(image.bytes(), vec![0xEE, 0x00, 0x03]);
}

#[test]
fn text_initializers_are_zero_filled() {
    let image = build("#rom.org 0x8000\nchar name[4] = \"hi\"\n").unwrap();
    assert_eq!(image.bytes(), vec![b'h', b'i', 0, 0]);
}

#[test]
fn interrupt_vectors() {
    let code = "#rom.org 0xC000\n\
                interrupt.nmi on_nmi() {\n\
                inx\n\
                }\n\
                #interrupt.nmi on_nmi\n\
                #rom.end\n";
    let image = build(code).unwrap();
    assert_eq!(image.bytes(), vec![0xE8, 0x40]);
    assert_eq!(image.vectors.get("nmi"), Some(&0xC000));
}

#[test]
fn image_serializes_to_json() {
    let image = build("#rom.org 0x8000\nfunction main() {\n}\n").unwrap();
    let json = image.to_json().unwrap();
    assert!(json.contains("\"main\": 32768"), "{json}");
}

#[test]
fn overlap_is_found_in_both_orders() {
    let first = "#rom.org 0x8000, 0x100\n#rom.end\n#rom.org 0x8080, 0x10\n#rom.end\n";
    let second = "#rom.org 0x8080, 0x10\n#rom.end\n#rom.org 0x8000, 0x100\n#rom.end\n";
    for code in [first, second] {
        let err = layout_error(code);
        assert_eq!(err.kind(), ErrorKind::Layout);
        assert!(matches!(err, Error::RegionOverlap(..)));
    }
}

#[test]
fn growing_region_runs_into_a_neighbour() {
    let err = layout_error("#rom.org 0x8002, 4\n#rom.end\n#rom.org 0x8000\nnop\nnop\nnop\n#rom.end\n");
    assert!(matches!(err, Error::RegionOverlap(..)));
}

#[test]
fn regions_in_other_banks_do_not_overlap() {
    let code = "#rom.bank 0\n#rom.org 0x8000\nnop\n#rom.end\n#rom.bank 1\n#rom.org 0x8000\nnop\n#rom.end\n";
    assert_eq!(bytes(code), vec![0xEA, 0xEA]);
}

#[test]
fn layout_errors() {
    assert!(matches!(
        layout_error("#rom.org 0x8000, 2\nnop\nnop\nnop\n"),
        Error::RegionOverflow(..)
    ));
    assert!(matches!(
        layout_error("#rom.bank 0, 2\n#rom.org 0x8000\nnop\nnop\nnop\n#rom.end\n"),
        Error::BankOverflow(_, 0, 2)
    ));
    assert!(matches!(
        layout_error("#rom.org 0x8000\n#rom.org 0x9000\n"),
        Error::RegionAlreadyOpen(..)
    ));
    assert!(matches!(layout_error("#rom.end\n"), Error::NoOpenRegion(..)));
    assert!(matches!(layout_error("nop\n"), Error::NoOpenRegion(..)));
    assert!(matches!(layout_error("byte x\n"), Error::NoRamRegion(..)));
    assert!(matches!(
        layout_error("#ram.org 0x0200, 2\nword a\nbyte b\n"),
        Error::RamOverflow(_, name, 1) if name == "b"
    ));
    assert!(matches!(layout_error("#rom.org 0xFFFF, 4\n"), Error::AddressOutOfRange(..)));
    assert!(matches!(layout_error("#rom.org -1\n"), Error::OutOfRange(_, -1)));
    assert!(matches!(layout_error("#rom.org $8000, -1\n"), Error::OutOfRange(_, -1)));
    assert!(matches!(layout_error("#ram.org $10, -1\n"), Error::OutOfRange(_, -1)));
    assert!(matches!(layout_error("#rom.org $10000\n"), Error::AddressOutOfRange(..)));
    assert!(matches!(
        layout_error("#ram.org $FFF0, $20\nbyte x\n"),
        Error::AddressOutOfRange(..)
    ));
    assert!(matches!(
        layout_error("#rom.org 0x8000\nfoo:\n#rom.end\n#rom.org 0x9000\nfoo:\n"),
        Error::DuplicateLabel(..)
    ));
}

#[test]
fn far_tests_reach_distant_labels() {
    let near = "#rom.org 0x8000\nfunction main() {\nif (zero) {\nfill: \n}\n}\n";
    assert!(build(near).is_ok());

    let mut body = String::new();
    for _ in 0..200 {
        body.push_str("nop\n");
    }
    let near = format!("#rom.org 0x8000\nfunction main() {{\nif (zero) {{\n{body}}}\n}}\n");
    assert!(matches!(layout_error(&near), Error::Encode(..)));
    let far = format!("#rom.org 0x8000\nfunction main() {{\nif (far zero) {{\n{body}}}\n}}\n");
    assert!(build(&far).is_ok());
}

#[test]
fn unbound_vectors_stop_progress() {
    let err = layout_error("#rom.org 0x8000\nnop\n#interrupt.irq nothing\n");
    assert_eq!(err.kind(), ErrorKind::Convergence);
    assert!(matches!(err, Error::NoProgress { stage: "layout", .. }));
}

#[test]
fn label_past_the_end_of_memory() {
    let err = layout_error("#rom.org $FFFD\nfunction noreturn main() {\njmp done\ndone:\n}\n");
    assert!(matches!(err, Error::AddressOutOfRange(_, 0x10000)));
}
