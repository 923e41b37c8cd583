use crate::linker::{Image, Placement};
use arch::{Cpu, Decoded};
use color_print::cprintln;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Prints the memory map of `image` with a disassembly of every region.
pub fn binprint(image: &Image, cpu: &dyn Cpu) {
    let mut names: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    for (name, addr) in &image.labels {
        names.entry(*addr).or_default().push(name);
    }
    let data: BTreeMap<u16, &Placement> = image.data.iter().map(|p| (p.address, p)).collect();

    for bank in &image.banks {
        let size = bank.maxsize.map_or("-".to_string(), |size| format!("0x{size:X}"));
        cprintln!("+-[Bank <c>{}</c>]-+ size {}", bank.number, size);
        for region in &bank.regions {
            let end = region.org + region.bytes.len();
            cprintln!("+--------+ <g>0x{:04X}-0x{:04X}</g>", region.org, end.saturating_sub(1));

            let used = region.bytes.len() - trailing_fill(&region.bytes);
            let mut offset = 0;
            while offset < used {
                let addr = (region.org + offset) as u16;
                for name in names.get(&addr).into_iter().flatten() {
                    cprintln!("| <m>{}</m>:", name);
                }
                if let Some(var) = data.get(&addr) {
                    let bytes = &region.bytes[offset..(offset + var.size).min(region.bytes.len())];
                    cprintln!(
                        "| 0x{:04X} : <b>{}</b> {}",
                        addr,
                        var.name,
                        bytes.iter().map(|b| format!("{b:02X}")).join(" ")
                    );
                    offset += var.size.max(1);
                    continue;
                }
                match Decoded::decode(cpu, &region.bytes[offset..used], addr) {
                    Some(inst) => {
                        cprintln!("| 0x{:04X} : {}", addr, inst.cformat());
                        offset += inst.len();
                    }
                    None => {
                        cprintln!("| 0x{:04X} : .byte ${:02X}", addr, region.bytes[offset]);
                        offset += 1;
                    }
                }
            }
            if used < region.bytes.len() {
                cprintln!("| ...    : {} byte(s) of fill", region.bytes.len() - used);
            }
        }
    }

    if !image.ram.is_empty() {
        println!("+-[RAM]--+------------------------------------------------------------------------");
        for var in image.ram.iter().sorted_by_key(|var| var.address) {
            cprintln!("| 0x{:04X} : <b>{}</b> ({} byte(s))", var.address, var.name, var.size);
        }
    }
    if !image.vectors.is_empty() {
        println!("+-[Vec]--+------------------------------------------------------------------------");
        for (kind, addr) in &image.vectors {
            cprintln!("| {:<6} : 0x{:04X}", kind, addr);
        }
    }
}

/// Length of the run of equal bytes ending the buffer, when longer than a
/// few bytes.
fn trailing_fill(bytes: &[u8]) -> usize {
    let Some(&last) = bytes.last() else {
        return 0;
    };
    let run = bytes.iter().rev().take_while(|&&b| b == last).count();
    if run >= 4 {
        run
    } else {
        0
    }
}
