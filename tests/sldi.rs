use sc16_rs::asm::sldi;
use sc16_rs::{assemble, Machine};

fn load(src: &str) -> Machine {
    let out = assemble(src).unwrap();
    let mut m = Machine::new(out.program());
    m.run(100).unwrap();
    m
}

#[test]
fn every_value_loads_exactly() {
    for v in 0..=u16::MAX {
        let seq = sldi(3, v);
        assert!(seq.len() <= 19, "{v:#06x} took {} instructions", seq.len());
        let m = load(&seq.join("\n"));
        assert_eq!(m.regs()[3], v, "SLDI {v:#06x}");
    }
}

#[test]
fn macro_form_loads_value() {
    let m = load("%SLDI r2,0xBEEF\n%sldi r5, 65535\n%SLDI r6,0");
    assert_eq!(m.regs()[2], 0xBEEF);
    assert_eq!(m.regs()[5], 0xFFFF);
    assert_eq!(m.regs()[6], 0);
}

#[test]
fn short_forms() {
    assert_eq!(sldi(0, 0), vec!["xor r0,r0,r0"]);
    assert_eq!(sldi(0, 7), vec!["ldi r0,7"]);
    assert_eq!(sldi(1, 9), vec!["ldi r1,4", "shl r1,r1", "inc r1,r1"]);
}
