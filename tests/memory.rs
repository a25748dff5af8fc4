use sc16_rs::{assemble, Bus, DataMemory, Flags, Machine};

fn machine(src: &str, data: DataMemory) -> Machine {
    Machine::with_data(assemble(src).unwrap().program(), data)
}

#[test]
fn store_writes_big_endian_bytes() {
    let mut m = machine("%SLDI r0,0x1234\nst r1,r0\nldi r1,2\nst r1,r0", DataMemory::new());
    m.run(100).unwrap();
    assert_eq!(&m.data().bytes()[0..2], &[0x12, 0x34]);
    assert_eq!(&m.data().bytes()[4..6], &[0x12, 0x34]);
    assert_eq!(m.data().word(2), 0x1234);
}

#[test]
fn load_reads_preloaded_image_and_clears_flags() {
    let data = DataMemory::from_image("// image\n@3\nBEEF\n").unwrap();
    let mut m = machine("not r2,r2\nldi r0,3\nld r1,r0", data);
    m.run(100).unwrap();
    assert_eq!(m.regs()[1], 0xBEEF);
    assert_eq!(m.cpu.flags, Flags::empty());
}

#[test]
fn external_edits_between_steps_are_seen() {
    let mut m = machine("ldi r0,5\nld r1,r0\nld r2,r0", DataMemory::new());
    m.step().unwrap();
    m.data_mut().bytes_mut()[10] = 0xAB;
    m.step().unwrap();
    assert_eq!(m.regs()[1], 0xAB00);
    m.data_mut().bytes_mut()[11] = 0xCD;
    m.step().unwrap();
    assert_eq!(m.regs()[2], 0xABCD);
}

#[test]
fn bus_trait_addresses_words() {
    let mut mem = DataMemory::new();
    mem.write_u16(0x8000, 0xCAFE).unwrap();
    assert_eq!(mem.read_u16(0x8000).unwrap(), 0xCAFE);
    assert_eq!(&mem.bytes()[0x10000..0x10002], &[0xCA, 0xFE]);
}
