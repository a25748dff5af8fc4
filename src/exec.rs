use crate::cpu::{Cpu, Flags, Trap};
use crate::decoder::{Decoded, Op};
use crate::instructions::FlagRule;
use crate::memory::Bus;

pub trait Executor {
    /// Applies `d` to the machine and returns the taken branch or jump target, if any.
    /// The program counter itself is left to the caller.
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<Option<u16>, Trap>;
}

pub struct IntExecutor;
impl Executor for IntExecutor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<Option<u16>, Trap> {
        let a = cpu.reg(d.aa);
        let b = cpu.reg(d.ba);
        let mut target = None;

        let written = match d.op {
            Op::Mova => Some(a),
            Op::Inc => Some(a.wrapping_add(1)),
            Op::Add => Some(a.wrapping_add(b)),
            Op::Sub => Some(a.wrapping_sub(b)),
            Op::Dec => Some(a.wrapping_sub(1)),
            Op::And => Some(a & b),
            Op::Or => Some(a | b),
            Op::Xor => Some(a ^ b),
            Op::Not => Some(!a),
            Op::Movb => Some(b),
            Op::Shr => Some(b >> 1),
            Op::Shl => Some(b << 1),
            Op::Ldi => Some(u16::from(d.ba)),
            Op::Adi => Some(a.wrapping_add(u16::from(d.ba))),
            Op::Ld => {
                let val = bus
                    .read_u16(a)
                    .map_err(|source| Trap::Bus { addr: a, source })?;
                Some(val)
            }
            Op::St => {
                bus.write_u16(a, b)
                    .map_err(|source| Trap::Bus { addr: a, source })?;
                None
            }
            Op::Brz => {
                if a == 0 {
                    target = Some(cpu.pc.wrapping_add_signed(i16::from(d.offset())));
                }
                None
            }
            Op::Brn => {
                if a & 0x8000 != 0 {
                    target = Some(cpu.pc.wrapping_add_signed(i16::from(d.offset())));
                }
                None
            }
            Op::Jmp => {
                target = Some(a);
                None
            }
        };

        if let Some(v) = written {
            cpu.set_reg(d.da, v);
        }
        cpu.flags = match (d.op.desc().flags, written) {
            (FlagRule::Result, Some(v)) => Flags::from_result(v),
            _ => Flags::empty(),
        };
        Ok(target)
    }
}
