use std::fmt;

use crate::bits::{combine, half_carry, parity};
use crate::error::ExecutionError;
use crate::memory::Memory;

/// CPU flags for the Intel 8080.
///
/// Flags are recomputed from scratch after every flag-affecting instruction;
/// they always describe the most recent such operation's result.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flags {
    pub z: bool,  // zero
    pub s: bool,  // sign
    pub p: bool,  // parity
    pub cy: bool, // carry
    pub ac: bool, // auxiliary carry
}

impl Flags {
    /// Pack into the PSW byte layout (bit 1 is always set on the 8080).
    pub fn to_u8(self) -> u8 {
        let mut f = 0x02u8;
        if self.s {
            f |= 0x80;
        }
        if self.z {
            f |= 0x40;
        }
        if self.ac {
            f |= 0x10;
        }
        if self.p {
            f |= 0x04;
        }
        if self.cy {
            f |= 0x01;
        }
        f
    }

    pub fn from_u8(&mut self, v: u8) {
        self.s = (v & 0x80) != 0;
        self.z = (v & 0x40) != 0;
        self.ac = (v & 0x10) != 0;
        self.p = (v & 0x04) != 0;
        self.cy = (v & 0x01) != 0;
    }
}

/// Execution state of the core: `HLT` moves Running to Halted, and only an
/// external reset leaves Halted again.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecState {
    #[default]
    Running,
    Halted,
}

/// The seven 8-bit registers addressable by instruction operand bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
}

/// The 16-bit register pairs. `BC`, `DE` and `HL` concatenate two 8-bit
/// registers, high register first; `SP` is the stack pointer itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegPair {
    BC,
    DE,
    HL,
    SP,
}

impl RegPair {
    /// Decode the `rp` field (bits 4-5 of an opcode).
    fn from_bits(bits: u8) -> RegPair {
        match bits & 0x03 {
            0 => RegPair::BC,
            1 => RegPair::DE,
            2 => RegPair::HL,
            _ => RegPair::SP,
        }
    }
}

/// An 8-bit instruction operand: either a register or the byte addressed by
/// the `HL` pair. Keeping the two cases in one closed enum means every
/// register/memory instruction group is decoded by the same path, with no
/// aliasing between "a register" and "the memory operand".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand {
    Reg(Reg),
    Mem,
}

impl Operand {
    /// Decode a 3-bit source/destination field.
    fn from_bits(bits: u8) -> Operand {
        match bits & 0x07 {
            0 => Operand::Reg(Reg::B),
            1 => Operand::Reg(Reg::C),
            2 => Operand::Reg(Reg::D),
            3 => Operand::Reg(Reg::E),
            4 => Operand::Reg(Reg::H),
            5 => Operand::Reg(Reg::L),
            6 => Operand::Mem,
            _ => Operand::Reg(Reg::A),
        }
    }
}

/// Condition codes for conditional jump/call/return (bits 3-5 of the opcode).
#[derive(Clone, Copy, Debug)]
enum Cond {
    NZ,
    Z,
    NC,
    C,
    PO,
    PE,
    P,
    M,
}

impl Cond {
    fn from_bits(bits: u8) -> Cond {
        match bits & 0x07 {
            0 => Cond::NZ,
            1 => Cond::Z,
            2 => Cond::NC,
            3 => Cond::C,
            4 => Cond::PO,
            5 => Cond::PE,
            6 => Cond::P,
            _ => Cond::M,
        }
    }
}

/// Intel 8080 register file and fetch-decode-execute core.
///
/// Memory lives outside the CPU and is passed to [`step`](Cpu8080::step),
/// so the same core can run against any buffer the harness provides.
#[derive(Default)]
pub struct Cpu8080 {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    pub flags: Flags,
    /// Present for completeness of the register file; no implemented opcode
    /// reads or writes it (the interrupt subsystem is out of scope).
    pub interrupts_enabled: bool,
    state: ExecState,
}

/// Read-only snapshot of the register file for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    pub flags: Flags,
    pub state: ExecState,
}

impl fmt::Display for CpuSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, ch: char| if set { ch } else { '.' };
        write!(
            f,
            "a={:02x} bc={:04x} de={:04x} hl={:04x} sp={:04x} pc={:04x} [{}{}{}{}{}]{}",
            self.a,
            combine(self.b, self.c),
            combine(self.d, self.e),
            combine(self.h, self.l),
            self.sp,
            self.pc,
            flag(self.flags.z, 'z'),
            flag(self.flags.s, 's'),
            flag(self.flags.p, 'p'),
            flag(self.flags.cy, 'c'),
            flag(self.flags.ac, 'a'),
            if self.state == ExecState::Halted {
                " halted"
            } else {
                ""
            },
        )
    }
}

impl Cpu8080 {
    /// Create a new CPU in reset state (everything zero, Running).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to their power-on values and resume Running.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == ExecState::Halted
    }

    /// Take a read-only snapshot of the register file.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            a: self.a,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            sp: self.sp,
            pc: self.pc,
            flags: self.flags,
            state: self.state,
        }
    }

    pub fn reg(&self, r: Reg) -> u8 {
        match r {
            Reg::A => self.a,
            Reg::B => self.b,
            Reg::C => self.c,
            Reg::D => self.d,
            Reg::E => self.e,
            Reg::H => self.h,
            Reg::L => self.l,
        }
    }

    pub fn set_reg(&mut self, r: Reg, value: u8) {
        match r {
            Reg::A => self.a = value,
            Reg::B => self.b = value,
            Reg::C => self.c = value,
            Reg::D => self.d = value,
            Reg::E => self.e = value,
            Reg::H => self.h = value,
            Reg::L => self.l = value,
        }
    }

    pub fn pair(&self, rp: RegPair) -> u16 {
        match rp {
            RegPair::BC => combine(self.b, self.c),
            RegPair::DE => combine(self.d, self.e),
            RegPair::HL => combine(self.h, self.l),
            RegPair::SP => self.sp,
        }
    }

    pub fn set_pair(&mut self, rp: RegPair, value: u16) {
        let hi = (value >> 8) as u8;
        let lo = value as u8;
        match rp {
            RegPair::BC => {
                self.b = hi;
                self.c = lo;
            }
            RegPair::DE => {
                self.d = hi;
                self.e = lo;
            }
            RegPair::HL => {
                self.h = hi;
                self.l = lo;
            }
            RegPair::SP => self.sp = value,
        }
    }

    fn read_operand(&self, mem: &Memory, op: Operand) -> Result<u8, ExecutionError> {
        match op {
            Operand::Reg(r) => Ok(self.reg(r)),
            Operand::Mem => mem.read(self.pair(RegPair::HL)),
        }
    }

    fn write_operand(
        &mut self,
        mem: &mut Memory,
        op: Operand,
        value: u8,
    ) -> Result<(), ExecutionError> {
        match op {
            Operand::Reg(r) => {
                self.set_reg(r, value);
                Ok(())
            }
            Operand::Mem => mem.write(self.pair(RegPair::HL), value),
        }
    }

    fn fetch_byte(&mut self, mem: &Memory) -> Result<u8, ExecutionError> {
        let b = mem.read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(b)
    }

    fn fetch_word(&mut self, mem: &Memory) -> Result<u16, ExecutionError> {
        let lo = self.fetch_byte(mem)?;
        let hi = self.fetch_byte(mem)?;
        Ok(combine(hi, lo))
    }

    fn set_szp(&mut self, value: u8) {
        self.flags.z = value == 0;
        self.flags.s = (value & 0x80) != 0;
        self.flags.p = parity(value);
    }

    fn add(&mut self, value: u8) {
        let a = self.a;
        let res = a.wrapping_add(value);
        self.flags.ac = half_carry(4, a, value);
        self.flags.cy = u16::from(a) + u16::from(value) > 0xff;
        self.set_szp(res);
        self.a = res;
    }

    fn adc(&mut self, value: u8) {
        let carry = u8::from(self.flags.cy);
        let a = self.a;
        let res = a.wrapping_add(value).wrapping_add(carry);
        self.flags.ac = (a & 0x0f) + (value & 0x0f) + carry > 0x0f;
        self.flags.cy = u16::from(a) + u16::from(value) + u16::from(carry) > 0xff;
        self.set_szp(res);
        self.a = res;
    }

    fn sub(&mut self, value: u8) {
        let a = self.a;
        let res = a.wrapping_sub(value);
        self.flags.ac = (a & 0x0f) < (value & 0x0f);
        self.flags.cy = a < value;
        self.set_szp(res);
        self.a = res;
    }

    fn sbb(&mut self, value: u8) {
        let carry = u8::from(self.flags.cy);
        let a = self.a;
        let res = a.wrapping_sub(value).wrapping_sub(carry);
        self.flags.ac = (a & 0x0f) < (value & 0x0f) + carry;
        self.flags.cy = u16::from(a) < u16::from(value) + u16::from(carry);
        self.set_szp(res);
        self.a = res;
    }

    fn ana(&mut self, value: u8) {
        let res = self.a & value;
        self.flags.cy = false;
        // Documented 8080 quirk: AC is the OR of bit 3 of both operands.
        self.flags.ac = ((self.a | value) & 0x08) != 0;
        self.set_szp(res);
        self.a = res;
    }

    fn xra(&mut self, value: u8) {
        let res = self.a ^ value;
        self.flags.cy = false;
        self.flags.ac = false;
        self.set_szp(res);
        self.a = res;
    }

    fn ora(&mut self, value: u8) {
        let res = self.a | value;
        self.flags.cy = false;
        self.flags.ac = false;
        self.set_szp(res);
        self.a = res;
    }

    /// CMP: subtraction for flag effect only, the accumulator is untouched.
    fn cmp(&mut self, value: u8) {
        let a = self.a;
        let res = a.wrapping_sub(value);
        self.flags.ac = (a & 0x0f) < (value & 0x0f);
        self.flags.cy = a < value;
        self.set_szp(res);
    }

    /// Dispatch one of the eight accumulator ALU operations by its selector
    /// bits (bits 3-5 of the register forms, same order for the immediates).
    fn alu(&mut self, select: u8, value: u8) {
        match select & 0x07 {
            0 => self.add(value),
            1 => self.adc(value),
            2 => self.sub(value),
            3 => self.sbb(value),
            4 => self.ana(value),
            5 => self.xra(value),
            6 => self.ora(value),
            _ => self.cmp(value),
        }
    }

    /// INR: 8-bit wrapping increment. Carry is not affected; AC comes from
    /// the actual pre-increment value.
    fn inr(&mut self, value: u8) -> u8 {
        let r = value.wrapping_add(1);
        self.flags.ac = half_carry(4, value, 1);
        self.set_szp(r);
        r
    }

    /// DCR: 8-bit wrapping decrement. Carry is not affected.
    fn dcr(&mut self, value: u8) -> u8 {
        let r = value.wrapping_sub(1);
        self.flags.ac = (r & 0x0f) != 0x0f;
        self.set_szp(r);
        r
    }

    /// DAD: 16-bit add into HL. Only Carry is affected, from bit-16 overflow.
    fn dad(&mut self, value: u16) {
        let hl = self.pair(RegPair::HL);
        let res = u32::from(hl) + u32::from(value);
        self.flags.cy = res > 0xffff;
        self.set_pair(RegPair::HL, res as u16);
    }

    /// DAA: two-step BCD correction of a preceding binary addition.
    ///
    /// First the low nibble is adjusted by 6 when it exceeds 9 or AC is set,
    /// recomputing AC (and possibly Carry) from that addition. Then, with the
    /// updated value, the high nibble is adjusted by 0x60 when it exceeds 9
    /// or Carry is set. An already-set Carry is never cleared.
    fn daa(&mut self) {
        let mut value = self.a;
        if value & 0x0f > 9 || self.flags.ac {
            let wide = u16::from(value) + 0x06;
            self.flags.ac = half_carry(4, value, 0x06);
            if wide > 0xff {
                self.flags.cy = true;
            }
            value = wide as u8;
        } else {
            self.flags.ac = false;
        }
        if value >> 4 > 9 || self.flags.cy {
            let wide = u16::from(value) + 0x60;
            if wide > 0xff {
                self.flags.cy = true;
            }
            value = wide as u8;
        }
        self.set_szp(value);
        self.a = value;
    }

    /// Push a word: SP moves down by 2, low byte at SP, high byte at SP+1.
    fn push(&mut self, mem: &mut Memory, value: u16) -> Result<(), ExecutionError> {
        self.sp = self.sp.wrapping_sub(2);
        mem.write(self.sp, value as u8)?;
        mem.write(self.sp.wrapping_add(1), (value >> 8) as u8)?;
        Ok(())
    }

    /// Pop a word: low byte at SP, high byte at SP+1, SP moves up by 2.
    fn pop(&mut self, mem: &Memory) -> Result<u16, ExecutionError> {
        let lo = mem.read(self.sp)?;
        let hi = mem.read(self.sp.wrapping_add(1))?;
        self.sp = self.sp.wrapping_add(2);
        Ok(combine(hi, lo))
    }

    fn cond(&self, cond: Cond) -> bool {
        match cond {
            Cond::NZ => !self.flags.z,
            Cond::Z => self.flags.z,
            Cond::NC => !self.flags.cy,
            Cond::C => self.flags.cy,
            Cond::PO => !self.flags.p,
            Cond::PE => self.flags.p,
            Cond::P => !self.flags.s,
            Cond::M => self.flags.s,
        }
    }

    /// Execute a single instruction.
    ///
    /// While Halted this is a no-op; otherwise one opcode (plus its 0-2
    /// immediate bytes) is fetched and executed, leaving `pc` at the next
    /// opcode. Errors leave the error site diagnosable via the returned
    /// variant; the caller decides whether to keep stepping.
    pub fn step(&mut self, mem: &mut Memory) -> Result<(), ExecutionError> {
        if self.state == ExecState::Halted {
            return Ok(());
        }

        let pc = self.pc;
        let opcode = self.fetch_byte(mem)?;

        match opcode {
            // NOP
            0x00 => {}

            // LXI rp,word
            0x01 | 0x11 | 0x21 | 0x31 => {
                let v = self.fetch_word(mem)?;
                self.set_pair(RegPair::from_bits(opcode >> 4), v);
            }

            // STAX B / STAX D
            0x02 | 0x12 => {
                let rp = RegPair::from_bits(opcode >> 4);
                mem.write(self.pair(rp), self.a)?;
            }

            // LDAX B / LDAX D
            0x0a | 0x1a => {
                let rp = RegPair::from_bits(opcode >> 4);
                self.a = mem.read(self.pair(rp))?;
            }

            // INX rp: 16-bit wraparound, no flags.
            0x03 | 0x13 | 0x23 | 0x33 => {
                let rp = RegPair::from_bits(opcode >> 4);
                self.set_pair(rp, self.pair(rp).wrapping_add(1));
            }

            // DCX rp: 16-bit wraparound, no flags.
            0x0b | 0x1b | 0x2b | 0x3b => {
                let rp = RegPair::from_bits(opcode >> 4);
                self.set_pair(rp, self.pair(rp).wrapping_sub(1));
            }

            // INR r / INR M
            0x04 | 0x0c | 0x14 | 0x1c | 0x24 | 0x2c | 0x34 | 0x3c => {
                let dst = Operand::from_bits(opcode >> 3);
                let v = self.read_operand(mem, dst)?;
                let r = self.inr(v);
                self.write_operand(mem, dst, r)?;
            }

            // DCR r / DCR M
            0x05 | 0x0d | 0x15 | 0x1d | 0x25 | 0x2d | 0x35 | 0x3d => {
                let dst = Operand::from_bits(opcode >> 3);
                let v = self.read_operand(mem, dst)?;
                let r = self.dcr(v);
                self.write_operand(mem, dst, r)?;
            }

            // MVI r,byte / MVI M,byte
            0x06 | 0x0e | 0x16 | 0x1e | 0x26 | 0x2e | 0x36 | 0x3e => {
                let dst = Operand::from_bits(opcode >> 3);
                let v = self.fetch_byte(mem)?;
                self.write_operand(mem, dst, v)?;
            }

            // RLC: rotate left, bit 7 into both Carry and bit 0.
            0x07 => {
                let bit7 = self.a & 0x80 != 0;
                self.a = (self.a << 1) | u8::from(bit7);
                self.flags.cy = bit7;
            }

            // RRC: rotate right, bit 0 into both Carry and bit 7.
            0x0f => {
                let bit0 = self.a & 0x01 != 0;
                self.a = (self.a >> 1) | if bit0 { 0x80 } else { 0 };
                self.flags.cy = bit0;
            }

            // RAL: rotate left through Carry.
            0x17 => {
                let bit7 = self.a & 0x80 != 0;
                self.a = (self.a << 1) | u8::from(self.flags.cy);
                self.flags.cy = bit7;
            }

            // RAR: rotate right through Carry.
            0x1f => {
                let bit0 = self.a & 0x01 != 0;
                self.a = (self.a >> 1) | if self.flags.cy { 0x80 } else { 0 };
                self.flags.cy = bit0;
            }

            // DAD rp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let rp = RegPair::from_bits(opcode >> 4);
                self.dad(self.pair(rp));
            }

            // SHLD addr: L at addr, H at addr+1.
            0x22 => {
                let addr = self.fetch_word(mem)?;
                mem.write(addr, self.l)?;
                mem.write(addr.wrapping_add(1), self.h)?;
            }

            // LHLD addr: the exact mirror of SHLD.
            0x2a => {
                let addr = self.fetch_word(mem)?;
                self.l = mem.read(addr)?;
                self.h = mem.read(addr.wrapping_add(1))?;
            }

            // STA addr / LDA addr
            0x32 => {
                let addr = self.fetch_word(mem)?;
                mem.write(addr, self.a)?;
            }
            0x3a => {
                let addr = self.fetch_word(mem)?;
                self.a = mem.read(addr)?;
            }

            // DAA
            0x27 => self.daa(),

            // CMA: complement accumulator, no flags.
            0x2f => self.a = !self.a,

            // STC / CMC
            0x37 => self.flags.cy = true,
            0x3f => self.flags.cy = !self.flags.cy,

            // HLT sits in the middle of the MOV range and must be decoded
            // before it.
            0x76 => {
                self.state = ExecState::Halted;
                log::debug!("HLT at {:#06x}", pc);
            }

            // MOV dst,src (0x40-0x7f)
            0x40..=0x7f => {
                let src = Operand::from_bits(opcode);
                let dst = Operand::from_bits(opcode >> 3);
                let v = self.read_operand(mem, src)?;
                self.write_operand(mem, dst, v)?;
            }

            // ADD/ADC/SUB/SBB/ANA/XRA/ORA/CMP r (0x80-0xbf)
            0x80..=0xbf => {
                let v = self.read_operand(mem, Operand::from_bits(opcode))?;
                self.alu(opcode >> 3, v);
            }

            // ADI/ACI/SUI/SBI/ANI/XRI/ORI/CPI byte
            0xc6 | 0xce | 0xd6 | 0xde | 0xe6 | 0xee | 0xf6 | 0xfe => {
                let v = self.fetch_byte(mem)?;
                self.alu(opcode >> 3, v);
            }

            // JMP addr
            0xc3 => {
                self.pc = self.fetch_word(mem)?;
            }

            // Jcond addr
            0xc2 | 0xca | 0xd2 | 0xda | 0xe2 | 0xea | 0xf2 | 0xfa => {
                let addr = self.fetch_word(mem)?;
                if self.cond(Cond::from_bits(opcode >> 3)) {
                    self.pc = addr;
                }
            }

            // CALL addr
            0xcd => {
                let addr = self.fetch_word(mem)?;
                self.push(mem, self.pc)?;
                self.pc = addr;
            }

            // Ccond addr
            0xc4 | 0xcc | 0xd4 | 0xdc | 0xe4 | 0xec | 0xf4 | 0xfc => {
                let addr = self.fetch_word(mem)?;
                if self.cond(Cond::from_bits(opcode >> 3)) {
                    self.push(mem, self.pc)?;
                    self.pc = addr;
                }
            }

            // RET
            0xc9 => {
                self.pc = self.pop(mem)?;
            }

            // Rcond
            0xc0 | 0xc8 | 0xd0 | 0xd8 | 0xe0 | 0xe8 | 0xf0 | 0xf8 => {
                if self.cond(Cond::from_bits(opcode >> 3)) {
                    self.pc = self.pop(mem)?;
                }
            }

            // PUSH B/D/H
            0xc5 | 0xd5 | 0xe5 => {
                let rp = RegPair::from_bits(opcode >> 4);
                self.push(mem, self.pair(rp))?;
            }

            // PUSH PSW
            0xf5 => {
                let psw = combine(self.a, self.flags.to_u8());
                self.push(mem, psw)?;
            }

            // POP B/D/H
            0xc1 | 0xd1 | 0xe1 => {
                let rp = RegPair::from_bits(opcode >> 4);
                let v = self.pop(mem)?;
                self.set_pair(rp, v);
            }

            // POP PSW
            0xf1 => {
                let v = self.pop(mem)?;
                self.a = (v >> 8) as u8;
                self.flags.from_u8(v as u8);
            }

            // XCHG: swap DE and HL.
            0xeb => {
                std::mem::swap(&mut self.d, &mut self.h);
                std::mem::swap(&mut self.e, &mut self.l);
            }

            // SPHL
            0xf9 => self.sp = self.pair(RegPair::HL),

            // Everything else (RST, IN/OUT, EI/DI, PCHL, XTHL, undocumented
            // aliases) has no assigned semantics here: fatal diagnostic.
            _ => return Err(ExecutionError::UnimplementedOpcode { opcode, pc }),
        }

        Ok(())
    }
}
