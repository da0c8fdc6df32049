use core::fmt;

/// One of the eight named registers, in encoding order.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Register {
    A,
    B,
    C,
    D,
    I,
    J,
    P,
    S,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::A,
        Register::B,
        Register::C,
        Register::D,
        Register::I,
        Register::J,
        Register::P,
        Register::S,
    ];

    /// Register selected by an operand code, if the code names one.
    pub fn from_code(code: u8) -> Option<Register> {
        Register::ALL.get(usize::from(code)).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::A => "a",
            Register::B => "b",
            Register::C => "c",
            Register::D => "d",
            Register::I => "i",
            Register::J => "j",
            Register::P => "p",
            Register::S => "s",
        };
        f.write_str(name)
    }
}

macro_rules! registers {
    ($($reg:ident => $field:ident),* $(,)?) => {
        /// The register file. Every register is zero at power-on.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
        pub struct Registers {
            $(pub $field: u16,)*
        }

        impl Registers {
            pub const fn new() -> Self {
                Registers { $($field: 0,)* }
            }

            pub fn get(&self, reg: Register) -> u16 {
                match reg {
                    $(Register::$reg => self.$field,)*
                }
            }

            pub fn get_mut(&mut self, reg: Register) -> &mut u16 {
                match reg {
                    $(Register::$reg => &mut self.$field,)*
                }
            }
        }
    };
}

registers! {
    A => a,
    B => b,
    C => c,
    D => d,
    I => i,
    J => j,
    P => p,
    S => s,
}

impl Registers {
    pub fn set(&mut self, reg: Register, value: u16) {
        *self.get_mut(reg) = value;
    }

    /// Every register with its value, in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u16)> + '_ {
        Register::ALL.iter().map(move |&reg| (reg, self.get(reg)))
    }
}

/// `a=0000 b=0000 ... s=0000`, values in hex.
impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (reg, value) in self.iter() {
            if reg != Register::A {
                f.write_str(" ")?;
            }
            write!(f, "{}={:04x}", reg, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_encoding_order() {
        for (code, &reg) in Register::ALL.iter().enumerate() {
            assert_eq!(Register::from_code(code as u8), Some(reg));
            assert_eq!(reg.code(), code as u8);
        }
        assert_eq!(Register::from_code(8), None);
        assert_eq!(Register::from_code(15), None);
    }

    #[test]
    fn set_then_get() {
        let mut registers = Registers::new();
        for (value, &reg) in Register::ALL.iter().enumerate() {
            registers.set(reg, 0x1000 + value as u16);
        }
        assert_eq!(registers.a, 0x1000);
        assert_eq!(registers.s, 0x1007);
        assert_eq!(registers.get(Register::P), 0x1006);
    }

    #[test]
    fn iterates_and_displays_in_encoding_order() {
        let mut registers = Registers::new();
        registers.b = 0xbeef;
        registers.s = 0xfffe;
        let values: Vec<_> = registers.iter().map(|(_, value)| value).collect();
        assert_eq!(values, vec![0, 0xbeef, 0, 0, 0, 0, 0, 0xfffe]);
        assert_eq!(
            registers.to_string(),
            "a=0000 b=beef c=0000 d=0000 i=0000 j=0000 p=0000 s=fffe",
        );
    }
}
