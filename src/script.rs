//! Line-oriented scripts that drive a [`Host`].
//!
//! ```text
//! # copy four words with DMA0
//! poke32  0x02000000 0x11111111
//! write32 0x040000B0 0x02000000
//! write32 0x040000B4 0x03000000
//! write16 0x040000B8 4
//! write16 0x040000BA 0x8400
//! run
//! expect32 0x03000000 0x11111111
//! ```

use std::{fs, io::Write, path::Path, str::FromStr};

use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::{dma::Fifo, host::Host};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: `{command}` takes {expected} argument(s), found {found}")]
    Arity {
        line: usize,
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: `{text}` is not a valid value here")]
    Value { line: usize, text: String },
    #[error("line {line}: expected {expected:#010X} at {addr:#010X}, found {found:#010X}")]
    Mismatch {
        line: usize,
        addr: u32,
        expected: u32,
        found: u32,
    },
    #[error("line {line}: expected IF {expected:#06X}, found {found:#06X}")]
    IrqMismatch {
        line: usize,
        expected: u16,
        found: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillValue {
    Random,
    Constant(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Write8(u32, u8),
    Write16(u32, u16),
    Write32(u32, u32),
    Poke32(u32, u32),
    Fill { addr: u32, words: u32, value: FillValue },
    HBlank,
    VBlank,
    Fifo(Fifo),
    Run(Option<i32>),
    Dump { addr: u32, words: u32 },
    Expect32(u32, u32),
    ExpectIf(u16),
    Reset,
}

fn parse_number<T>(line: usize, text: &str) -> Result<T, ScriptError>
where
    T: TryFrom<u64>,
{
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => text.replace('_', "").parse::<u64>().ok(),
    };
    parsed
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| ScriptError::Value {
            line,
            text: text.to_string(),
        })
}

impl Command {
    /// Parses one non-empty, comment-free line.
    fn parse(line: usize, text: &str) -> Result<Self, ScriptError> {
        let mut words = text.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(ScriptError::Arity {
                    line,
                    command: name.to_string(),
                    expected,
                    found: args.len(),
                })
            }
        };

        let command = match name {
            "write8" => {
                arity(2)?;
                Command::Write8(parse_number(line, args[0])?, parse_number(line, args[1])?)
            }
            "write16" => {
                arity(2)?;
                Command::Write16(parse_number(line, args[0])?, parse_number(line, args[1])?)
            }
            "write32" => {
                arity(2)?;
                Command::Write32(parse_number(line, args[0])?, parse_number(line, args[1])?)
            }
            "poke32" => {
                arity(2)?;
                Command::Poke32(parse_number(line, args[0])?, parse_number(line, args[1])?)
            }
            "fill" => {
                arity(3)?;
                let value = match args[2] {
                    "random" => FillValue::Random,
                    text => FillValue::Constant(parse_number(line, text)?),
                };
                Command::Fill {
                    addr: parse_number(line, args[0])?,
                    words: parse_number(line, args[1])?,
                    value,
                }
            }
            "hblank" => {
                arity(0)?;
                Command::HBlank
            }
            "vblank" => {
                arity(0)?;
                Command::VBlank
            }
            "fifo" => {
                arity(1)?;
                match args[0] {
                    "a" | "A" => Command::Fifo(Fifo::A),
                    "b" | "B" => Command::Fifo(Fifo::B),
                    text => {
                        return Err(ScriptError::Value {
                            line,
                            text: text.to_string(),
                        })
                    }
                }
            }
            "run" => match args.as_slice() {
                [] => Command::Run(None),
                [cycles] => Command::Run(Some(parse_number(line, cycles)?)),
                _ => {
                    return Err(ScriptError::Arity {
                        line,
                        command: name.to_string(),
                        expected: 1,
                        found: args.len(),
                    })
                }
            },
            "dump" => {
                arity(2)?;
                Command::Dump {
                    addr: parse_number(line, args[0])?,
                    words: parse_number(line, args[1])?,
                }
            }
            "expect32" => {
                arity(2)?;
                Command::Expect32(parse_number(line, args[0])?, parse_number(line, args[1])?)
            }
            "expect-if" => {
                arity(1)?;
                Command::ExpectIf(parse_number(line, args[0])?)
            }
            "reset" => {
                arity(0)?;
                Command::Reset
            }
            _ => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    command: name.to_string(),
                })
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Script {
    commands: Vec<(usize, Command)>,
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut commands = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let text = raw.split('#').next().unwrap_or_default().trim();
            if text.is_empty() {
                continue;
            }
            commands.push((index + 1, Command::parse(index + 1, text)?));
        }
        Ok(Self { commands })
    }
}

impl Script {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        fs::read_to_string(path)?.parse()
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().map(|(_, command)| command)
    }
}

/// Executes scripts against a host.
pub struct Runner {
    pub host: Host,
    rng: StdRng,
    run_budget: i32,
}

impl Runner {
    /// `run_budget` is what a bare `run` lends to DMA.
    pub fn new(seed: u64, run_budget: i32) -> Self {
        Self {
            host: Host::default(),
            rng: StdRng::seed_from_u64(seed),
            run_budget,
        }
    }

    pub fn execute<W: Write>(&mut self, script: &Script, out: &mut W) -> Result<(), ScriptError> {
        for &(line, command) in &script.commands {
            debug!(target: "script", "line {line}: {command:?}");
            self.step(line, command, out)?;
        }
        Ok(())
    }

    fn step<W: Write>(&mut self, line: usize, command: Command, out: &mut W) -> Result<(), ScriptError> {
        let host = &mut self.host;
        match command {
            Command::Write8(addr, data) => host.cpu_write(addr, data),
            Command::Write16(addr, data) => {
                for (i, byte) in (0u32..).zip(data.to_le_bytes()) {
                    host.cpu_write(addr.wrapping_add(i), byte);
                }
            }
            Command::Write32(addr, data) => {
                for (i, byte) in (0u32..).zip(data.to_le_bytes()) {
                    host.cpu_write(addr.wrapping_add(i), byte);
                }
            }
            Command::Poke32(addr, data) => host.bus.poke_word(addr, data),
            Command::Fill { addr, words, value } => {
                for i in 0..words {
                    let data = match value {
                        FillValue::Random => self.rng.gen(),
                        FillValue::Constant(data) => data,
                    };
                    host.bus.poke_word(addr.wrapping_add(i * 4), data);
                }
            }
            Command::HBlank => host.hblank(),
            Command::VBlank => host.vblank(),
            Command::Fifo(fifo) => host.fifo_request(fifo),
            Command::Run(cycles) => {
                let used = host.step(cycles.unwrap_or(self.run_budget));
                info!(target: "script", "line {line}: DMA used {used} cycles");
            }
            Command::Dump { addr, words } => {
                for i in 0..words {
                    let at = addr.wrapping_add(i * 4);
                    if i % 4 == 0 {
                        if i != 0 {
                            writeln!(out)?;
                        }
                        write!(out, "{at:08X}:")?;
                    }
                    write!(out, " {:08X}", host.bus.peek_word(at))?;
                }
                writeln!(out)?;
            }
            Command::Expect32(addr, expected) => {
                let found = host.bus.peek_word(addr);
                if found != expected {
                    return Err(ScriptError::Mismatch {
                        line,
                        addr,
                        expected,
                        found,
                    });
                }
            }
            Command::ExpectIf(expected) => {
                let found = host.irq.0;
                if found != expected {
                    return Err(ScriptError::IrqMismatch {
                        line,
                        expected,
                        found,
                    });
                }
            }
            Command::Reset => host.reset(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, FillValue, Runner, Script, ScriptError};
    use crate::dma::Fifo;

    fn run(source: &str) -> Result<(Runner, String), ScriptError> {
        let script: Script = source.parse()?;
        let mut runner = Runner::new(7, 1000);
        let mut out = Vec::new();
        runner.execute(&script, &mut out)?;
        Ok((runner, String::from_utf8(out).unwrap()))
    }

    #[test]
    fn parse_commands() {
        let script: Script = "
            # comment
            write16 0x040000BA 0x8400   # trailing comment
            fill 0x02000000 4 random
            fill 0x02000000 2 0xFFFF_0000
            fifo b
            run
            run 12
        "
        .parse()
        .unwrap();

        let commands: Vec<_> = script.commands().copied().collect();
        assert_eq!(
            commands,
            vec![
                Command::Write16(0x0400_00BA, 0x8400),
                Command::Fill {
                    addr: 0x0200_0000,
                    words: 4,
                    value: FillValue::Random
                },
                Command::Fill {
                    addr: 0x0200_0000,
                    words: 2,
                    value: FillValue::Constant(0xFFFF_0000)
                },
                Command::Fifo(Fifo::B),
                Command::Run(None),
                Command::Run(Some(12)),
            ]
        );
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let err = "hblank\nfrobnicate 1".parse::<Script>().unwrap_err();
        assert!(matches!(err, ScriptError::UnknownCommand { line: 2, .. }));

        let err = "write8 0x04000000 0x100".parse::<Script>().unwrap_err();
        assert!(matches!(err, ScriptError::Value { line: 1, .. }));

        let err = "vblank now".parse::<Script>().unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Arity {
                expected: 0,
                found: 1,
                ..
            }
        ));
        assert_eq!(err.to_string(), "line 1: `vblank` takes 0 argument(s), found 1");
    }

    #[test]
    fn word_copy_scenario() {
        let (runner, out) = run("
            poke32  0x02000000 0x11111111
            poke32  0x02000004 0x22222222
            poke32  0x02000008 0x33333333
            poke32  0x0200000C 0x44444444
            write32 0x040000B0 0x02000000
            write32 0x040000B4 0x03000000
            write16 0x040000B8 4
            write16 0x040000BA 0x8400
            run
            expect32 0x03000000 0x11111111
            expect32 0x0300000C 0x44444444
            expect-if 0
            dump 0x03000000 4
        ")
        .unwrap();

        assert_eq!(out, "03000000: 11111111 22222222 33333333 44444444\n");
        assert!(!runner.host.dma.is_active());
    }

    #[test]
    fn hblank_reload_scenario() {
        let (runner, _) = run("
            fill 0x02000000 16 random
            write32 0x040000BC 0x02000000
            write32 0x040000C0 0x06000000
            write16 0x040000C4 4
            write16 0x040000C6 0xE660
            hblank
            run
            hblank
            run
            expect-if 0x0200
        ")
        .unwrap();

        let host = &runner.host;
        // second line landed on the same destination words
        for i in 0..4 {
            assert_eq!(
                host.bus.peek_word(0x0600_0000 + i * 4),
                host.bus.peek_word(0x0200_0010 + i * 4)
            );
        }
    }

    #[test]
    fn failed_expectation() {
        let Err(err) = run("expect32 0x02000000 1") else {
            panic!("expectation should have failed");
        };
        assert!(matches!(
            err,
            ScriptError::Mismatch {
                line: 1,
                addr: 0x0200_0000,
                expected: 1,
                found: 0
            }
        ));
    }

    #[test]
    fn seeded_fill_is_reproducible() {
        let (a, _) = run("fill 0x02000000 8 random").unwrap();
        let (b, _) = run("fill 0x02000000 8 random").unwrap();
        for i in 0..8 {
            let addr = 0x0200_0000 + i * 4;
            assert_eq!(a.host.bus.peek_word(addr), b.host.bus.peek_word(addr));
        }
    }
}
