//! Debugger command parsing.
//!
//! Addresses and memory values are hexadecimal (optionally `#`-prefixed),
//! matching how the debugger prints them. Step counts and breakpoint slots
//! are decimal.

use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Run,
    Continue,
    Step { count: u16 },
    Break { addr: u16 },
    Delete { slot: Option<u8> },
    Info,
    Print,
    Dump { addr: Option<u16> },
    Stack,
    File { path: String },
    Jump { addr: u16 },
    Memory { addr: u16, value: u16 },
    Disasm { addr: Option<u16> },
    Label,
    Help,
    Quit,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CommandError {
    Unknown(String),
    MissingArgument(&'static str),
    BadInteger(String),
    TooManyArguments,
}

impl std::error::Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown command `{}` (try `help`)", name),
            Self::MissingArgument(what) => write!(f, "missing {} argument", what),
            Self::BadInteger(text) => write!(f, "`{}` is not a valid number", text),
            Self::TooManyArguments => write!(f, "too many arguments"),
        }
    }
}

fn parse_hex(text: &str) -> Result<u16, CommandError> {
    let digits = text.strip_prefix('#').unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|_| CommandError::BadInteger(text.to_string()))
}

fn parse_dec<T: std::str::FromStr>(text: &str) -> Result<T, CommandError> {
    text.parse()
        .map_err(|_| CommandError::BadInteger(text.to_string()))
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or("");
        let args: Vec<&str> = words.collect();

        let arity = |min: usize, max: usize, what: &'static str| -> Result<(), CommandError> {
            if args.len() < min {
                Err(CommandError::MissingArgument(what))
            } else if args.len() > max {
                Err(CommandError::TooManyArguments)
            } else {
                Ok(())
            }
        };

        let command = match name {
            "run" | "r" => {
                arity(0, 0, "")?;
                Command::Run
            }
            "continue" | "cont" | "c" => {
                arity(0, 0, "")?;
                Command::Continue
            }
            "step" | "s" => {
                arity(0, 1, "")?;
                let count = match args.first() {
                    Some(text) => parse_dec::<u16>(text)?.max(1),
                    None => 1,
                };
                Command::Step { count }
            }
            "break" | "b" => {
                arity(1, 1, "address")?;
                Command::Break {
                    addr: parse_hex(args[0])?,
                }
            }
            "del" => {
                arity(0, 1, "")?;
                let slot = args.first().map(|text| parse_dec::<u8>(text)).transpose()?;
                Command::Delete { slot }
            }
            "info" | "i" => {
                arity(0, 0, "")?;
                Command::Info
            }
            "print" | "p" => {
                arity(0, 0, "")?;
                Command::Print
            }
            "dump" | "du" => {
                arity(0, 1, "")?;
                let addr = args.first().map(|text| parse_hex(text)).transpose()?;
                Command::Dump { addr }
            }
            "stack" | "st" => {
                arity(0, 0, "")?;
                Command::Stack
            }
            "file" | "f" => {
                arity(1, 1, "path")?;
                Command::File {
                    path: args[0].to_string(),
                }
            }
            "jump" | "j" => {
                arity(1, 1, "address")?;
                Command::Jump {
                    addr: parse_hex(args[0])?,
                }
            }
            "memory" | "m" => {
                arity(2, 2, "address and value")?;
                Command::Memory {
                    addr: parse_hex(args[0])?,
                    value: parse_hex(args[1])?,
                }
            }
            "disasm" | "di" => {
                arity(0, 1, "")?;
                let addr = args.first().map(|text| parse_hex(text)).transpose()?;
                Command::Disasm { addr }
            }
            "label" | "l" => {
                arity(0, 0, "")?;
                Command::Label
            }
            "help" | "h" | "?" => {
                arity(0, 0, "")?;
                Command::Help
            }
            "quit" | "q" | "exit" => {
                arity(0, 0, "")?;
                Command::Quit
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}
