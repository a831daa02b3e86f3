//! The debugger: operations over [`Machine`] state driven by parsed
//! [`Command`]s. The surrounding shell only reads lines and repeats the
//! last command; everything observable happens here.
//!
//! Debugger chrome goes to stderr; program I/O and the termination message
//! go to stdout.

/// Print to the debugger channel (stderr).
macro_rules! dprintln {
    () => {{
        eprintln!();
    }};
    ( $fmt:literal $($tt:tt)* ) => {{
        eprintln!($fmt $($tt)*);
    }};
}

mod breakpoint;
mod command;

pub use command::{Command, CommandError};

use std::path::{Path, PathBuf};

use colored::Colorize;
use log::debug;
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::decode::decode;
use crate::loader;
use crate::machine::{Machine, Step};
use crate::term::{ExecGuard, GuardedIo};
use breakpoint::Breakpoints;

/// What the shell should do after a command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Ready,
    /// End the session with this process exit code.
    Exit(i32),
}

/// Why free-running execution stopped.
enum RunEnd {
    Breakpoint(u8),
    Terminated,
    Suspended,
    Interrupted,
    /// Step count exhausted.
    Done,
}

#[derive(Clone, PartialEq, Eq)]
struct Snapshot {
    pr: u16,
    sp: u16,
    gr: [u16; 8],
    flags: [bool; 3],
}

impl Snapshot {
    fn of(machine: &Machine) -> Self {
        Snapshot {
            pr: machine.pr,
            sp: machine.sp,
            gr: machine.gr,
            flags: [machine.of, machine.sf, machine.zf],
        }
    }
}

pub struct Debugger {
    pub machine: Machine,
    breaks: Breakpoints,
    file: Option<PathBuf>,
    last: Option<Snapshot>,
    dump_addr: u16,
}

impl Debugger {
    pub fn new() -> Self {
        Debugger {
            machine: Machine::new(),
            breaks: Breakpoints::new(),
            file: None,
            last: None,
            dump_addr: 0,
        }
    }

    /// Load an object file and reset the machine. Breakpoints survive.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("cannot read {}", path.display()))?;
        let obj = loader::parse(&path.display().to_string(), &text)?;
        dprintln!(
            "Loaded {} ({} words, start #{:04x})",
            path.display(),
            obj.words.len(),
            obj.start
        );
        self.machine.load(obj);
        self.file = Some(path.to_path_buf());
        self.last = None;
        Ok(())
    }

    /// Run one parsed command to completion.
    pub fn execute(&mut self, command: Command) -> Outcome {
        debug!("command {:?}", command);
        match command {
            Command::Run => {
                let Some(path) = self.file.clone() else {
                    dprintln!("No object file loaded.");
                    return Outcome::Ready;
                };
                if let Err(report) = self.load_file(&path) {
                    eprintln!("{:?}", report);
                    return Outcome::Ready;
                }
                let end = self.exec(None);
                self.finish(end)
            }
            Command::Continue => {
                if self.file.is_none() {
                    dprintln!("No object file loaded.");
                    return Outcome::Ready;
                }
                let end = self.exec(None);
                self.finish(end)
            }
            Command::Step { count } => {
                if self.file.is_none() {
                    dprintln!("No object file loaded.");
                    return Outcome::Ready;
                }
                let end = self.exec(Some(count));
                self.finish(end)
            }
            Command::Break { addr } => {
                match self.breaks.set(addr) {
                    Some(slot) => dprintln!("Breakpoint {} at #{:04x}", slot, addr),
                    None => dprintln!("All {} breakpoint slots are in use.", breakpoint::SLOT_MAX),
                }
                Outcome::Ready
            }
            Command::Delete { slot: Some(slot) } => {
                match self.breaks.delete(slot) {
                    Some(addr) => dprintln!("Deleted breakpoint {} (#{:04x})", slot, addr),
                    None => dprintln!("No breakpoint {}", slot),
                }
                Outcome::Ready
            }
            Command::Delete { slot: None } => {
                self.breaks.clear();
                dprintln!("Deleted all breakpoints");
                Outcome::Ready
            }
            Command::Info => {
                self.info();
                Outcome::Ready
            }
            Command::Print => {
                self.print_regs();
                Outcome::Ready
            }
            Command::Dump { addr } => {
                let start = addr.unwrap_or(self.dump_addr);
                self.dump_rows(start);
                self.dump_addr = start.wrapping_add(128);
                Outcome::Ready
            }
            Command::Stack => {
                self.dump_rows(self.machine.sp);
                Outcome::Ready
            }
            Command::File { path } => {
                if let Err(report) = self.load_file(Path::new(&path)) {
                    eprintln!("{:?}", report);
                }
                Outcome::Ready
            }
            Command::Jump { addr } => {
                self.machine.pr = addr;
                dprintln!("PR = #{:04x}", addr);
                Outcome::Ready
            }
            Command::Memory { addr, value } => {
                self.machine.mem.write(addr, value);
                dprintln!("mem[#{:04x}] = #{:04x}", addr, value);
                Outcome::Ready
            }
            Command::Disasm { addr } => {
                self.disasm(addr.unwrap_or(self.machine.pr));
                Outcome::Ready
            }
            Command::Label => {
                self.labels();
                Outcome::Ready
            }
            Command::Help => {
                self.help();
                Outcome::Ready
            }
            Command::Quit => Outcome::Exit(1),
        }
    }

    /// Execute instructions until something stops the run. `limit` bounds
    /// the instruction count (the `step` command). The keyboard interrupt
    /// is polled between instructions only; no instruction is ever
    /// partially executed.
    fn exec(&mut self, limit: Option<u16>) -> RunEnd {
        let guard = ExecGuard::new();
        let mut io = GuardedIo::new(&guard);
        let mut executed: u32 = 0;
        loop {
            if guard.interrupted() {
                return RunEnd::Interrupted;
            }
            match self.machine.step(&mut io) {
                Step::Normal => {}
                Step::Terminated => return RunEnd::Terminated,
                Step::Suspended => return RunEnd::Suspended,
            }
            executed += 1;
            if let Some(slot) = self.breaks.hit(self.machine.pr) {
                return RunEnd::Breakpoint(slot);
            }
            if limit.is_some_and(|limit| executed >= limit as u32) {
                return RunEnd::Done;
            }
        }
    }

    fn finish(&mut self, end: RunEnd) -> Outcome {
        match end {
            RunEnd::Terminated => {
                println!("Program terminated.");
                Outcome::Exit(0)
            }
            RunEnd::Suspended => {
                let reason = self.machine.suspend.as_deref().unwrap_or("trap");
                dprintln!("Suspended: {}", reason);
                Outcome::Ready
            }
            RunEnd::Breakpoint(slot) => {
                dprintln!("Breakpoint {} at #{:04x}", slot, self.machine.pr);
                self.show_next();
                Outcome::Ready
            }
            RunEnd::Interrupted => {
                dprintln!("Interrupted at #{:04x}", self.machine.pr);
                Outcome::Ready
            }
            RunEnd::Done => {
                self.show_next();
                Outcome::Ready
            }
        }
    }

    /// One-line disassembly of the next instruction.
    fn show_next(&self) {
        let d = decode(&self.machine.mem, self.machine.pr);
        dprintln!(
            "next: #{:04x}  {}",
            self.machine.pr,
            d.text(Some(&self.machine.labels))
        );
    }

    /// Register dump; values that changed since the last `print` are
    /// highlighted.
    fn print_regs(&mut self) {
        let snap = Snapshot::of(&self.machine);
        let prev = self.last.replace(snap.clone());
        let hl = |text: String, changed: bool| {
            if changed {
                text.yellow().bold().to_string()
            } else {
                text
            }
        };
        let was = |get: &dyn Fn(&Snapshot) -> u16, now: u16| {
            prev.as_ref().is_some_and(|p| get(p) != now)
        };
        eprintln!(
            "{}  {}  {} {} {}",
            hl(format!("PR #{:04x}", snap.pr), was(&|p| p.pr, snap.pr)),
            hl(format!("SP #{:04x}", snap.sp), was(&|p| p.sp, snap.sp)),
            hl(
                format!("OF {}", snap.flags[0] as u8),
                prev.as_ref().is_some_and(|p| p.flags[0] != snap.flags[0])
            ),
            hl(
                format!("SF {}", snap.flags[1] as u8),
                prev.as_ref().is_some_and(|p| p.flags[1] != snap.flags[1])
            ),
            hl(
                format!("ZF {}", snap.flags[2] as u8),
                prev.as_ref().is_some_and(|p| p.flags[2] != snap.flags[2])
            ),
        );
        for half in 0..2 {
            let row: Vec<String> = (0..4)
                .map(|i| {
                    let reg = half * 4 + i;
                    hl(
                        format!("GR{} #{:04x}", reg, snap.gr[reg]),
                        was(&|p| p.gr[reg], snap.gr[reg]),
                    )
                })
                .collect();
            eprintln!("{}", row.join("  "));
        }
    }

    /// 16 rows of 8 words with an ASCII gutter.
    fn dump_rows(&self, start: u16) {
        for row in 0..16u16 {
            let base = start.wrapping_add(row * 8);
            let words: Vec<u16> = (0..8)
                .map(|i| self.machine.mem.read(base.wrapping_add(i)))
                .collect();
            let hex: Vec<String> = words.iter().map(|w| format!("{:04x}", w)).collect();
            let ascii: String = words
                .iter()
                .map(|w| {
                    let byte = (w & 0xFF) as u8;
                    if (0x20..0x7F).contains(&byte) {
                        byte as char
                    } else {
                        '.'
                    }
                })
                .collect();
            dprintln!("#{:04x}: {}  {}", base, hex.join(" "), ascii);
        }
    }

    /// 16 instructions from `start`.
    fn disasm(&self, start: u16) {
        let mut addr = start;
        for _ in 0..16 {
            let d = decode(&self.machine.mem, addr);
            let words = if d.size() == 2 {
                format!("{:04x} {:04x}", d.word, d.adr)
            } else {
                format!("{:04x}     ", d.word)
            };
            dprintln!(
                "#{:04x}  {}  {}",
                addr,
                words,
                d.text(Some(&self.machine.labels))
            );
            addr = addr.wrapping_add(d.size());
        }
    }

    fn labels(&self) {
        if self.machine.labels.is_empty() {
            dprintln!("No labels.");
            return;
        }
        for (addr, name) in self.machine.labels.iter() {
            dprintln!("#{:04x} {}", addr, name);
        }
    }

    fn info(&self) {
        match &self.file {
            Some(path) => dprintln!("File: {}", path.display()),
            None => dprintln!("File: (none)"),
        }
        if self.breaks.is_empty() {
            dprintln!("No breakpoints set.");
            return;
        }
        for (slot, addr) in self.breaks.iter() {
            dprintln!("{:2}: #{:04x}", slot, addr);
        }
    }

    fn help(&self) {
        dprintln!("run              reload the current file and run");
        dprintln!("continue         execute until breakpoint or trap");
        dprintln!("step [n]         execute n instructions (default 1)");
        dprintln!("break a          set a breakpoint at hex address a");
        dprintln!("del [n]          delete breakpoint n, or all");
        dprintln!("info             show file and breakpoints");
        dprintln!("print            show registers and flags");
        dprintln!("dump [a]         dump 128 words of memory");
        dprintln!("stack            dump memory from SP");
        dprintln!("file path        load an object file");
        dprintln!("jump a           set PR to hex address a");
        dprintln!("memory a v       write hex value v at hex address a");
        dprintln!("disasm [a]       disassemble 16 instructions");
        dprintln!("label            list loaded labels");
        dprintln!("help             this text");
        dprintln!("quit             leave the emulator");
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loader::Object;
    use crate::symbol::ReverseTable;

    fn debugger_with(words: &[u16]) -> Debugger {
        let mut dbg = Debugger::new();
        dbg.machine.load(Object {
            start: 0,
            words: words.to_vec(),
            labels: ReverseTable::new(),
        });
        dbg.file = Some(PathBuf::from("test.obj"));
        dbg
    }

    #[test]
    fn step_stops_at_count() {
        // NOP; NOP; NOP; RET
        let mut dbg = debugger_with(&[0x0000, 0x0000, 0x0000, 0x8100]);
        assert_eq!(dbg.execute(Command::Step { count: 2 }), Outcome::Ready);
        assert_eq!(dbg.machine.pr, 2);
    }

    #[test]
    fn continue_runs_to_termination() {
        let mut dbg = debugger_with(&[0x0000, 0x0000, 0x8100]);
        assert_eq!(dbg.execute(Command::Continue), Outcome::Exit(0));
    }

    #[test]
    fn breakpoint_stops_continue() {
        let mut dbg = debugger_with(&[0x0000, 0x0000, 0x0000, 0x8100]);
        dbg.execute(Command::Break { addr: 2 });
        assert_eq!(dbg.execute(Command::Continue), Outcome::Ready);
        assert_eq!(dbg.machine.pr, 2);
        // A second continue runs to the end
        assert_eq!(dbg.execute(Command::Continue), Outcome::Exit(0));
    }

    #[test]
    fn suspend_surfaces_to_prompt() {
        // Illegal instruction word
        let mut dbg = debugger_with(&[0xABCD]);
        assert_eq!(dbg.execute(Command::Continue), Outcome::Ready);
        assert!(dbg.machine.suspend.is_some());
    }

    #[test]
    fn jump_and_memory_mutate_state() {
        let mut dbg = debugger_with(&[0x0000]);
        dbg.execute(Command::Jump { addr: 0x1234 });
        assert_eq!(dbg.machine.pr, 0x1234);
        dbg.execute(Command::Memory {
            addr: 0x10,
            value: 0xBEEF,
        });
        assert_eq!(dbg.machine.mem.read(0x10), 0xBEEF);
    }

    #[test]
    fn quit_exits_with_one() {
        let mut dbg = debugger_with(&[0x0000]);
        assert_eq!(dbg.execute(Command::Quit), Outcome::Exit(1));
    }

    #[test]
    fn breakpoints_survive_reload() {
        let mut dbg = debugger_with(&[0x0000, 0x8100]);
        dbg.execute(Command::Break { addr: 1 });
        dbg.machine.load(Object {
            start: 0,
            words: vec![0x0000, 0x8100],
            labels: ReverseTable::new(),
        });
        assert_eq!(dbg.breaks.hit(1), Some(1));
    }
}
