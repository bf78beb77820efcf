use std::io::{self, Write};
use std::thread;

use crate::config::BenchConfig;
use crate::runner::Row;
use crate::workload::Primitive;

const THREADS_WIDTH: usize = 7;
const COLUMN_WIDTH: usize = 13;

/// Formats `n` with `,` between groups of three digits.
pub fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Name and version, printed before the command line is looked at.
pub fn write_title(out: &mut impl Write) -> io::Result<()> {
    write!(out, "{} v{}\n\n", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Platform, build and run settings that follow the title.
pub fn write_banner(out: &mut impl Write, config: &BenchConfig) -> io::Result<()> {
    writeln!(
        out,
        "{} ({}) family: {}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::env::consts::FAMILY
    )?;
    let cpus = thread::available_parallelism().map_or(0, |n| n.get());
    writeln!(out, "Available parallelism: {cpus}")?;
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    write!(out, "Build profile: {profile}\n\n")?;

    writeln!(
        out,
        "Warm up: {} loops of count {} on {} threads",
        config.warm_loops,
        group_thousands(config.warm_count.into()),
        config.warm_threads
    )?;
    write!(out, "Test count: {}\n\n", group_thousands(config.test_count.into()))
}

/// Header and `=` underline for the given columns.
pub fn write_header(out: &mut impl Write, primitives: &[Primitive]) -> io::Result<()> {
    write!(out, "{:>THREADS_WIDTH$}", "Threads")?;
    for p in primitives {
        write!(out, " {:>COLUMN_WIDTH$}", p.label())?;
    }
    writeln!(out)?;

    write!(out, "{}", "=".repeat(THREADS_WIDTH))?;
    for _ in primitives {
        write!(out, " {}", "=".repeat(COLUMN_WIDTH))?;
    }
    writeln!(out)
}

pub fn write_row(out: &mut impl Write, row: &Row) -> io::Result<()> {
    write!(out, "{:>THREADS_WIDTH$}", row.threads)?;
    for (_, elapsed) in &row.elapsed {
        write!(out, " {:>COLUMN_WIDTH$}", group_thousands(elapsed.as_millis()))?;
    }
    writeln!(out)
}
