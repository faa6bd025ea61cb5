//! Warnings go to stderr, one line each, with the source location
//! appended.

use std::fmt::Arguments;
use std::io::Write;

pub fn write_warning(
    out: &mut impl Write,
    msg: Arguments,
    file: &str,
    line: u32,
) -> std::io::Result<()> {
    writeln!(out, "W: {msg} at {file:?} line {line}")
}

/// What `warn!` expands to. Failing to write to stderr is ignored.
pub fn warning(msg: Arguments, file: &str, line: u32) {
    let _ = write_warning(&mut std::io::stderr().lock(), msg, file, line);
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::warn::warning(format_args!($($arg)*), file!(), line!())
    }
}

/// Same signature as `warn!`, but silent. Swap a `warn!` for this to
/// mute a site without losing the message text.
#[macro_export]
macro_rules! nowarn {
    ($($arg:tt)*) => {}
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn t_write_warning() -> Result<()> {
        let mut out = Vec::new();
        let id = "top";
        write_warning(&mut out, format_args!("loading {id:?} failed"), "src/page.rs", 7)?;
        assert_eq!(String::from_utf8(out)?,
                   "W: loading \"top\" failed at \"src/page.rs\" line 7\n");
        Ok(())
    }

    #[test]
    fn t_macros() {
        crate::warn!("{} and {}", 1, "two");
        crate::nowarn!("never {}", "shown");
    }
}
