//! Render a binary file as a Rust byte-slice literal.
//!
//! Used by the `bin2src` tool and by `build.rs` to compile a credentials
//! document into the binary. Depends on std only so `build.rs` can include
//! this file directly.

use std::fmt;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// How each byte is spelled in the generated literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `0x00, 0x01, 0x6b`
    #[default]
    Hexx,
    /// `0x0, 0x1, 0x6b`
    Hex,
    /// `0, 1, 107`
    Dec,
    /// `b"\x00\x01\x6b"`
    Shexx,
    /// `b"\x00\x01k"`
    Shex,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Hexx,
        Format::Hex,
        Format::Dec,
        Format::Shexx,
        Format::Shex,
    ];

    fn is_string(self) -> bool {
        matches!(self, Format::Shexx | Format::Shex)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Hexx => "hexx",
            Format::Hex => "hex",
            Format::Dec => "dec",
            Format::Shexx => "shexx",
            Format::Shex => "shex",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hexx" => Ok(Format::Hexx),
            "hex" => Ok(Format::Hex),
            "dec" => Ok(Format::Dec),
            "shexx" => Ok(Format::Shexx),
            "shex" => Ok(Format::Shex),
            _ => Err(format!("unknown format '{s}', may be: hexx, hex, dec, shexx, or shex")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Wrap the declaration in `pub mod <package>`.
    pub package: Option<String>,
    pub var_name: String,
    /// Bytes per line, at least 1.
    pub step: usize,
    pub format: Format,
    /// Emit only the initializer expression, for `include!` into an
    /// existing declaration.
    pub init_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            package: None,
            var_name: "DATA".to_string(),
            step: 16,
            format: Format::Hexx,
            init_only: false,
        }
    }
}

const HEADER: &str = "// Code generated by bin2src. DO NOT EDIT.\n";
const LINE_INDENT: &str = "    ";

/// Read `input` and render it.
pub fn generate_file(input: &Path, options: &Options) -> std::io::Result<String> {
    let data = std::fs::read(input)?;
    Ok(generate(&data, options))
}

/// Render `data` as Rust source according to `options`.
pub fn generate(data: &[u8], options: &Options) -> String {
    let step = options.step.max(1);
    let mut out = String::from(HEADER);

    if options.init_only {
        out.push_str(&literal(data, options.format, step, ""));
        out.push('\n');
        return out;
    }

    let indent = if options.package.is_some() { LINE_INDENT } else { "" };
    if let Some(package) = &options.package {
        let _ = writeln!(out, "pub mod {} {{", package);
    }
    let _ = write!(out, "{}pub static {}: &[u8] = ", indent, options.var_name);
    out.push_str(&literal(data, options.format, step, indent));
    out.push_str(";\n");
    if options.package.is_some() {
        out.push_str("}\n");
    }
    out
}

/// The literal alone, with continuation lines indented under `indent`.
fn literal(data: &[u8], format: Format, step: usize, indent: &str) -> String {
    let mut out = String::new();
    if format.is_string() {
        // One byte string; each line ends in a backslash-newline continuation.
        out.push_str("b\"\\\n");
        for chunk in data.chunks(step) {
            let _ = writeln!(out, "{}{}{}\\", indent, LINE_INDENT, string_line(chunk, format));
        }
        let _ = write!(out, "{}\"", indent);
    } else {
        out.push_str("&[\n");
        for chunk in data.chunks(step) {
            let _ = writeln!(out, "{}{}{},", indent, LINE_INDENT, array_line(chunk, format));
        }
        let _ = write!(out, "{}]", indent);
    }
    out
}

fn array_line(chunk: &[u8], format: Format) -> String {
    let items: Vec<String> = chunk
        .iter()
        .map(|b| match format {
            Format::Hexx => format!("{:#04x}", b),
            Format::Hex => format!("{:#x}", b),
            _ => b.to_string(),
        })
        .collect();
    items.join(", ")
}

fn string_line(chunk: &[u8], format: Format) -> String {
    let mut line = String::with_capacity(chunk.len() * 4);
    for &b in chunk {
        match format {
            Format::Shex if b == b' ' => {
                // A line continuation swallows leading whitespace.
                line.push_str("\\x20");
            }
            Format::Shex => line.extend(std::ascii::escape_default(b).map(char::from)),
            _ => {
                let _ = write!(line, "\\x{:02x}", b);
            }
        }
    }
    line
}
