//! Compile OAuth client credentials into the binary.
//!
//! When `GDOWNLOAD_CREDENTIALS` names a client-secret JSON file, it is
//! rendered into `$OUT_DIR/credentials.rs` and `cfg(embedded_credentials)`
//! is set, so `gdownload` needs no `--credentials-file` at runtime.

use std::path::PathBuf;

#[allow(dead_code)]
#[path = "src/codegen.rs"]
mod codegen;

const CREDENTIALS_ENV: &str = "GDOWNLOAD_CREDENTIALS";

fn main() {
    println!("cargo:rerun-if-env-changed={}", CREDENTIALS_ENV);
    println!("cargo:rerun-if-changed=src/codegen.rs");

    let Some(input) = std::env::var_os(CREDENTIALS_ENV).filter(|v| !v.is_empty()) else {
        return;
    };
    let input = PathBuf::from(input);
    println!("cargo:rerun-if-changed={}", input.display());

    let options = codegen::Options {
        init_only: true,
        ..codegen::Options::default()
    };
    let source = match codegen::generate_file(&input, &options) {
        Ok(source) => source,
        Err(e) => panic!("cannot read {} ({}): {}", input.display(), CREDENTIALS_ENV, e),
    };

    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let out_file = out_dir.join("credentials.rs");
    if let Err(e) = std::fs::write(&out_file, source) {
        panic!("cannot write {}: {}", out_file.display(), e);
    }
    println!("cargo:rustc-cfg=embedded_credentials");
}
