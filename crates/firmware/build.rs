// Build-script crate; panicking on a broken build environment is fine here.
#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    // Linker script plumbing is only needed for hardware builds; host builds
    // of the workspace must not require an ARM linker. Features reach build
    // scripts as environment variables, not cfgs.
    if env::var_os("CARGO_FEATURE_HARDWARE").is_some() {
        // Copy `memory.x` into OUT_DIR and put it on the linker search path.
        let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
        let memory_x = include_bytes!("../../memory.x");

        File::create(out.join("memory.x"))
            .unwrap()
            .write_all(memory_x)
            .unwrap();

        println!("cargo:rustc-link-search={}", out.display());

        println!("cargo:rerun-if-changed=../../memory.x");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
