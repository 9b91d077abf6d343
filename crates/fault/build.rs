//! Derives the architecture variant from the compilation target.
//!
//! Emits exactly one of `armv6m`, `armv7m`, `armv8m_base`, `armv8m_main` for
//! Arm M-profile targets, plus the derived `fault_regs` and `armv8` cfgs that
//! gate capture steps. Host targets get none of them.

// Build script: a misconfigured variant must stop the build.
#![allow(clippy::panic)]

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for cfg in ["armv6m", "armv7m", "armv8m_base", "armv8m_main", "armv8", "fault_regs"] {
        println!("cargo:rustc-check-cfg=cfg({cfg})");
    }

    let target = env::var("TARGET").unwrap_or_default();
    let arch = if target.starts_with("thumbv6m-") {
        Some("armv6m")
    } else if target.starts_with("thumbv7m-") || target.starts_with("thumbv7em-") {
        Some("armv7m")
    } else if target.starts_with("thumbv8m.base-") {
        Some("armv8m_base")
    } else if target.starts_with("thumbv8m.main-") {
        Some("armv8m_main")
    } else {
        None
    };

    let v81 = env::var_os("CARGO_FEATURE_ARMV8_1M").is_some();
    let secure = env::var_os("CARGO_FEATURE_SECURE").is_some();
    let trustzone = env::var_os("CARGO_FEATURE_TRUSTZONE").is_some();

    let Some(arch) = arch else {
        // Host build: only the data model, decoder and reference model are compiled.
        return;
    };

    let armv8 = matches!(arch, "armv8m_base" | "armv8m_main");
    if v81 && arch != "armv8m_main" {
        panic!("feature `armv8_1m` requires a thumbv8m.main target (got {target})");
    }
    if trustzone && !armv8 {
        panic!("features `trustzone`/`secure` require an Armv8-M target (got {target})");
    }
    if secure {
        let features = env::var("CARGO_CFG_TARGET_FEATURE").unwrap_or_default();
        if !features.split(',').any(|f| f == "trustzone") {
            panic!("feature `secure` requires RUSTFLAGS=\"-C target-feature=+trustzone\"");
        }
    }

    println!("cargo:rustc-cfg={arch}");
    if armv8 {
        println!("cargo:rustc-cfg=armv8");
    }
    if matches!(arch, "armv7m" | "armv8m_main") {
        println!("cargo:rustc-cfg=fault_regs");
    }
}
