//! Build script for simdist.
//!
//! All kernels are pure Rust over `core::arch` intrinsics; nothing is
//! compiled here. The script only emits cfg hints for architecture-specific
//! test scaffolding and keeps rebuilds honest when the kernel tree changes.

fn main() {
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let simd_cfg = match arch.as_str() {
        "x86_64" => Some("has_x86_simd"),
        "aarch64" => Some("has_arm_simd"),
        _ => None,
    };
    if let Some(cfg) = simd_cfg {
        println!("cargo:rustc-cfg={cfg}");
    }

    println!("cargo:rustc-check-cfg=cfg(has_x86_simd)");
    println!("cargo:rustc-check-cfg=cfg(has_arm_simd)");

    println!("cargo:rerun-if-changed=src/kernels/");
    println!("cargo:rerun-if-changed=src/dispatch.rs");
}
