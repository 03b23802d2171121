use std::env;

fn main() {
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let target = env::var("TARGET").unwrap_or_default();

    println!("cargo:rustc-env=ASKBOARD_VERSION={}-{}", version, target);
    println!("cargo:rerun-if-changed=migrations");
}
