use std::env::vars;

use dotenvy::dotenv;

fn main() {
    println!("cargo:rerun-if-changed=.env");
    dotenv().ok();

    for (k, v) in vars().filter(|(k, _)| k.starts_with("VIGIL_")) {
        println!("cargo:rustc-env={k}={v}");
    }
}
