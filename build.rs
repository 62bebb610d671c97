use std::env;
use std::fs::File;
use std::path::Path;

use gl_generator::{Api, Fallbacks, GlobalGenerator, Profile, Registry};

fn main() {
    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let mut file = File::create(Path::new(&out_dir).join("bindings.rs"))
        .expect("could not create the gl bindings file");
    // GLES 3.0 is requested through the Gles2 api with version 3.0.
    Registry::new(Api::Gles2, (3, 0), Profile::Core, Fallbacks::All, [])
        .write_bindings(GlobalGenerator, &mut file)
        .expect("could not write the gl bindings");
    println!("cargo:rerun-if-changed=build.rs");
}
