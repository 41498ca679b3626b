//! Build script for tfplug
//!
//! Generates the tfplugin6 message types and the gRPC server trait from
//! `proto/tfplugin6.proto`. A `PROTOC` from the environment wins; otherwise
//! the vendored protoc binary is used.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/tfplugin6.proto");

    if std::env::var_os("PROTOC").is_none() {
        match protoc_bin_vendored::protoc_bin_path() {
            Ok(path) => std::env::set_var("PROTOC", path),
            Err(_) => println!("cargo:warning=vendored protoc unavailable, relying on PATH"),
        }
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/tfplugin6.proto"], &["proto/"])?;

    Ok(())
}
