// Build script to compile Protocol Buffer definitions

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile protobuf files with client and server stubs
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["../../proto/payments.proto", "../../proto/orders.proto"],
            &["../../proto/"],
        )?;

    // Tell Cargo to rerun if proto files change
    println!("cargo:rerun-if-changed=../../proto/payments.proto");
    println!("cargo:rerun-if-changed=../../proto/orders.proto");

    Ok(())
}
