use tonic_build::manual::{Builder, Method, Service};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let auth_rpc = Service::builder()
        .name("AuthRpc")
        .package("tollgate.auth.v1")
        .method(
            Method::builder()
                .name("validate")
                .route_name("Validate")
                .input_type("crate::proto::ValidateRequest")
                .output_type("crate::proto::ValidateResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    Builder::new().compile(&[auth_rpc]);
}
