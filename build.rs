use std::error::Error;

use tonic_build::manual::{Builder, Method, Service};

fn main() -> Result<(), Box<dyn Error>> {
    // The coordinator service is described by hand instead of through a
    // `.proto` file; messages are serde structs carried by `rpc::JsonCodec`.
    let method = |name: &str, route: &str, input: &str, output: &str| {
        Method::builder()
            .name(name)
            .route_name(route)
            .input_type(format!("crate::rpc::{input}"))
            .output_type(format!("crate::rpc::{output}"))
            .codec_path("crate::rpc::JsonCodec")
            .build()
    };

    let coordinator = Service::builder()
        .name("Coordinator")
        .package("mapreduce")
        .method(method(
            "acquire_task",
            "AcquireTask",
            "AcquireTaskRequest",
            "AcquireTaskReply",
        ))
        .method(method(
            "report_completion",
            "ReportCompletion",
            "ReportCompletionRequest",
            "ReportCompletionReply",
        ))
        .method(method("job_done", "JobDone", "JobDoneRequest", "JobDoneReply"))
        .build();

    Builder::new().compile(&[coordinator]);
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
