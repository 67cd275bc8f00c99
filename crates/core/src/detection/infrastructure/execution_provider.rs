use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
    ExecutionProviderDispatch, OpenVINOExecutionProvider, ROCmExecutionProvider,
    TensorRTExecutionProvider,
};

/// Map configured backend names to ONNX execution providers, preserving order.
///
/// `cpu` needs no registration since ONNX Runtime always falls back to it.
/// Unknown names are skipped with a warning.
pub fn execution_providers(names: &[String]) -> Vec<ExecutionProviderDispatch> {
    names
        .iter()
        .filter_map(|name| provider_for(name))
        .collect()
}

fn provider_for(name: &str) -> Option<ExecutionProviderDispatch> {
    match name.trim().to_lowercase().as_str() {
        "cpu" => None,
        "cuda" => Some(CUDAExecutionProvider::default().build()),
        "tensorrt" => Some(TensorRTExecutionProvider::default().build()),
        "coreml" => Some(CoreMLExecutionProvider::default().build()),
        "directml" => Some(DirectMLExecutionProvider::default().build()),
        "rocm" => Some(ROCmExecutionProvider::default().build()),
        "openvino" => Some(OpenVINOExecutionProvider::default().build()),
        other => {
            log::warn!("Skipping unknown execution provider '{other}'");
            None
        }
    }
}

/// Backend names accepted by [`execution_providers`].
pub const KNOWN_PROVIDERS: &[&str] = &[
    "cpu", "cuda", "tensorrt", "coreml", "directml", "rocm", "openvino",
];
