use ort::execution_providers::ExecutionProviderDispatch;

/// ONNX execution providers to try for the keypoint model, best first.
///
/// ONNX Runtime silently falls back to its CPU provider when none of these
/// can be registered, so an empty list means "CPU only".
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Human-readable name of the accelerator requested on this platform.
pub fn preferred_provider_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "CoreML"
    } else if cfg!(target_os = "windows") {
        "DirectML"
    } else {
        "CPU"
    }
}
