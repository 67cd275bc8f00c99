pub mod inswapper;
pub mod onnx_initializer;
pub mod paste_back;
pub mod swapper_factory;
