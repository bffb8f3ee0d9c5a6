// Adapters - External system implementations

pub mod decode_libav;
pub mod exec_ffmpeg;
pub mod toml_config;
pub mod vision_ollama;

// Re-export adapters
pub use decode_libav::LibavFrameSource;
pub use exec_ffmpeg::FfmpegCli;
pub use toml_config::AppConfig;
pub use vision_ollama::OllamaVisionAdapter;
