pub mod image;
pub mod llm;
pub mod s3;
pub mod sst;
pub mod tts;

pub use image::BedrockImageAdapter;
pub use llm::BedrockTextAdapter;
pub use s3::S3BlobStore;
pub use sst::TranscribeSstAdapter;
pub use tts::PollyTtsAdapter;
