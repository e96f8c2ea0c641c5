//! Speech bridge: transcription, synthesis, and spoken-language
//! normalization for outbound answers.

pub mod speech;
pub mod stt;
pub mod tts;
