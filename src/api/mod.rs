pub mod gemini;
pub mod serper;
pub mod youtube;
