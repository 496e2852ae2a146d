pub mod gemini;
pub mod resend;
