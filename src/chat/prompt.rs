//! Prompt composition for both generation paths.

/// Fixed assistant persona shared by the direct chain and the agent.
pub const SYSTEM_PROMPT: &str = "\
You are the virtual assistant of the ChillStay app, a booking platform for \
hotels, homestays and holiday apartments. Answer the user's question based \
on the information provided. If the information is not sufficient, answer \
from your general knowledge of booking applications. Keep answers short, \
clear and friendly.";

/// Substituted whenever generation produces an empty or unusable answer.
pub const FALLBACK_ANSWER: &str = "Sorry, I can't answer that question.";

/// The human turn of the direct RAG path: retrieved context plus the raw
/// user input.
pub fn compose_user_turn(context: &str, user_input: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}", context, user_input)
}

/// Replace an empty generation with the fixed fallback phrase.
pub fn non_empty_or_fallback(answer: String) -> String {
    if answer.trim().is_empty() {
        FALLBACK_ANSWER.to_string()
    } else {
        answer
    }
}
