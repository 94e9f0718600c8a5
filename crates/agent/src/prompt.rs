//! Prompt assembly: turns retrieved context, history, and the question into
//! one generation request.
//!
//! The behavioural policy lives in [`FIXED_SYSTEM_PROMPT`] and is advisory to
//! the model; nothing here enforces it. Assembly is pure and infallible.

use ragdesk_core::message::Message;
use ragdesk_core::provider::ProviderRequest;
use serde::{Deserialize, Serialize};

/// Text the model is told to use when the context lacks an answer.
pub const DECLINE_REPLY: &str = "I'm sorry, but that information isn't available right now.";

/// Domain-independent support-agent behaviour, prepended to every request.
pub const FIXED_SYSTEM_PROMPT: &str = "\
You are a customer support agent. Give helpful, professional, and accurate answers \
for whatever business the domain instructions below describe.

Core behaviour:
1. Be polite, empathetic, and focused on solving the customer's problem.
2. Work out what the customer wants, use the retrieved information, then give a clear, actionable answer.
3. Typical tasks: FAQs, product or service details, explaining processes such as orders, bookings, \
or appointments, and guiding the customer to a next step.
4. Adapt tone and terminology to the domain instructions. Never assume the industry yourself.
5. If something is unclear, ask a clarifying question instead of guessing.
6. If a request is outside customer support, politely say you cannot help with it.";

/// Rules appended after the domain instructions.
const RESPONSE_RULES: &str = "\
Always respond in English, even when the context is in another language. \
Translate whatever you need from the context.

Greetings:
- If the question is only a greeting (for example \"Hello\", \"Hi\", \"Good morning\", \"Olá\", \"Bom dia\"), \
reply with a warm greeting that fits the domain and offer help.
- If the question contains a greeting and a request, acknowledge the greeting briefly and then answer.
- If the question contains no greeting, do not greet. Start with the answer.

Answering:
- Answer only from the provided context. Do not invent or assume information.
- If the context does not contain what is needed, say: \"I'm sorry, but that information isn't available right now.\"
- Keep answers concise and natural, in the tone the domain instructions ask for.
- For out-of-scope requests such as medical diagnoses, say you cannot assist and suggest an appropriate next step.
- When asked for contact information, list every contact detail present in the context, clearly formatted.
- Use the chat history for continuity. When an earlier question or answer is relevant, refer to it explicitly.";

/// Everything the completion service needs for one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub domain_instructions: String,
    pub context: String,
    pub history: String,
    pub question: String,
}

/// Compose a generation request. Inputs are passed through verbatim; empty
/// pieces stay empty.
pub fn assemble(
    domain_instructions: &str,
    context: &str,
    history: &str,
    question: &str,
) -> GenerationRequest {
    GenerationRequest {
        domain_instructions: domain_instructions.to_string(),
        context: context.to_string(),
        history: history.to_string(),
        question: question.to_string(),
    }
}

impl GenerationRequest {
    /// Fixed prompt, domain instructions, then the response rules.
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::from(FIXED_SYSTEM_PROMPT);
        if !self.domain_instructions.trim().is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(self.domain_instructions.trim());
        }
        prompt.push_str("\n\n");
        prompt.push_str(RESPONSE_RULES);
        prompt
    }

    /// The per-query block: context, history, question.
    pub fn user_prompt(&self) -> String {
        format!(
            "Context:\n{}\n\nChat History:\n{}\n\nUser Question:\n{}\n\nResponse:",
            self.context, self.history, self.question
        )
    }

    pub fn to_messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt()),
        ]
    }

    /// Wrap into a provider request for `model`.
    pub fn into_provider_request(
        self,
        model: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> ProviderRequest {
        ProviderRequest {
            model: model.to_string(),
            messages: self.to_messages(),
            temperature,
            max_tokens,
        }
    }
}
