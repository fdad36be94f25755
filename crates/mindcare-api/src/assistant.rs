use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

/// Fixed user-facing reply when the generation call fails for any reason.
/// The underlying error is logged by the caller, never surfaced.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again later.";

/// Persona and behavior rules prepended to every message. These are advisory
/// text handed to the model; nothing downstream validates the generated reply
/// against them.
const SYSTEM_PROMPT: &str = r#"You are 'MindCare Assistant', a compassionate and supportive AI mental wellness chatbot for college students. Your purpose is to provide a safe, non-judgmental space for students to express their feelings.

Your primary functions are:
1.  **Listen Empathetically:** Acknowledge the user's feelings and validate their experiences. Use phrases like "That sounds really tough," or "It makes sense that you're feeling that way."
2.  **Provide Initial Coping Strategies:** Offer simple, actionable, evidence-based techniques (like deep breathing, grounding, or a simple CBT reframing exercise).
3.  **Suggest Resources:** Gently guide users towards the app's Resource Hub for more detailed information.
4.  **Encourage Professional Help:** For serious issues, gently suggest booking an appointment with a professional counsellor through the app.
5.  **Maintain a Warm and encouraging Tone:** Use simple, accessible language. Be positive and hopeful.
6.  **Do NOT give medical advice or a diagnosis.** You are a first-aid assistant, not a doctor. Always include a disclaimer to consult a professional for serious concerns.
7.  **Detect Crisis Language:** If a user mentions suicide, self-harm, or indicates they are in immediate danger, your response MUST prioritize their safety. Your response should be: "I'm very concerned about what you've shared. Your safety is the most important thing right now. Please reach out immediately to one of these 24/7 helplines in India: Emergency Services: 112 or the KIRAN Mental Health Helpline: 1800-599-0019. There are people who want to help you right now.""#;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation response contained no text")]
    EmptyResponse,
}

/// Stateless client for the hosted generation API. One outbound call per
/// message; no retries, no streaming, no conversation memory.
pub struct Assistant {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Assistant {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.into(),
        }
    }

    pub async fn generate(&self, message: &str) -> Result<String, AssistantError> {
        let prompt = build_prompt(message);
        let url = format!("{}/models/{}:generateContent", self.base_url, GEMINI_MODEL);

        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response.json().await?;
        debug!("Generation API returned {} candidate(s)", parsed.candidates.as_deref().map_or(0, |c| c.len()));

        extract_text(parsed).ok_or(AssistantError::EmptyResponse)
    }
}

fn build_prompt(message: &str) -> String {
    format!("{}\n\nStudent says: \"{}\"", SYSTEM_PROMPT, message)
}

/// First candidate's first text part, verbatim.
fn extract_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .find_map(|part| part.text)
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_user_message() {
        let prompt = build_prompt("I can't sleep before exams");

        assert!(prompt.starts_with("You are 'MindCare Assistant'"));
        assert!(prompt.ends_with("Student says: \"I can't sleep before exams\""));
        // The crisis script must reach the model on every call
        assert!(prompt.contains("KIRAN Mental Health Helpline"));
    }

    #[test]
    fn extracts_first_candidate_text() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {"content": {"parts": [{"text": "That sounds really tough."}], "role": "model"},
                     "finishReason": "STOP"}
                ],
                "usageMetadata": {"promptTokenCount": 420}
            }"#,
        )
        .unwrap();

        assert_eq!(extract_text(parsed).as_deref(), Some("That sounds really tough."));
    }

    #[test]
    fn empty_candidates_yield_none() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(extract_text(parsed).is_none());

        let parsed: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(extract_text(parsed).is_none());
    }
}
