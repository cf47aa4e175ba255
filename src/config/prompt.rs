use crate::history::ConversationSummary;
use crate::llm::chat::{ ChatMessage, CompletionRequest };
use crate::models::triage::TriageRequest;

/// Canned reply used when mock mode is on.
pub const MOCK_VERDICT: &str =
    "---\nQUESTION_ASKED: None\nRISK_LEVEL: GREEN\nPOTENTIAL_CAUSES: Mock Cause\nRATIONALE: Mocking enabled.\nNEXT_ACTION: No action.\n---";

/// Returned whenever the provider cannot produce a verdict.
pub const FAILSAFE_VERDICT: &str =
    "RISK_LEVEL: RED\nRATIONALE: AI service unavailable\nNEXT_ACTION: Immediate Evaluation";

/// The question thresholds here are instructions to the model only; nothing
/// checks the reply against them.
pub fn build_system_prompt(request: &TriageRequest, summary: &ConversationSummary) -> String {
    format!(
        r#"You are the Afya-Pulse Triage AI.
Analyze symptoms and return a structured verdict.

## LANGUAGE RULES:
1. Detect SHENG (Mixed English/Swahili) -> Respond in ENGLISH.
2. Detect PURE SWAHILI -> Respond in SWAHILI.
3. HEADERS (QUESTION_ASKED, RISK_LEVEL, POTENTIAL_CAUSES, RATIONALE, NEXT_ACTION) MUST ALWAYS BE ENGLISH.

## TRIAGE STRATEGY:
- RED FLAGS (Chest pain, breathing difficulty, severe bleeding, confusion) -> STOP ASKING. RISK_LEVEL: RED.
- If no red flags and fewer than 3 questions asked -> ASK ONE FOLLOW-UP QUESTION.
- If 5 or more questions asked -> GIVE FINAL VERDICT. Do not ask further questions.

## OUTPUT FORMAT:
---
Patient Input: <Summary>
QUESTION_ASKED: <Question or 'None'>
RISK_LEVEL: <RED/YELLOW/GREEN>
POTENTIAL_CAUSES: <Causes split by commas>
RATIONALE: <Explanation>
NEXT_ACTION: <Instruction>
---

## PATIENT CONTEXT:
Age: {age}
Gender: {gender}
Questions already asked: {questions_asked}

## CONVERSATION SO FAR:
{transcript}"#,
        age = request.age,
        gender = request.gender,
        questions_asked = summary.questions_asked,
        transcript = summary.transcript,
    )
}

/// System instruction followed by the latest symptom text.
pub fn build_completion_request(
    request: &TriageRequest,
    summary: &ConversationSummary,
    temperature: f32,
    max_tokens: u32
) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ChatMessage::system(build_system_prompt(request, summary)),
            ChatMessage::user(request.symptoms.clone())
        ],
        temperature,
        max_tokens,
    }
}
