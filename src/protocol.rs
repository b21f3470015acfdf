//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Session views never carry the correct answer of the step being asked.

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsEvent;
use crate::domain::{BridgeKeywords, Briefing, DomainOption, Mission, MissionSource, StepRole};
use crate::session::{AnswerOutcome, AnswerRecord, Phase, Session};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListDomains,
    ResolveMission {
        familiar: String,
        complex: String,
        goal: String,
    },
    CreateSession,
    GetSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    SelectDomains {
        #[serde(rename = "sessionId")]
        session_id: String,
        familiar: String,
        complex: String,
        goal: String,
    },
    StartMission {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    OpenMap {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    EnterModule {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    StartQuestions {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    SubmitAnswer {
        #[serde(rename = "sessionId")]
        session_id: String,
        answer: String,
    },
    AdvanceModule {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Reset {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    SubmitFeedback(FeedbackIn),
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Domains(DomainsOut),
    Mission(MissionOut),
    Session {
        session: SessionView,
    },
    AnswerResult(AnswerOut),
    FeedbackResult(FeedbackOut),
    Error {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct DomainsOut {
    pub familiar: Vec<DomainOption>,
    pub complex: Vec<DomainOption>,
}

/// Direct mission resolution result (full content, answers included).
#[derive(Debug, Serialize)]
pub struct MissionOut {
    pub key: String,
    pub source: MissionSource,
    pub mission: Mission,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOut {
    pub id: String,
    pub concept_name: String,
    pub bridge_keywords: BridgeKeywords,
}

/// The step being asked, minus its answer and explanation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOut {
    pub question_id: String,
    pub role: StepRole,
    pub question: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub phase: Phase,
    pub familiar: Option<DomainOption>,
    pub complex: Option<DomainOption>,
    pub goal: String,
    pub briefing: Option<Briefing>,
    pub module_index: usize,
    pub module_count: usize,
    pub current_module: Option<ModuleOut>,
    pub current_step: Option<StepOut>,
    /// Present only while in the Synthesis phase.
    pub synthesis: Option<String>,
    pub score: u32,
    pub history: Vec<AnswerRecord>,
}

/// Convert a session (internal) to the public view.
pub fn session_view(s: &Session) -> SessionView {
    let mission = s.mission();
    let current_step = match (s.current_step(), s.current_question_id(), s.phase().role()) {
        (Some(step), Some(question_id), Some(role)) => Some(StepOut {
            question_id,
            role,
            question: step.question.clone(),
            options: step.options.clone(),
            tip: step.tip.clone(),
            image_url: step.image_url.clone(),
        }),
        _ => None,
    };
    let synthesis = match s.phase() {
        Phase::Synthesis => s.current_module().map(|m| m.synthesis.clone()),
        _ => None,
    };
    SessionView {
        id: s.id.clone(),
        phase: s.phase(),
        familiar: s.familiar().cloned(),
        complex: s.complex().cloned(),
        goal: s.goal().to_string(),
        briefing: mission.map(|m| m.briefing.clone()),
        module_index: s.module_index(),
        module_count: mission.map(|m| m.modules.len()).unwrap_or(0),
        current_module: s.current_module().map(|m| ModuleOut {
            id: m.id.clone(),
            concept_name: m.concept_name.clone(),
            bridge_keywords: m.bridge_keywords.clone(),
        }),
        current_step,
        synthesis,
        score: s.score(),
        history: s.history().to_vec(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct MissionQuery {
    pub familiar: String,
    pub complex: String,
    pub goal: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectIn {
    pub familiar: String,
    pub complex: String,
    pub goal: String,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOut {
    pub question_id: String,
    pub correct: bool,
    pub expected: String,
    pub explanation: String,
    pub next_phase: Phase,
    pub score: u32,
}

impl AnswerOut {
    pub fn from_outcome(o: AnswerOutcome, score: u32) -> Self {
        Self {
            question_id: o.question_id,
            correct: o.is_correct,
            expected: o.correct_answer,
            explanation: o.explanation,
            next_phase: o.next,
            score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedbackIn {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
}

/// `synced` is false when the shared store is unconfigured or rejected the write.
#[derive(Debug, Serialize)]
pub struct FeedbackOut {
    pub synced: bool,
}

#[derive(Serialize)]
pub struct AnalyticsOut {
    pub events: Vec<AnalyticsEvent>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: bool,
    pub curated_missions: usize,
}
