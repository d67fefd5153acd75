use std::fmt;

pub const DEFAULT_FINAL_MESSAGE: &str = "Loading game...";

/// Progress report of one handshake step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeEvent {
    pub is_final_step: bool,
    pub succeeded: bool,
    pub message: String,
    pub payload: Option<String>,
}

impl HandshakeEvent {
    pub fn version_detected(version: &str) -> Self {
        Self {
            is_final_step: false,
            succeeded: true,
            message: format!("Stephino RPG v.{version} detected"),
            payload: Some(version.to_string()),
        }
    }

    pub fn authenticated(succeeded: bool, message: Option<String>, payload: Option<String>) -> Self {
        Self {
            is_final_step: true,
            succeeded,
            message: message.unwrap_or_else(|| DEFAULT_FINAL_MESSAGE.to_string()),
            payload: if succeeded { payload } else { None },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Idle,
    Validating,
    ProbingVersion,
    ExchangingCredentials,
    Succeeded,
    Failed,
}

impl HandshakePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakePhase::Succeeded | HandshakePhase::Failed)
    }

    /// Whether `next` is a legal successor. Any live phase may fail.
    pub fn can_advance_to(self, next: HandshakePhase) -> bool {
        use HandshakePhase::*;
        match (self, next) {
            (Idle, Validating)
            | (Validating, ProbingVersion)
            | (ProbingVersion, ExchangingCredentials)
            | (ExchangingCredentials, Succeeded) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HandshakePhase::Idle => "idle",
            HandshakePhase::Validating => "validating",
            HandshakePhase::ProbingVersion => "probing_version",
            HandshakePhase::ExchangingCredentials => "exchanging_credentials",
            HandshakePhase::Succeeded => "succeeded",
            HandshakePhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Outbound signal from the core to whatever renders the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    Phase(HandshakePhase),
    Handshake(HandshakeEvent),
    Error(String),
}
