//! Maps upstream failures to the messages shown in place of an intro.

use serde::Serialize;

use crate::llm_client::UpstreamError;

pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "O modelo de IA está indisponível ou a chave de API é inválida. Verifique a configuração e tente novamente.";
pub const CREDENTIAL_REJECTED_MESSAGE: &str =
    "A chave de API foi rejeitada pelo serviço de IA. Verifique suas credenciais.";

const NOT_FOUND_TOKENS: &[&str] = &["404", "NOT_FOUND"];
const FORBIDDEN_TOKENS: &[&str] = &["403", "PERMISSION_DENIED"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ModelUnavailable,
    CredentialRejected,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Classifies on the error's message text. Network and timeout failures fall
/// through to `Generic`.
pub fn classify(error: &UpstreamError) -> ClassifiedError {
    classify_message(&error.to_string())
}

pub fn classify_message(raw: &str) -> ClassifiedError {
    let contains_any = |tokens: &[&str]| tokens.iter().any(|t| raw.contains(t));

    if contains_any(NOT_FOUND_TOKENS) {
        ClassifiedError {
            kind: ErrorKind::ModelUnavailable,
            message: MODEL_UNAVAILABLE_MESSAGE.to_string(),
        }
    } else if contains_any(FORBIDDEN_TOKENS) {
        ClassifiedError {
            kind: ErrorKind::CredentialRejected,
            message: CREDENTIAL_REJECTED_MESSAGE.to_string(),
        }
    } else {
        ClassifiedError {
            kind: ErrorKind::Generic,
            message: format!("Desculpe, ocorreu um erro: {raw}"),
        }
    }
}
