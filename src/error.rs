use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirbulkError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Graph API error: {0}")]
    GraphApiError(String),

    #[error("Input file not found: {}", .0.display())]
    InputFileNotFound(PathBuf),

    #[error("Input file {} is missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Interactive prompt error: {0}")]
    DialoguerError(#[from] dialoguer::Error),

    /// The attribute cannot be written through the backend the row would use
    #[error("Cannot update {attribute} of {account}: {reason}")]
    UnsupportedWrite {
        attribute: String,
        account: String,
        reason: String,
    },

    /// The decision prompt failed part way through a run
    #[error("Run interrupted: {0}")]
    Interrupted(String),

    #[error("Token not found. Please run 'dirbulk login' first")]
    TokenNotFound,

    #[error("Tenant '{0}' not found")]
    TenantNotFound(String),
}

pub type Result<T> = std::result::Result<T, DirbulkError>;

pub use DirbulkError as Error;

/// Parse a Graph API error body into `code: message` with an operator hint
pub fn enhance_graph_error(error_response: &str) -> String {
    let Ok(error_json) = serde_json::from_str::<serde_json::Value>(error_response) else {
        return error_response.to_string();
    };
    let Some(error_obj) = error_json.get("error") else {
        return error_response.to_string();
    };

    let code = error_obj
        .get("code")
        .and_then(|c| c.as_str())
        .unwrap_or("Unknown");
    let message = error_obj
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("No message");

    let hint = match code {
        "Unauthorized" | "InvalidAuthenticationToken" => {
            "\n  Hint: your token may have expired. Run 'dirbulk login' again."
        }
        "Forbidden" | "Authorization_RequestDenied" | "InsufficientPrivileges" => {
            "\n  Hint: the app registration needs User.ReadWrite.All \
             (and MailboxSettings.Read for rules) with admin consent."
        }
        "Request_BadRequest" | "BadRequest" => {
            if message.contains("already exists") || message.contains("conflicting object") {
                "\n  Hint: another object already uses this value."
            } else if message.contains("domain") {
                "\n  Hint: the domain must be a verified domain of the tenant."
            } else {
                ""
            }
        }
        "Request_ResourceNotFound" | "ResourceNotFound" | "ErrorItemNotFound" => {
            "\n  Hint: the object does not exist. Check the identifier."
        }
        "TooManyRequests" => "\n  Hint: rate limit exceeded. Wait a moment and try again.",
        _ => "",
    };

    format!("{}: {}{}", code, message, hint)
}
