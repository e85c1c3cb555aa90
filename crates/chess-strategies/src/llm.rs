//! Language-model move strategy over an OpenAI-compatible chat endpoint.

use std::time::Duration;

use chess_session::{MoveRequest, Proposal, Strategy, StrategyError};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::config::LlmSettings;

const SYSTEM_PROMPT: &str = "You are a chess engine. Reply with a single JSON object \
of the form {\"move\": \"<move in UCI notation>\", \"comment\": \"<one sentence>\"} \
and nothing else.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Asks a chat model for the next move.
pub struct LlmAgent {
    profile: String,
    settings: LlmSettings,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl LlmAgent {
    /// Creates an agent; the API key is read from the environment variable
    /// named in the settings.
    pub fn new(profile: impl Into<String>, settings: LlmSettings) -> Result<Self, StrategyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| StrategyError::Unavailable(format!("HTTP client: {e}")))?;
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());
        Ok(LlmAgent {
            profile: profile.into(),
            settings,
            api_key,
            client,
        })
    }

    /// The user prompt for one move.
    pub fn prompt(request: &MoveRequest<'_>) -> String {
        let legal: Vec<String> = request.legal_moves.iter().map(|m| m.to_string()).collect();
        format!(
            "You are a chess expert, the current board's Forsyth–Edwards notation (FEN) is {}, \
             and it's {}'s turn. Possible next moves are: {}. \
             Please make next move based on current board position.",
            request.position.fen(),
            request.side,
            legal.join(", ")
        )
    }

    fn complete(&self, prompt: &str) -> Result<String, StrategyError> {
        let body = json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let mut http = self.client.post(&self.settings.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        debug!(endpoint = %self.settings.endpoint, "sending chat completion request");
        let response = http.send().map_err(|e| {
            error!(error = ?e, "chat completion request failed");
            StrategyError::Unavailable(format!("request failed: {e}"))
        })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| StrategyError::Unavailable(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            error!(%status, response = %text, "chat completion API error");
            return Err(StrategyError::Unavailable(format!("API error {status}: {text}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| StrategyError::BadReply(format!("unexpected response body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StrategyError::BadReply("response has no message content".into()))
    }
}

/// Reads `{"move": ..., "comment": ...}` out of a model reply.
///
/// Models often wrap the object in prose or a code fence, so the outermost
/// braces are located first.
pub fn parse_reply(content: &str) -> Result<Proposal, StrategyError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let object = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(StrategyError::BadReply(format!(
                "no JSON object in reply: {content}"
            )))
        }
    };
    let proposal: Proposal = serde_json::from_str(object)
        .map_err(|e| StrategyError::BadReply(format!("invalid move object: {e}")))?;
    Ok(Proposal {
        notation: proposal.notation.trim().to_string(),
        comment: proposal.comment.trim().to_string(),
    })
}

impl Strategy for LlmAgent {
    fn name(&self) -> &str {
        &self.profile
    }

    #[instrument(skip(self, request), fields(profile = %self.profile, model = %self.settings.model))]
    fn propose(&mut self, request: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
        let content = self.complete(&Self::prompt(request))?;
        let proposal = parse_reply(&content)?;
        info!(mv = %proposal.notation, "model proposed move");
        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::{Position, RuleEngine, Side, StandardRules};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one canned HTTP response and returns the request it received.
    fn serve_once(status: &'static str, body: String) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (url, handle)
    }

    fn settings(endpoint: String) -> LlmSettings {
        LlmSettings {
            endpoint,
            api_key_env: "CHESS_STRATEGIES_TEST_NO_KEY".to_string(),
            timeout_secs: 5,
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_prompt_lists_position_and_moves() {
        let start = Position::starting();
        let legal = vec!["e2e4".parse().unwrap(), "d2d4".parse().unwrap()];
        let prompt = LlmAgent::prompt(&MoveRequest {
            position: &start,
            side: Side::White,
            legal_moves: &legal,
        });
        assert!(prompt.contains(Position::STARTING_FEN));
        assert!(prompt.contains("it's white's turn"));
        assert!(prompt.contains("Possible next moves are: e2e4, d2d4."));
    }

    #[test]
    fn test_parse_reply_variants() {
        let plain = parse_reply(r#"{"move": "e2e4", "comment": "Control the center."}"#).unwrap();
        assert_eq!(plain, Proposal::new("e2e4", "Control the center."));

        let fenced =
            parse_reply("Sure!\n```json\n{\"move\": \" g1f3 \"}\n```").unwrap();
        assert_eq!(fenced, Proposal::new("g1f3", ""));

        assert!(matches!(
            parse_reply("I resign."),
            Err(StrategyError::BadReply(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"comment": "no move"}"#),
            Err(StrategyError::BadReply(_))
        ));
    }

    #[test]
    fn test_propose_against_local_endpoint() {
        let reply = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"move\": \"e2e4\", \"comment\": \"King's pawn.\"}"
                }
            }]
        })
        .to_string();
        let (url, server) = serve_once("200 OK", reply);

        let rules = StandardRules;
        let start = Position::starting();
        let legal = rules.legal_moves(&start).unwrap();
        let mut agent = LlmAgent::new("gpt", settings(url)).unwrap();
        let proposal = agent
            .propose(&MoveRequest {
                position: &start,
                side: Side::White,
                legal_moves: &legal,
            })
            .unwrap();
        assert_eq!(proposal, Proposal::new("e2e4", "King's pawn."));

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.contains("\"model\":\"gpt-4o-mini\""));
        assert!(!request.to_ascii_lowercase().contains("authorization"));
    }

    #[test]
    fn test_api_error_is_unavailable() {
        let (url, server) = serve_once("500 Internal Server Error", "{}".to_string());
        let start = Position::starting();
        let mut agent = LlmAgent::new("gpt", settings(url)).unwrap();
        let err = agent
            .propose(&MoveRequest {
                position: &start,
                side: Side::White,
                legal_moves: &[],
            })
            .unwrap_err();
        assert!(matches!(err, StrategyError::Unavailable(_)));
        server.join().unwrap();
    }
}
