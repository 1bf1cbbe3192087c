//! End-to-end session behaviour with the real tokenizer and a scripted service.

use std::sync::Mutex;

use gpt_chat::response::{WireChoice, WireMessage, WireUsage};
use gpt_chat::{
    CallParams, ChatError, CompletionGateway, CompletionRequest, FinishReason, GatewayError,
    Message, ModelIdentity, Role, Session, Tail, TiktokenOracle, TokenAccountant, WireResponse,
};

/// Replies with correctly accounted usage, skewed by the configured deltas.
struct FakeService {
    reply: String,
    model: Mutex<String>,
    prompt_skew: i64,
    completion_skew: i64,
    fail: Mutex<bool>,
    accountant: TokenAccountant,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeService {
    fn new(reply: &str, model: &str) -> Self {
        Self {
            reply: reply.to_string(),
            model: Mutex::new(model.to_string()),
            prompt_skew: 0,
            completion_skew: 0,
            fail: Mutex::new(false),
            accountant: TokenAccountant::new(TiktokenOracle::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn skewed(mut self, prompt: i64, completion: i64) -> Self {
        self.prompt_skew = prompt;
        self.completion_skew = completion;
        self
    }

    fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    fn set_model(&self, model: &str) {
        *self.model.lock().unwrap() = model.to_string();
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionGateway for FakeService {
    fn complete(&self, request: &CompletionRequest) -> Result<WireResponse, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if *self.fail.lock().unwrap() {
            return Err(GatewayError::Network("connection reset".into()));
        }

        let model = ModelIdentity::parse(&request.model).unwrap();
        let reply = Message::assistant(self.reply.clone());
        let prompt = self
            .accountant
            .prompt_tokens(&request.messages, &model)
            .unwrap() as i64
            + self.prompt_skew;
        let completion = self
            .accountant
            .completion_tokens(
                &[gpt_chat::Choice {
                    finish_reason: FinishReason::Stop,
                    message: reply.clone(),
                }],
                &model,
            )
            .unwrap() as i64
            + self.completion_skew;

        Ok(WireResponse {
            choices: vec![WireChoice {
                finish_reason: Some(FinishReason::Stop),
                message: WireMessage {
                    role: Role::Assistant,
                    content: Some(reply.content().to_string()),
                },
            }],
            created: 1_700_000_000,
            model: self.model.lock().unwrap().clone(),
            usage: WireUsage {
                prompt_tokens: prompt as u64,
                completion_tokens: completion as u64,
                total_tokens: (prompt + completion) as u64,
            },
        })
    }
}

fn session(service: FakeService) -> Session<FakeService> {
    Session::new(
        "You are helpful",
        "gpt-4",
        CallParams::new(),
        service,
        TiktokenOracle::new(),
    )
    .unwrap()
}

#[test]
fn hello_round_trip() {
    let mut s = session(FakeService::new("Hi! How can I help?", "gpt-4-0613"));

    let reply = s.send("Hello", &CallParams::new()).unwrap();
    assert_eq!(reply, "Hi! How can I help?");

    let requests = s.gateway().requests();
    assert_eq!(
        requests[0].messages,
        vec![Message::system("You are helpful"), Message::user("Hello")]
    );
    assert_eq!(requests[0].model, "gpt-4");
    assert_eq!(
        s.conversation().messages(),
        &[
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi! How can I help?"),
        ]
    );
    assert_eq!(s.latest_response().unwrap().usage().prompt_tokens, 15);
    assert_eq!(s.model().canonical(), "gpt-4-0613");
}

#[test]
fn skewed_usage_is_fatal() {
    for (prompt, completion) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
        let mut s = session(FakeService::new("Sure thing.", "gpt-4").skewed(prompt, completion));
        let err = s.send("Hello", &CallParams::new()).unwrap_err();
        assert!(
            matches!(err, ChatError::TokenMismatch { .. }),
            "skew ({prompt}, {completion}) gave {err}"
        );
        assert!(s.is_poisoned());
    }
}

#[test]
fn failed_sends_leave_log_unchanged() {
    let mut s = session(FakeService::new("ok", "gpt-4-0613"));
    s.send("first", &CallParams::new()).unwrap();

    s.gateway().set_failing(true);
    for content in ["", "second", "a much longer message with many words"] {
        let before = s.conversation().clone();
        let err = s.send(content, &CallParams::new()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(s.conversation(), &before);
    }

    s.gateway().set_failing(false);
    assert_eq!(s.send("second", &CallParams::new()).unwrap(), "ok");
    assert_eq!(s.conversation().len(), 5);
}

#[test]
fn version_drift_after_pinning_is_fatal() {
    let mut s = session(FakeService::new("ok", "gpt-4-0613"));
    s.send("Hello", &CallParams::new()).unwrap();

    s.gateway().set_model("gpt-4-0314");
    let err = s.send("Hello again", &CallParams::new()).unwrap_err();
    assert!(matches!(err, ChatError::ModelMismatch { .. }));
    assert!(err.is_fatal());
    assert_eq!(s.gateway().requests()[1].model, "gpt-4-0613");
}

#[test]
fn resend_edits_last_turn() {
    let mut s = session(FakeService::new("ok", "gpt-4"));
    s.send("a", &CallParams::new()).unwrap();
    s.resend(Some("c".into())).unwrap();

    let messages = s.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1], Message::user("c"));
    assert_eq!(s.conversation().tail(), Tail::Clean);

    let last_request = s.gateway().requests().pop().unwrap();
    assert_eq!(
        last_request.messages,
        vec![Message::system("You are helpful"), Message::user("c")]
    );
}
