use futures::channel::mpsc;
use futures::stream;
use grocery_assistant::api_connection::ApiConnectionError;
use grocery_assistant::chat_model::{ChatModel, HistoryTurn, ModelRequest, ModelRole, TextStream};
use grocery_assistant::conversation::{
    ChatMessage, Conversation, ConversationState, IgnoredReason, SendOutcome, APOLOGY_MESSAGE,
};
use std::collections::VecDeque;
use std::sync::Mutex;

type Delta = Result<String, ApiConnectionError>;

enum Script {
    Reply(Vec<Delta>),
    OpenError(ApiConnectionError),
    Channel(mpsc::UnboundedReceiver<Delta>),
}

/// Plays back one scripted reply per call and records what it was asked.
struct ScriptedModel {
    script: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ChatModel for ScriptedModel {
    async fn stream_chat(&self, request: ModelRequest) -> Result<TextStream, ApiConnectionError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next.expect("no scripted reply left") {
            Script::Reply(items) => Ok(Box::pin(stream::iter(items)) as TextStream),
            Script::OpenError(e) => Err(e),
            Script::Channel(rx) => Ok(Box::pin(rx) as TextStream),
        }
    }
}

fn deltas(parts: &[&str]) -> Vec<Delta> {
    parts.iter().map(|p| Ok(p.to_string())).collect()
}

fn stream_error(message: &str) -> ApiConnectionError {
    ApiConnectionError::StreamError(message.to_string())
}

#[tokio::test]
async fn test_reply_streams_into_transcript() {
    let conversation = Conversation::new(
        ScriptedModel::new(vec![Script::Reply(deltas(&["Try ", "", "the tacos!"]))]),
        "You are helpful.",
    );

    let mut seen = Vec::new();
    let outcome = conversation
        .send("  What's for dinner?  ", |delta| seen.push(delta.to_string()))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SendOutcome::Completed {
            reply: "Try the tacos!".to_string()
        }
    );
    assert_eq!(seen, vec!["Try ", "the tacos!"]);
    assert_eq!(
        conversation.transcript(),
        vec![
            ChatMessage::user("What's for dinner?"),
            ChatMessage::assistant("Try the tacos!"),
        ]
    );
    assert_eq!(conversation.state(), ConversationState::Idle);
    assert_eq!(conversation.last_assistant_text().as_deref(), Some("Try the tacos!"));
}

#[tokio::test]
async fn test_history_is_sent_with_each_turn() {
    let model = ScriptedModel::new(vec![
        Script::Reply(deltas(&["Hi there!"])),
        Script::Reply(deltas(&["Sure."])),
    ]);
    let conversation = Conversation::new(model, "Be brief.");

    conversation.send("hello", |_| {}).await.unwrap();
    conversation.send("next", |_| {}).await.unwrap();

    let transcript = conversation.transcript();
    assert_eq!(transcript.len(), 4);
    assert_eq!(conversation.system_instruction(), "Be brief.");

    let history: Vec<HistoryTurn> = transcript[..2].iter().map(HistoryTurn::from).collect();
    assert_eq!(
        history,
        vec![
            HistoryTurn {
                role: ModelRole::User,
                text: "hello".to_string()
            },
            HistoryTurn {
                role: ModelRole::Model,
                text: "Hi there!".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_model_receives_prior_turns_only() {
    let model = ScriptedModel::new(vec![
        Script::Reply(deltas(&["Hi there!"])),
        Script::Reply(deltas(&["Sure."])),
    ]);
    let conversation = Conversation::new(&model, "Be brief.");

    conversation.send("hello", |_| {}).await.unwrap();
    conversation.send("next", |_| {}).await.unwrap();

    let requests = model.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[0].user_text, "hello");
    assert_eq!(requests[1].system_instruction, "Be brief.");
    assert_eq!(requests[1].user_text, "next");
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[1].role, ModelRole::Model);
    assert_eq!(requests[1].history[1].text, "Hi there!");
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let model = ScriptedModel::new(Vec::new());
    let conversation = Conversation::new(&model, "");

    let outcome = conversation.send("   \n", |_| {}).await.unwrap();

    assert_eq!(outcome, SendOutcome::Ignored(IgnoredReason::EmptyInput));
    assert!(conversation.transcript().is_empty());
    assert!(model.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_send_while_streaming_is_ignored() {
    let (tx, rx) = mpsc::unbounded();
    let model = ScriptedModel::new(vec![Script::Channel(rx)]);
    let conversation = Conversation::new(&model, "");

    let mut seen = Vec::new();
    let first = conversation.send("first", |delta| seen.push(delta.to_string()));
    let second = async {
        while conversation.state() != ConversationState::Streaming {
            tokio::task::yield_now().await;
        }
        tx.unbounded_send(Ok("Hel".to_string())).unwrap();
        assert!(conversation.is_sending());

        let before = conversation.transcript();
        let outcome = conversation.send("second", |_| {}).await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(IgnoredReason::Busy));
        assert_eq!(conversation.transcript(), before);

        tx.unbounded_send(Ok("lo".to_string())).unwrap();
        tx.close_channel();
    };

    let (first, ()) = tokio::join!(first, second);

    assert_eq!(
        first.unwrap(),
        SendOutcome::Completed {
            reply: "Hello".to_string()
        }
    );
    assert_eq!(seen, vec!["Hel", "lo"]);
    assert_eq!(
        conversation.transcript(),
        vec![ChatMessage::user("first"), ChatMessage::assistant("Hello")]
    );
    assert_eq!(model.requests.lock().unwrap().len(), 1);
    assert!(!conversation.is_sending());
}

#[tokio::test]
async fn test_failure_before_first_delta_replaces_placeholder() {
    let model = ScriptedModel::new(vec![
        Script::Reply(vec![Err(stream_error("upstream overloaded"))]),
        Script::Reply(deltas(&["Back again."])),
    ]);
    let conversation = Conversation::new(&model, "");

    let result = conversation.send("hi", |_| {}).await;
    assert!(matches!(result, Err(ApiConnectionError::StreamError(_))));
    assert_eq!(
        conversation.transcript(),
        vec![ChatMessage::user("hi"), ChatMessage::assistant(APOLOGY_MESSAGE)]
    );
    assert_eq!(conversation.state(), ConversationState::Idle);

    // The guard is released, so the next send goes through.
    let outcome = conversation.send("hi again", |_| {}).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Completed {
            reply: "Back again.".to_string()
        }
    );
    assert_eq!(conversation.transcript().len(), 4);
}

#[tokio::test]
async fn test_failure_mid_stream_keeps_partial_reply() {
    let mut items = deltas(&["Here is a rec"]);
    items.push(Err(stream_error("connection reset")));
    let conversation = Conversation::new(ScriptedModel::new(vec![Script::Reply(items)]), "");

    let result = conversation.send("recipe please", |_| {}).await;

    assert!(result.is_err());
    assert_eq!(
        conversation.transcript(),
        vec![
            ChatMessage::user("recipe please"),
            ChatMessage::assistant("Here is a rec"),
            ChatMessage::assistant(APOLOGY_MESSAGE),
        ]
    );
    assert!(!conversation.is_sending());
}

#[tokio::test]
async fn test_failure_to_open_appends_apology() {
    let conversation = Conversation::new(
        ScriptedModel::new(vec![Script::OpenError(ApiConnectionError::MissingApiKey(
            "OPENROUTER_API_KEY".to_string(),
        ))]),
        "",
    );

    let result = conversation.send("hello", |_| {}).await;

    assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    assert_eq!(
        conversation.transcript(),
        vec![ChatMessage::user("hello"), ChatMessage::assistant(APOLOGY_MESSAGE)]
    );
    assert_eq!(conversation.state(), ConversationState::Idle);
}

#[tokio::test]
async fn test_dropped_send_releases_guard() {
    let (tx, rx) = mpsc::unbounded::<Delta>();
    let conversation = Conversation::new(ScriptedModel::new(vec![Script::Channel(rx)]), "");

    {
        let send = conversation.send("hello", |_| {});
        futures::pin_mut!(send);
        assert!(futures::poll!(send.as_mut()).is_pending());
        assert_eq!(conversation.state(), ConversationState::Streaming);
        assert!(!conversation.reset());
    }

    assert_eq!(conversation.state(), ConversationState::Idle);
    assert!(conversation.reset());
    assert!(conversation.transcript().is_empty());
    drop(tx);
}
