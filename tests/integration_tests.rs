//! Integration tests driving the real webhook client against a mock server.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{Value, json};
    use url::Url;
    use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use voicehook::chat::{ChatSession, EMPTY_REPLY_TEXT, Renderer, SEND_FAILURE_TEXT};
    use voicehook::{AudioClip, AudioPlayer, Message, MessageRole, Result, SessionId, Webhook};

    #[derive(Default)]
    struct CollectingRenderer {
        appended: Vec<Message>,
    }

    impl Renderer for CollectingRenderer {
        fn message_appended(&mut self, message: &Message) {
            self.appended.push(message.clone());
        }

        fn audio_started(&mut self, _: &AudioClip) {}

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, _: &str) {}
    }

    #[derive(Clone, Default)]
    struct RecordingPlayer {
        clips: Arc<Mutex<Vec<AudioClip>>>,
    }

    impl AudioPlayer for RecordingPlayer {
        fn play(&self, clip: AudioClip) -> Result<()> {
            self.clips.lock().unwrap().push(clip);
            Ok(())
        }
    }

    fn session_for(server: &MockServer) -> (ChatSession<Webhook>, RecordingPlayer) {
        let url = Url::parse(&format!("{}/webhook/chat", server.uri())).unwrap();
        let player = RecordingPlayer::default();
        let session = ChatSession::with_session_id(
            Webhook::new(url).unwrap(),
            Box::new(player.clone()),
            SessionId::new("session-test123"),
        );
        (session, player)
    }

    #[tokio::test]
    async fn text_turn_posts_json_and_appends_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "sessionId": "session-test123",
                "chatInput": "hello",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "hi"})))
            .expect(1)
            .mount(&server)
            .await;

        let (mut session, player) = session_for(&server);
        let mut renderer = CollectingRenderer::default();
        let outcome = session.send_text("hello", &mut renderer).await;

        assert!(outcome.is_replied(), "unexpected outcome: {outcome:?}");
        assert_eq!(
            renderer.appended,
            vec![Message::user("hello"), Message::bot("hi")]
        );
        assert!(player.clips.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn voice_turn_posts_multipart_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .and(body_string_contains("name=\"audioData\""))
            .and(body_string_contains("name=\"sessionId\""))
            .and(body_string_contains("session-test123"))
            .and(body_string_contains("audio/webm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "got it"})))
            .expect(1)
            .mount(&server)
            .await;

        let (mut session, _) = session_for(&server);
        let mut renderer = CollectingRenderer::default();
        let clip = AudioClip::new(b"fake-webm-bytes".to_vec(), "audio/webm");
        let outcome = session.send_voice(clip, &mut renderer).await;

        assert!(outcome.is_replied(), "unexpected outcome: {outcome:?}");
        assert_eq!(renderer.appended.len(), 2);
        assert_eq!(renderer.appended[1], Message::bot("got it"));
    }

    #[tokio::test]
    async fn audio_reply_is_decoded_and_played() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"audioData": "SUQzBAA="})),
            )
            .mount(&server)
            .await;

        let (mut session, player) = session_for(&server);
        let mut renderer = CollectingRenderer::default();
        session.send_text("talk to me", &mut renderer).await;

        assert_eq!(renderer.appended, vec![Message::user("talk to me")]);
        let clips = player.clips.lock().unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].data().as_ref(), b"ID3\x04\x00");
        assert_eq!(clips[0].mime_type(), "audio/mpeg");
    }

    #[tokio::test]
    async fn empty_object_reply_gets_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (mut session, _) = session_for(&server);
        let mut renderer = CollectingRenderer::default();
        session.send_text("hello", &mut renderer).await;

        assert_eq!(renderer.appended[1], Message::bot(EMPTY_REPLY_TEXT));
        assert_eq!(session.stats().empty_replies, 1);
    }

    #[tokio::test]
    async fn server_error_gets_failure_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("workflow crashed"))
            .mount(&server)
            .await;

        let (mut session, _) = session_for(&server);
        let mut renderer = CollectingRenderer::default();
        let outcome = session.send_text("hello", &mut renderer).await;

        match outcome {
            voicehook::chat::TurnOutcome::Failed(err) => {
                assert_eq!(err.status_code(), Some(500));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(renderer.appended[1], Message::bot(SEND_FAILURE_TEXT));
    }

    #[tokio::test]
    async fn non_json_reply_gets_failure_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let (mut session, _) = session_for(&server);
        let mut renderer = CollectingRenderer::default();
        let outcome = session.send_text("hello", &mut renderer).await;

        assert!(outcome.is_failed());
        assert_eq!(
            session.conversation().last().map(Message::role),
            Some(MessageRole::Bot)
        );
        assert_eq!(
            session.conversation().last().map(Message::text),
            Some(SEND_FAILURE_TEXT)
        );
    }

    #[tokio::test]
    async fn unreachable_webhook_keeps_session_usable() {
        // Nothing listens on a port we just released.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let dead_url = Url::parse(&format!("http://127.0.0.1:{port}/webhook/chat")).unwrap();

        let mut session = ChatSession::new(
            Webhook::new(dead_url).unwrap(),
            Box::new(RecordingPlayer::default()),
        );
        let mut renderer = CollectingRenderer::default();
        let outcome = session.send_text("anyone there?", &mut renderer).await;
        assert!(outcome.is_failed());
        assert_eq!(session.message_count(), 2);
        assert_eq!(renderer.appended[1], Message::bot(SEND_FAILURE_TEXT));

        // Another turn on the same session is still attempted.
        let outcome = session.send_text("still there?", &mut renderer).await;
        assert!(outcome.is_failed());
        assert_eq!(session.message_count(), 4);
    }

    #[tokio::test]
    async fn session_id_is_shared_by_all_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "ok"})))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/webhook/chat", server.uri())).unwrap();
        let mut session = ChatSession::new(
            Webhook::new(url).unwrap(),
            Box::new(RecordingPlayer::default()),
        );
        let mut renderer = CollectingRenderer::default();
        for input in ["one", "two", "three"] {
            session.send_text(input, &mut renderer).await;
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        for request in requests {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["sessionId"], session.session_id().as_str());
        }
    }
}
