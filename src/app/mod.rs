//! One clipboard → completion → clipboard session, start to finish.

use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

use crate::chat::{ChatClient, Credentials};
use crate::cli::Cli;
use crate::clipboard::ClipboardPort;
use crate::config::{EffectiveConfig, resolve_config};
use crate::error::{Error, Result};
use crate::session::SessionRecord;
use crate::storage::SessionLogger;
use crate::utils::env::Environment;
use crate::utils::paths::get_log_dir;

/// Everything settled before the clipboard is touched.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub config: EffectiveConfig,
    pub credentials: Credentials,
    pub config_path: PathBuf,
}

impl Prepared {
    pub fn logger(&self) -> Option<SessionLogger> {
        self.config
            .log_enabled
            .then(|| SessionLogger::new(get_log_dir(&self.config_path)))
    }
}

/// How a session ended when the chat exchange itself succeeded.
#[derive(Debug)]
pub struct SessionOutcome {
    pub reply: String,
    /// Set when the reply could not be put on the clipboard
    pub clipboard_error: Option<Error>,
    pub log_path: Option<PathBuf>,
    /// Set when logging was enabled but the append failed
    pub log_error: Option<Error>,
}

impl SessionOutcome {
    pub fn copied(&self) -> bool {
        self.clipboard_error.is_none()
    }
}

/// Resolve configuration and credentials.
pub fn prepare(cli: &Cli, env: &Environment) -> Result<Prepared> {
    let config_path = cli.config_path(env)?;
    let config = resolve_config(cli.overrides(), env, &config_path)?;
    let credentials = Credentials::from_env(env)?;

    Ok(Prepared {
        config,
        credentials,
        config_path,
    })
}

/// Run the session with already-built collaborators.
pub async fn run_session<C>(
    config: &EffectiveConfig,
    clipboard: &mut C,
    client: &dyn ChatClient,
    logger: Option<&SessionLogger>,
) -> Result<SessionOutcome>
where
    C: ClipboardPort + ?Sized,
{
    let user_input = clipboard.read()?;
    debug!(chars = user_input.chars().count(), "read clipboard");

    let completion = client
        .complete(
            &config.system_prompt,
            &user_input,
            &config.model,
            config.temperature,
        )
        .await?;
    debug!(
        client = client.name(),
        response_id = %completion.response_id,
        total_tokens = completion.usage.total_tokens,
        "received completion"
    );

    let clipboard_error = clipboard.write(&completion.reply).err();
    if let Some(err) = &clipboard_error {
        debug!(error = %err, "could not copy reply to clipboard");
    }

    let mut log_path = None;
    let mut log_error = None;
    if let Some(logger) = logger.filter(|_| config.log_enabled) {
        let record = SessionRecord::new(Local::now(), config, &user_input, &completion);
        match logger.append(&record, config) {
            Ok(path) => log_path = Some(path),
            Err(err) => {
                debug!(error = %err, "could not write session log");
                log_error = Some(err);
            }
        }
    }

    Ok(SessionOutcome {
        reply: completion.reply,
        clipboard_error,
        log_path,
        log_error,
    })
}

/// Full run: prepare, connect, then run the session.
///
/// `connect` is only called once configuration and credentials are valid,
/// and the clipboard is only read after that.
pub async fn execute<C, F>(
    cli: &Cli,
    env: &Environment,
    clipboard: &mut C,
    connect: F,
) -> Result<SessionOutcome>
where
    C: ClipboardPort + ?Sized,
    F: FnOnce(&Credentials, &EffectiveConfig) -> Box<dyn ChatClient>,
{
    let prepared = prepare(cli, env)?;
    let client = connect(&prepared.credentials, &prepared.config);
    let logger = prepared.logger();

    run_session(&prepared.config, clipboard, client.as_ref(), logger.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{API_KEY_VAR, Completion, Usage};
    use crate::clipboard::MemoryClipboard;
    use crate::config::LogFormat;
    use crate::storage::LogStore;
    use crate::storage::markdown::MarkdownLayout;
    use async_trait::async_trait;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted tracing output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        system_prompt: String,
        user_content: String,
        model: String,
        temperature: f64,
    }

    struct StubClient {
        result: std::result::Result<Completion, (Option<u16>, String)>,
        calls: Mutex<Vec<Call>>,
    }

    impl StubClient {
        fn replying(reply: &str) -> Self {
            Self {
                result: Ok(Completion {
                    reply: reply.to_string(),
                    usage: Usage {
                        prompt_tokens: 5,
                        completion_tokens: 4,
                        total_tokens: 9,
                    },
                    response_id: "chatcmpl-test".to_string(),
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16, message: &str) -> Self {
            Self {
                result: Err((Some(status), message.to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for StubClient {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn complete(
            &self,
            system_prompt: &str,
            user_content: &str,
            model: &str,
            temperature: f64,
        ) -> Result<Completion> {
            self.calls.lock().unwrap().push(Call {
                system_prompt: system_prompt.to_string(),
                user_content: user_content.to_string(),
                model: model.to_string(),
                temperature,
            });
            match &self.result {
                Ok(completion) => Ok(completion.clone()),
                Err((status, message)) => Err(Error::chat(*status, message.clone())),
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        env: Environment,
    }

    impl Fixture {
        fn new(config_json: &str) -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("config.json"), config_json).unwrap();
            Self {
                dir,
                env: Environment::from_pairs([(API_KEY_VAR, "sk-test")]),
            }
        }

        fn cli(&self, extra: &[&str]) -> Cli {
            let config = self.dir.path().join("config.json");
            let mut args = vec!["gpt-clip".to_string(), "-c".to_string()];
            args.push(config.to_string_lossy().into_owned());
            args.extend(extra.iter().map(|s| s.to_string()));
            Cli::try_parse_from(args).unwrap()
        }

        fn log_path(&self) -> PathBuf {
            self.dir.path().join("gpt-clip.md")
        }
    }

    const SCENARIO_CONFIG: &str = r#"{
        "system_prompt": "You are a helpful assistant.",
        "model": "gpt-test",
        "temperature": 0.7
    }"#;

    fn connect_to(
        stub: StubClient,
    ) -> impl FnOnce(&Credentials, &EffectiveConfig) -> Box<dyn ChatClient> {
        move |_, _| -> Box<dyn ChatClient> { Box::new(stub) }
    }

    fn never_connect(_: &Credentials, _: &EffectiveConfig) -> Box<dyn ChatClient> {
        panic!("client must not be created");
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("Fix this email: hi plz send");

        let outcome = execute(
            &fixture.cli(&[]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::replying("Hi, please send it.")),
        )
        .await
        .unwrap();

        assert_eq!(outcome.reply, "Hi, please send it.");
        assert!(outcome.copied());
        assert!(outcome.log_error.is_none());
        assert_eq!(clipboard.contents(), Some("Hi, please send it."));
        assert_eq!(outcome.log_path.as_deref(), Some(fixture.log_path().as_path()));

        let content = fs::read_to_string(fixture.log_path()).unwrap();
        let store = LogStore::parse(&content, &MarkdownLayout);
        let today = store.section(Local::now().date_naive()).unwrap();
        assert!(today.body.contains("```\nYou are a helpful assistant.\n```"));
        assert!(today.body.contains("```\nFix this email: hi plz send\n```"));
        assert!(today.body.contains("```\nHi, please send it.\n```"));
        assert!(today.body.contains("- **Model:** gpt-test\n"));
        assert!(today.body.contains("- **Temperature:** 0.7\n"));
        assert!(today.body.contains(
            "- **Usage:** prompt_tokens: 5, completion_tokens: 4, total_tokens: 9"
        ));
        assert!(today.body.contains("- **Response ID:** chatcmpl-test"));
    }

    #[tokio::test]
    async fn test_client_receives_resolved_config() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("hello");
        let stub = StubClient::replying("hi");
        let cli = fixture.cli(&["--temperature", "1.5", "--no-log"]);
        let prepared = prepare(&cli, &fixture.env).unwrap();

        run_session(&prepared.config, &mut clipboard, &stub, prepared.logger().as_ref())
            .await
            .unwrap();

        let calls = stub.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[Call {
                system_prompt: "You are a helpful assistant.".into(),
                user_content: "hello".into(),
                model: "gpt-test".into(),
                temperature: 1.5,
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_clipboard() {
        let mut fixture = Fixture::new(SCENARIO_CONFIG);
        fixture.env = Environment::default();
        let mut clipboard = MemoryClipboard::with_text("Fix this email: hi plz send");

        let err = execute(&fixture.cli(&[]), &fixture.env, &mut clipboard, never_connect)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingCredential { .. }));
        assert_eq!(clipboard.reads, 0);
        assert_eq!(clipboard.writes, 0);
    }

    #[tokio::test]
    async fn test_malformed_config_fails_before_clipboard() {
        let fixture = Fixture::new(r#"{"model": "gpt-test""#);
        let mut clipboard = MemoryClipboard::with_text("hello");

        let err = execute(&fixture.cli(&[]), &fixture.env, &mut clipboard, never_connect)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConfigParse { .. }));
        assert_eq!(clipboard.reads, 0);
    }

    #[tokio::test]
    async fn test_invalid_temperature_fails_before_clipboard() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("hello");

        let err = execute(
            &fixture.cli(&["--temperature", "2.5"]),
            &fixture.env,
            &mut clipboard,
            never_connect,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::ConfigValidation { field: "temperature", .. }));
        assert_eq!(clipboard.reads, 0);
    }

    #[tokio::test]
    async fn test_empty_clipboard_aborts_before_request() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("   \n");
        let stub = StubClient::replying("unused");
        let prepared = prepare(&fixture.cli(&[]), &fixture.env).unwrap();

        let err = run_session(&prepared.config, &mut clipboard, &stub, prepared.logger().as_ref())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ClipboardUnavailable(_)));
        assert!(stub.calls.lock().unwrap().is_empty());
        assert!(!fixture.log_path().exists());
    }

    #[tokio::test]
    async fn test_chat_failure_leaves_clipboard_alone() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("hello");

        let err = execute(
            &fixture.cli(&[]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::failing(401, "Incorrect API key provided")),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::ChatRequest { status: Some(401), .. }));
        assert_eq!(clipboard.writes, 0);
        assert_eq!(clipboard.contents(), Some("hello"));
        assert!(!fixture.log_path().exists());
    }

    #[tokio::test]
    async fn test_clipboard_write_failure_is_recoverable() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("hello").failing_writes();

        let outcome = execute(
            &fixture.cli(&[]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::replying("Hi, please send it.")),
        )
        .await
        .unwrap();

        assert_eq!(outcome.reply, "Hi, please send it.");
        assert!(!outcome.copied());
        assert!(matches!(outcome.clipboard_error, Some(Error::ClipboardUnavailable(_))));
        assert!(fixture.log_path().exists());
    }

    #[tokio::test]
    async fn test_log_failure_is_recoverable() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        fs::create_dir(fixture.log_path()).unwrap();
        let mut clipboard = MemoryClipboard::with_text("hello");

        let outcome = execute(
            &fixture.cli(&[]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::replying("Hi, please send it.")),
        )
        .await
        .unwrap();

        assert!(outcome.copied());
        assert!(matches!(outcome.log_error, Some(Error::LogWrite { .. })));
        assert_eq!(outcome.log_path, None);
    }

    #[tokio::test]
    async fn test_recoverable_failures_stay_below_default_log_level() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let fixture = Fixture::new(SCENARIO_CONFIG);
        fs::create_dir(fixture.log_path()).unwrap();
        let mut clipboard = MemoryClipboard::with_text("hello").failing_writes();

        let outcome = execute(
            &fixture.cli(&[]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::replying("Hi, please send it.")),
        )
        .await
        .unwrap();

        // both failures come back to the caller, which prints them once
        assert!(outcome.clipboard_error.is_some());
        assert!(outcome.log_error.is_some());
        assert_eq!(logs.contents(), "");
    }

    #[tokio::test]
    async fn test_no_log_flag_skips_logging() {
        let fixture = Fixture::new(SCENARIO_CONFIG);
        let mut clipboard = MemoryClipboard::with_text("hello");

        let outcome = execute(
            &fixture.cli(&["--no-log"]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::replying("hi")),
        )
        .await
        .unwrap();

        assert_eq!(outcome.log_path, None);
        assert!(!fixture.log_path().exists());
    }

    #[tokio::test]
    async fn test_plain_log_format_from_env() {
        let mut fixture = Fixture::new(SCENARIO_CONFIG);
        fixture.env = Environment::from_pairs([
            (API_KEY_VAR, "sk-test"),
            ("GPTCLIP_LOG_FORMAT", "plain"),
        ]);
        let mut clipboard = MemoryClipboard::with_text("hello");

        let outcome = execute(
            &fixture.cli(&[]),
            &fixture.env,
            &mut clipboard,
            connect_to(StubClient::replying("hi")),
        )
        .await
        .unwrap();

        let file_name = crate::utils::paths::get_log_file_name(LogFormat::Plain);
        let expected = fixture.dir.path().join(file_name);
        assert_eq!(outcome.log_path, Some(expected));
    }
}
