use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::agent::{mint_session_id, Agent, SYSTEM_PROMPT};
use crate::config::Config;
use crate::environment::{DatastoreConfig, Environment, Feature, LlmConfig};
use crate::llm::Message;
use crate::tools::{perplexity, DuckDuckGoTool, PerplexityTool};

const DEFAULT_MODEL: &str = "gpt-4o";
const USER_ID: &str = "user1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Title,
    Description,
}

/// Where the current lookup stands. `Validating` is transient inside
/// [`App::submit`]; a submit always lands in `Running` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupState {
    Idle,
    Running,
    Done { reply: String },
    Error { message: String },
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Focus,

    // Input state
    pub title_input: String,
    pub title_cursor: usize,
    pub description_input: String,
    pub description_cursor: usize,

    // Lookup state
    pub lookup: LookupState,
    pub lookup_task: Option<JoinHandle<Result<Vec<Message>>>>,
    pub session_id: Option<String>,

    // Animation state
    pub animation_frame: u8,

    // The agent lives as long as the UI session and is reused for every
    // lookup; only the session id changes between submits.
    pub agent: Arc<Agent>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().unwrap_or_default();

        let openai_key = config.openai_key();
        let perplexity_key = config.perplexity_key();
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

        let env = Environment {
            llm: LlmConfig::openai(model, openai_key),
            tools: vec![
                Arc::new(PerplexityTool::new(perplexity_key, perplexity::DEFAULT_MODEL)),
                Arc::new(DuckDuckGoTool::new()),
            ],
            features: vec![
                Feature::ShortTermMemory,
                Feature::ToolCalling { max_tries: 3 },
            ],
            datastore: DatastoreConfig::default(),
        };

        tracing::debug!(
            provider = %env.llm.provider,
            model = %env.llm.model,
            datastore = %env.datastore.uri,
            database = %env.datastore.database,
            "environment assembled"
        );

        let agent = Arc::new(Agent::new(env, SYSTEM_PROMPT, "jaunt bot"));

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: Focus::Title,

            title_input: String::new(),
            title_cursor: 0,
            description_input: String::new(),
            description_cursor: 0,

            lookup: LookupState::Idle,
            lookup_task: None,
            session_id: None,

            animation_frame: 0,

            agent,
        })
    }

    /// Submit the current inputs: validate, mint a session, and start one
    /// background lookup. Refused while a lookup is already running.
    pub fn submit(&mut self) {
        if self.lookup_task.is_some() {
            return;
        }

        let title = self.title_input.trim().to_string();
        if title.is_empty() {
            self.lookup = LookupState::Error {
                message: "Please enter a title".to_string(),
            };
            return;
        }

        let description = self.description_input.trim().to_string();
        if description.is_empty() {
            self.lookup = LookupState::Error {
                message: "Please enter a description".to_string(),
            };
            return;
        }

        let session_id = mint_session_id();
        let message = Message::user(format!("title: {title} description: {description}"));

        let agent = self.agent.clone();
        let task_session = session_id.clone();
        self.session_id = Some(session_id);
        self.lookup = LookupState::Running;
        self.lookup_task = Some(tokio::spawn(async move {
            agent.chat(USER_ID, &task_session, vec![message]).await
        }));
    }

    /// Land the finished lookup in a terminal state. On success the last
    /// message's content is surfaced verbatim; on failure the error's
    /// string form is.
    pub fn finish_lookup(&mut self, outcome: Result<Vec<Message>>) {
        self.lookup = match outcome {
            Ok(messages) => match messages.last() {
                Some(last) => LookupState::Done {
                    reply: last.content.clone(),
                },
                None => LookupState::Error {
                    message: "An error occurred: agent returned no messages".to_string(),
                },
            },
            Err(e) => LookupState::Error {
                message: format!("An error occurred: {e}"),
            },
        };
    }

    pub fn is_running(&self) -> bool {
        self.lookup == LookupState::Running
    }

    /// Tick the ellipsis animation while a lookup runs.
    pub fn tick_animation(&mut self) {
        if self.is_running() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Title => Focus::Description,
            Focus::Description => Focus::Title,
        };
    }

    fn field_mut(&mut self) -> (&mut String, &mut usize) {
        match self.focus {
            Focus::Title => (&mut self.title_input, &mut self.title_cursor),
            Focus::Description => (&mut self.description_input, &mut self.description_cursor),
        }
    }

    // Editing actions on the focused field. Cursors are char indices;
    // byte positions are derived per edit for UTF-8 safety.

    pub fn insert_char(&mut self, c: char) {
        let (input, cursor) = self.field_mut();
        let byte_pos = char_to_byte_index(input, *cursor);
        input.insert(byte_pos, c);
        *cursor += 1;
    }

    pub fn backspace(&mut self) {
        let (input, cursor) = self.field_mut();
        if *cursor > 0 {
            *cursor -= 1;
            let byte_pos = char_to_byte_index(input, *cursor);
            input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        let (input, cursor) = self.field_mut();
        if *cursor < input.chars().count() {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        let (_, cursor) = self.field_mut();
        *cursor = cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let (input, cursor) = self.field_mut();
        *cursor = (*cursor + 1).min(input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        let (_, cursor) = self.field_mut();
        *cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        let (input, cursor) = self.field_mut();
        *cursor = input.chars().count();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string edits.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        App::new().unwrap()
    }

    #[tokio::test]
    async fn test_submit_empty_title_does_not_invoke_agent() {
        let mut app = test_app();
        app.title_input = "   ".to_string();
        app.description_input = "A tall iron tower in Paris".to_string();

        app.submit();

        assert!(app.lookup_task.is_none());
        assert!(app.session_id.is_none());
        assert_eq!(
            app.lookup,
            LookupState::Error {
                message: "Please enter a title".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_submit_empty_description_does_not_invoke_agent() {
        let mut app = test_app();
        app.title_input = "Eiffel Tower".to_string();
        app.description_input = "\t \n".to_string();

        app.submit();

        assert!(app.lookup_task.is_none());
        assert_eq!(
            app.lookup,
            LookupState::Error {
                message: "Please enter a description".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_submit_mints_distinct_session_ids() {
        let mut app = test_app();
        app.title_input = "Eiffel Tower".to_string();
        app.description_input = "A tall iron tower in Paris".to_string();

        app.submit();
        let first = app.session_id.clone().unwrap();
        assert!(app.is_running());

        // Drop the in-flight task so the next submit is accepted.
        app.lookup_task.take().unwrap().abort();
        app.submit();
        let second = app.session_id.clone().unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_submit_refused_while_running() {
        let mut app = test_app();
        app.title_input = "Eiffel Tower".to_string();
        app.description_input = "A tall iron tower in Paris".to_string();

        app.submit();
        let first = app.session_id.clone();
        app.submit();

        assert_eq!(app.session_id, first);
        if let Some(task) = app.lookup_task.take() {
            task.abort();
        }
    }

    #[test]
    fn test_finish_lookup_surfaces_last_message_verbatim() {
        let mut app = test_app();
        let messages = vec![
            Message::user("title: Eiffel Tower description: iron tower"),
            Message::assistant("48.8584, 2.2945"),
        ];

        app.finish_lookup(Ok(messages));

        assert_eq!(
            app.lookup,
            LookupState::Done {
                reply: "48.8584, 2.2945".to_string()
            }
        );
    }

    #[test]
    fn test_finish_lookup_surfaces_error_text() {
        let mut app = test_app();

        app.finish_lookup(Err(anyhow::anyhow!("timeout")));

        match &app.lookup {
            LookupState::Error { message } => {
                assert!(message.contains("An error occurred"));
                assert!(message.contains("timeout"));
            }
            other => panic!("expected error state, got {other:?}"),
        }
    }

    #[test]
    fn test_editing_is_utf8_safe() {
        let mut app = test_app();
        for c in "Tèst".chars() {
            app.insert_char(c);
        }
        assert_eq!(app.title_input, "Tèst");

        app.cursor_left();
        app.cursor_left();
        app.backspace();
        assert_eq!(app.title_input, "Tst");

        app.cursor_home();
        app.delete();
        assert_eq!(app.title_input, "st");
    }

    #[test]
    fn test_focus_toggle_switches_field() {
        let mut app = test_app();
        app.insert_char('a');
        app.toggle_focus();
        app.insert_char('b');

        assert_eq!(app.title_input, "a");
        assert_eq!(app.description_input, "b");
    }
}
