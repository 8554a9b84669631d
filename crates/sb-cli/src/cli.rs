//! CLI (Command Line Interface) mode
//!
//! Interactive REPL over [`ChatService`], plus the one-shot headless mode.

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings, MenuBuilder,
    Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use sb_core::quota::{self, FREE_REQUEST_LIMIT};
use sb_core::{AgentResponse, ChatOutcome, ChatService, Config, User};
use tracing::info;

/// Session title used by the interactive shell
const CLI_SESSION_TITLE: &str = "CLI Session";

/// Session title used by `--headless`
const HEADLESS_SESSION_TITLE: &str = "Headless Session";

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/memory", "Remember a fact about you"),
    ("/unlock", "Unlock pro mode with a code"),
    ("/clear", "Clear the screen and start a new session"),
    ("/config", "Show current settings"),
    ("/sessions", "List your sessions"),
    ("/history", "Show this session's messages"),
    ("/help", "Show help"),
    ("/exit", "Quit"),
];

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Custom prompt with colored styling
struct ColoredPrompt {
    style: Style,
    pro: bool,
}

impl ColoredPrompt {
    fn new(pro: bool) -> Self {
        Self {
            style: Color::Cyan.bold(),
            pro,
        }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        let marker = if self.pro { "pro> " } else { "> " };
        std::borrow::Cow::Owned(self.style.paint(marker).to_string())
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(
        &self,
        _prompt_mode: reedline::PromptEditMode,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }
}

/// A parsed shell line
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Memory(&'a str),
    Unlock(&'a str),
    Clear,
    Config,
    Sessions,
    History,
    Help,
    Exit,
    Unknown(&'a str),
    Chat(&'a str),
}

impl<'a> Command<'a> {
    fn parse(input: &'a str) -> Self {
        if !input.starts_with('/') {
            return Command::Chat(input);
        }

        let (name, arg) = match input.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (input, ""),
        };

        match name.to_lowercase().as_str() {
            "/memory" => Command::Memory(arg),
            "/unlock" => Command::Unlock(arg),
            "/clear" => Command::Clear,
            "/config" => Command::Config,
            "/sessions" => Command::Sessions,
            "/history" => Command::History,
            "/help" | "/?" => Command::Help,
            "/exit" | "/quit" | "/q" => Command::Exit,
            _ => Command::Unknown(input),
        }
    }
}

/// Mutable state of one interactive run
struct Shell<'a> {
    chat: &'a ChatService,
    config: &'a Config,
    user: User,
    session_id: String,
}

impl Shell<'_> {
    fn refresh_user(&mut self) -> anyhow::Result<()> {
        if let Some(user) = self.chat.store().get_user(&self.user.user_id)? {
            self.user = user;
        }
        Ok(())
    }

    /// Returns `false` when the shell should exit
    async fn handle(&mut self, input: &str) -> anyhow::Result<bool> {
        match Command::parse(input) {
            Command::Chat(prompt) => self.chat_turn(prompt).await?,
            Command::Memory("") => println!("\nUsage: /memory <fact>\n"),
            Command::Memory(fact) => {
                self.chat.remember(&self.user.user_id, fact)?;
                println!("\nRemembered: {}\n", fact);
            }
            Command::Unlock("") => println!("\nUsage: /unlock <code>\n"),
            Command::Unlock(code) => {
                if self.chat.unlock(&self.user.user_id, code)? {
                    self.refresh_user()?;
                    println!("\n{}\n", Color::Green.paint("Pro mode unlocked."));
                } else {
                    println!("\n{}\n", Color::Red.paint("Invalid unlock code."));
                }
            }
            Command::Clear => {
                crossterm::execute!(
                    std::io::stdout(),
                    crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
                    crossterm::cursor::MoveTo(0, 0)
                )?;
                self.session_id = self.chat.open_session(&self.user.user_id, CLI_SESSION_TITLE)?;
                println!("Started a new session.\n");
            }
            Command::Config => self.print_config()?,
            Command::Sessions => self.print_sessions()?,
            Command::History => self.print_history()?,
            Command::Help => print_help(),
            Command::Exit => {
                println!("\nGoodbye!\n");
                return Ok(false);
            }
            Command::Unknown(cmd) => {
                eprintln!("\nUnknown command: {}. Type /help for the list of commands.\n", cmd);
            }
        }
        Ok(true)
    }

    async fn chat_turn(&mut self, prompt: &str) -> anyhow::Result<()> {
        match self.chat.send(&self.user.user_id, &self.session_id, prompt).await {
            Ok(ChatOutcome::Replied(reply)) => {
                print_reply(&reply);
                self.refresh_user()?;
            }
            Ok(ChatOutcome::Denied { limit }) => {
                println!(
                    "\n{}\n",
                    Color::Yellow.paint(format!(
                        "Free limit reached ({} requests). Use /unlock to upgrade.",
                        limit
                    ))
                );
            }
            Err(e) => eprintln!("\nError: {}\n", e),
        }
        Ok(())
    }

    fn print_config(&mut self) -> anyhow::Result<()> {
        self.refresh_user()?;
        let config = self.config;

        println!();
        println!("Provider:   {:?}", config.llm.provider);
        println!("Model:      {}", config.llm.model);
        if let Some(pro_model) = &config.llm.pro_model {
            println!("Pro model:  {}", pro_model);
        }
        println!("Database:   {}", self.chat.store().path().display());
        println!("Catalog:    {}", config.knowledge.catalog_path);
        println!("User:       {} ({})", self.user.username, self.user.user_id);
        println!("Plan:       {}", plan_label(&self.user));
        println!();
        Ok(())
    }

    fn print_sessions(&self) -> anyhow::Result<()> {
        let sessions = self.chat.store().list_sessions(&self.user.user_id)?;

        println!();
        println!("Sessions ({}):", sessions.len());
        println!("{}", "─".repeat(50));
        for session in &sessions {
            let marker = if session.session_id == self.session_id { "*" } else { " " };
            println!(
                "{} {}  {}  {}",
                marker,
                session.updated_at.format("%Y-%m-%d %H:%M"),
                session.title,
                Style::new().dimmed().paint(&session.session_id)
            );
        }
        println!("{}", "─".repeat(50));
        println!();
        Ok(())
    }

    fn print_history(&self) -> anyhow::Result<()> {
        let messages = self.chat.store().get_messages(&self.session_id)?;

        println!();
        println!("History ({} messages):", messages.len());
        println!("{}", "─".repeat(50));
        for (i, msg) in messages.iter().enumerate() {
            println!("{}. {}: {}", i + 1, msg.role, preview(&msg.content, 100));
        }
        println!("{}", "─".repeat(50));
        println!();
        Ok(())
    }
}

/// Run CLI interactive mode
pub async fn run_cli(chat: &ChatService, user: User, config: &Config) -> anyhow::Result<()> {
    let session_id = chat.open_session(&user.user_id, CLI_SESSION_TITLE)?;
    info!("Starting CLI mode in session {}", session_id);

    print_welcome(&user);

    let mut keybindings = default_keybindings();

    // Trigger completion on '/' key
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(40))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let mut shell = Shell {
        chat,
        config,
        user,
        session_id,
    };

    loop {
        let prompt = ColoredPrompt::new(shell.user.is_pro);
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match shell.handle(input).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("\nError: {}\n", e),
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("\nGoodbye!\n");
                break;
            }
            Err(err) => {
                eprintln!("\nError: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

/// Headless mode: run one turn in a fresh session and print the reply
pub async fn run_headless(chat: &ChatService, user: &User, prompt: &str) -> anyhow::Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("Prompt is empty");
    }

    let session_id = chat.open_session(&user.user_id, HEADLESS_SESSION_TITLE)?;
    info!("Executing headless prompt in session {}", session_id);

    match chat.send(&user.user_id, &session_id, prompt).await? {
        ChatOutcome::Replied(reply) => {
            println!("{}", reply.response);
            Ok(())
        }
        ChatOutcome::Denied { limit } => {
            anyhow::bail!("Free limit reached ({} requests). Use /unlock to upgrade.", limit)
        }
    }
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

fn plan_label(user: &User) -> String {
    match quota::remaining(user) {
        None => "Pro".to_string(),
        Some(left) => format!("Free ({} of {} requests left)", left, FREE_REQUEST_LIMIT),
    }
}

/// First `max` characters on a single line
fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max {
        format!("{}...", flat.chars().take(max).collect::<String>())
    } else {
        flat
    }
}

fn print_reply(reply: &AgentResponse) {
    println!("\n{}\n", reply.response);
    for step in &reply.steps {
        println!(
            "{}",
            Style::new()
                .dimmed()
                .paint(format!("[{}] {}", step.label, step.content))
        );
    }
    if !reply.steps.is_empty() {
        println!();
    }
}

fn print_welcome(user: &User) {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                       SilentBot CLI                        ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Type a message and press Enter to chat                    ║");
    println!("║  Type / to see the available commands                      ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("Signed in as {} · {}", user.username, plan_label(user));
    println!();
}

fn print_help() {
    println!();
    println!("Available commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!("Tip: start typing / to see suggestions, use ↑/↓ to pick one");
    println!();
}
