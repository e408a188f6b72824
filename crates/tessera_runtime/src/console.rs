//! Line-oriented inspection console over an [`Engine`].
//!
//! Each line is one command; arguments are separated by whitespace and may
//! be double-quoted. Field values and relationship metadata are literals:
//! `nil`, `true`/`false`, integers, floats, or strings (quoted or bare).

use std::io::{self, Write};

use tessera_foundation::{Error, Result, Value};
use tessera_storage::{Engine, KvRead, TagSpec, always, callback, keys};

use crate::editor::{LineEditor, ReadResult, RustylineEditor};

/// Command words, offered for completion.
pub const COMMANDS: &[&str] = &[
    "insert", "get", "select", "tag", "tags", "link", "rels", "delete", "keys", "help", "quit",
];

const HELP: &str = "\
insert TAGS name=value...      create an entity (TAGS is comma-separated)
get ID                         show an entity
select TAG [field=value]       list entities with a tag, optionally filtered
tag TAGS ID                    add tags to an entity
tags ID                        list an entity's tags
link A B KIND NAME [value]     relate A to B (KIND is belongs, has or are)
rels ID KIND NAME              list relationships of an entity
delete ID                      delete an entity and everything attached to it
keys [PREFIX]                  dump raw keys, segments shown as '/'
help                           show this text
quit                           leave the console";

/// The interactive console.
pub struct Console<E: LineEditor = RustylineEditor> {
    editor: E,
    engine: Engine,
    show_banner: bool,
    prompt: String,
}

impl Console<RustylineEditor> {
    /// Creates a console with the default rustyline editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor fails to initialize.
    pub fn new(engine: Engine) -> Result<Self> {
        Ok(Self::with_editor(engine, RustylineEditor::new()?))
    }
}

impl<E: LineEditor> Console<E> {
    /// Creates a console reading from `editor`.
    pub fn with_editor(engine: Engine, mut editor: E) -> Self {
        editor.set_commands(COMMANDS.iter().map(ToString::to_string).collect());
        Self {
            editor,
            engine,
            show_banner: true,
            prompt: "tessera> ".to_string(),
        }
    }

    /// Disables the welcome banner.
    #[must_use]
    pub const fn without_banner(mut self) -> Self {
        self.show_banner = false;
        self
    }

    /// Sets the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// The engine commands run against.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Runs until `quit` or end of input.
    ///
    /// Command errors are printed and the loop continues.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    pub fn run(&mut self) -> Result<()> {
        if self.show_banner {
            print_banner();
        }

        loop {
            let line = match self.editor.read_line(&self.prompt)? {
                ReadResult::Line(line) => line,
                ReadResult::Interrupted => {
                    println!();
                    continue;
                }
                ReadResult::Eof => break,
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.editor.add_history(trimmed);

            if matches!(trimmed, "quit" | "exit") {
                break;
            }
            match self.execute(trimmed) {
                Ok(output) if output.is_empty() => {}
                Ok(output) => println!("{output}"),
                Err(e) => eprintln!("\x1b[31mError: {e}\x1b[0m"),
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Executes one command line and returns what it prints.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for unknown commands and bad
    /// arguments, or whatever the engine returns.
    pub fn execute(&mut self, line: &str) -> Result<String> {
        let tokens = tokenize(line)?;
        let Some((command, args)) = tokens.split_first() else {
            return Ok(String::new());
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match command.as_str() {
            "insert" => self.insert(&args),
            "get" => {
                let [id] = expect_args::<1>("get ID", &args)?;
                Ok(self
                    .engine
                    .get(id)?
                    .map_or_else(|| "nil".to_string(), |e| e.to_value().to_string()))
            }
            "select" => self.select(&args),
            "tag" => {
                let [tags, id] = expect_args::<2>("tag TAGS ID", &args)?;
                self.engine.add_tag(tag_spec(tags), id)?;
                Ok("ok".to_string())
            }
            "tags" => {
                let [id] = expect_args::<1>("tags ID", &args)?;
                Ok(self.engine.tags_of(id)?.join(", "))
            }
            "link" => self.link(&args),
            "rels" => {
                let [id, kind, name] = expect_args::<3>("rels ID KIND NAME", &args)?;
                let lines: Vec<String> = self
                    .engine
                    .related(id, kind, name)?
                    .into_iter()
                    .map(|r| format!("{} {}", r.id, r.metadata))
                    .collect();
                Ok(lines.join("\n"))
            }
            "delete" => {
                let [id] = expect_args::<1>("delete ID", &args)?;
                self.engine.delete(id)?;
                Ok("ok".to_string())
            }
            "keys" => self.keys(&args),
            "help" => Ok(HELP.to_string()),
            other => Err(Error::invalid_argument(format!(
                "unknown command {other:?}, try help"
            ))),
        }
    }

    fn insert(&self, args: &[&str]) -> Result<String> {
        let Some((tags, fields)) = args.split_first() else {
            return Err(usage("insert TAGS name=value..."));
        };
        let fields = fields
            .iter()
            .map(|f| parse_assignment(f))
            .collect::<Result<Vec<_>>>()?;
        let entity = self.engine.insert(tag_spec(tags), fields)?;
        Ok(entity.id().to_string())
    }

    fn select(&self, args: &[&str]) -> Result<String> {
        let found = match args {
            [tag] => self.engine.select(tag, always())?,
            [tag, filter] => {
                let (field, expected) = parse_assignment(filter)?;
                self.engine.select(
                    tag,
                    callback(move |e| Ok(Value::Bool(e.get(&field) == Some(&expected)))),
                )?
            }
            _ => return Err(usage("select TAG [field=value]")),
        };
        let mut out: Vec<String> = found.iter().map(|e| e.to_value().to_string()).collect();
        out.push(format!("({} found)", found.len()));
        Ok(out.join("\n"))
    }

    fn link(&self, args: &[&str]) -> Result<String> {
        let (from, to, kind, name, metadata) = match *args {
            [from, to, kind, name] => (from, to, kind, name, None),
            [from, to, kind, name, raw] => (from, to, kind, name, Some(parse_literal(raw))),
            _ => return Err(usage("link A B KIND NAME [value]")),
        };
        self.engine.link(from, to, kind, name, metadata)?;
        Ok("ok".to_string())
    }

    fn keys(&self, args: &[&str]) -> Result<String> {
        let prefix: Vec<u8> = match args {
            [] => Vec::new(),
            [prefix] => prefix
                .bytes()
                .map(|b| if b == b'/' { keys::SEP } else { b })
                .collect(),
            _ => return Err(usage("keys [PREFIX]")),
        };
        self.engine.store().view(|txn| {
            Ok(txn
                .scan_prefix(&prefix)
                .map(|entry| entry.map(|(key, _)| keys::display_key(&key)))
                .collect::<Result<Vec<_>>>()?
                .join("\n"))
        })
    }
}

fn usage(form: &str) -> Error {
    Error::invalid_argument(format!("usage: {form}"))
}

fn expect_args<'a, const N: usize>(form: &str, args: &[&'a str]) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| usage(form))
}

fn tag_spec(raw: &str) -> TagSpec {
    TagSpec::from(raw.split(',').map(str::trim).collect::<Vec<_>>())
}

/// Splits `name=value` into a field name and a literal.
fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), parse_literal(value))),
        _ => Err(Error::invalid_argument(format!(
            "expected name=value, got {raw:?}"
        ))),
    }
}

/// Parses a console literal. Anything unrecognised is a bare string.
fn parse_literal(raw: &str) -> Value {
    if let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Value::from(inner.replace("\\\"", "\""));
    }
    match raw {
        "nil" => return Value::Nil,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    if raw.contains(|c: char| c.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<f64>() {
            return Value::Float(n);
        }
    }
    Value::from(raw)
}

/// Splits a line on whitespace outside double quotes. Quotes are kept so
/// literals can tell `"1"` from `1`.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(Error::invalid_argument("unterminated string"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn print_banner() {
    println!("\x1b[1;36mTessera console v{}\x1b[0m", env!("CARGO_PKG_VERSION"));
    println!("Type help for commands. Use Ctrl+D or quit to exit.\n");
    let _ = io::stdout().flush();
}
