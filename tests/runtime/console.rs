//! Integration tests for the console

use tessera_foundation::Result;
use tessera_runtime::{Config, Console, LineEditor, ReadResult, Runtime};

struct Scripted {
    lines: std::vec::IntoIter<String>,
}

impl Scripted {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .into_iter(),
        }
    }
}

impl LineEditor for Scripted {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadResult> {
        Ok(self.lines.next().map_or(ReadResult::Eof, ReadResult::Line))
    }

    fn add_history(&mut self, _line: &str) {}

    fn set_commands(&mut self, _commands: Vec<String>) {}
}

#[test]
fn scripted_session_against_a_runtime() {
    let runtime = Runtime::start(Config::default().with_in_memory(true)).unwrap();
    let mut console =
        Console::with_editor(runtime.engine().clone(), Scripted::new(&[])).without_banner();

    let pedro = console
        .execute("insert user,admin name=Pedro age=23")
        .unwrap();
    let sergio = console.execute("insert user name=Sergio age=30").unwrap();
    console
        .execute(&format!("link {pedro} {sergio} are friends \"since school\""))
        .unwrap();

    assert!(console.execute("select admin").unwrap().contains("Pedro"));
    assert_eq!(
        console.execute(&format!("rels {sergio} are friends")).unwrap(),
        format!("{pedro} \"since school\"")
    );

    console.execute(&format!("delete {pedro}")).unwrap();
    assert!(!console.execute("keys").unwrap().contains(&pedro));

    runtime.shutdown().unwrap();
}

#[test]
fn run_consumes_script_until_eof() {
    let runtime = Runtime::start(Config::default().with_in_memory(true)).unwrap();
    let script = Scripted::new(&["insert t n=1", "insert t n=2", "select t n=2", "help"]);
    let mut console = Console::with_editor(runtime.engine().clone(), script).without_banner();
    console.run().unwrap();

    let found = runtime
        .engine()
        .select("t", tessera_storage::always())
        .unwrap();
    assert_eq!(found.len(), 2);
    runtime.shutdown().unwrap();
}
