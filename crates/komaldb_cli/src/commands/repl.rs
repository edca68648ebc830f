//! Interactive prompt.

use crate::commands::interpreter::Interpreter;
use komaldb_core::Database;
use std::io::{self, BufRead, Write};
use std::path::Path;

const PROMPT: &str = "komaldb> ";

/// Runs the prompt until `exit`, `quit` or end of input.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(path)?;
    println!("KomalDB v{} at {}", komaldb_core::VERSION, path.display());
    println!("Type `exit` to quit.");

    {
        let interpreter = Interpreter::new(&db);
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            write!(stdout, "{PROMPT}")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!();
                break;
            }

            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
                break;
            }
            if trimmed.is_empty() {
                continue;
            }
            println!("{}", interpreter.execute(trimmed));
        }
    }

    db.close()?;
    Ok(())
}
