//! One-shot statement execution.

use crate::commands::interpreter::Interpreter;
use komaldb_core::Database;
use std::path::Path;

/// Executes the statement formed by joining `words` and prints the reply.
pub fn run(path: &Path, words: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(path)?;
    let reply = Interpreter::new(&db).execute(&words.join(" "));
    println!("{reply}");
    db.close()?;
    Ok(())
}
