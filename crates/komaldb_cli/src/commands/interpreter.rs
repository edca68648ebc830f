//! Statement interpreter.
//!
//! Turns one line of text into one engine call and describes the outcome as
//! a string. Statements are split on whitespace, `;` is ignored and the
//! command word is case-insensitive:
//!
//! ```text
//! SET <key> = <value>      transactional set; value is JSON or raw text
//! GET <key>
//! DEL <key>
//! BEGIN [TRANSACTION]
//! COMMIT
//! ROLLBACK
//! DUMP
//! INDEX <field>
//! FIND <field> <value>
//! ```
//!
//! Interpreting never fails: malformed statements, unknown commands and
//! engine errors all come back as text.

use komaldb_core::{Database, Value};
use tracing::debug;

/// Reply to an empty statement.
pub const EMPTY_STATEMENT: &str = "empty statement";

const SET_USAGE: &str = "usage: SET <key> = <value>";
const GET_USAGE: &str = "usage: GET <key>";
const DEL_USAGE: &str = "usage: DEL <key>";
const BEGIN_USAGE: &str = "usage: BEGIN [TRANSACTION]";
const COMMIT_USAGE: &str = "usage: COMMIT";
const ROLLBACK_USAGE: &str = "usage: ROLLBACK";
const DUMP_USAGE: &str = "usage: DUMP";
const INDEX_USAGE: &str = "usage: INDEX <field>";
const FIND_USAGE: &str = "usage: FIND <field> <value>";

/// Interpreter bound to one database.
#[derive(Debug, Clone, Copy)]
pub struct Interpreter<'a> {
    db: &'a Database,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter over `db`.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Executes one statement and describes the result.
    pub fn execute(&self, line: &str) -> String {
        let cleaned = line.replace(';', "");
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return EMPTY_STATEMENT.to_string();
        };

        let command = first.to_ascii_uppercase();
        debug!(command = %command, tokens = tokens.len(), "executing statement");
        let args = &tokens[1..];

        match command.as_str() {
            "SET" => self.set(args),
            "GET" => self.get(args),
            "DEL" => self.delete(args),
            "BEGIN" => self.begin(args),
            "COMMIT" => self.commit(args),
            "ROLLBACK" => self.rollback(args),
            "DUMP" => self.dump(args),
            "INDEX" => self.index(args),
            "FIND" => self.find(args),
            _ => format!("unknown command: {command}"),
        }
    }

    fn set(&self, args: &[&str]) -> String {
        let [key, "=", value @ ..] = args else {
            return SET_USAGE.to_string();
        };
        if value.is_empty() {
            return SET_USAGE.to_string();
        }

        let raw = value.join(" ");
        match self.db.transactional_set(key, Value::from_input(&raw)) {
            Ok(()) => format!("OK: {key} = {raw}"),
            Err(e) => format!("error: {e}"),
        }
    }

    fn get(&self, args: &[&str]) -> String {
        let [key] = args else {
            return GET_USAGE.to_string();
        };
        match self.db.get(key) {
            Some(value) => value.to_string(),
            None => format!("{key} not found"),
        }
    }

    fn delete(&self, args: &[&str]) -> String {
        let [key] = args else {
            return DEL_USAGE.to_string();
        };
        match self.db.delete(key) {
            Ok(true) => format!("OK: deleted {key}"),
            Ok(false) => format!("OK: {key} was not present"),
            Err(e) => format!("error: {e}"),
        }
    }

    fn begin(&self, args: &[&str]) -> String {
        match args {
            [] => {}
            [word] if word.eq_ignore_ascii_case("TRANSACTION") => {}
            _ => return BEGIN_USAGE.to_string(),
        }
        let id = self.db.begin();
        format!("OK: transaction started ({id})")
    }

    fn commit(&self, args: &[&str]) -> String {
        if !args.is_empty() {
            return COMMIT_USAGE.to_string();
        }
        match self.db.commit() {
            Ok(id) => format!("OK: transaction committed ({id})"),
            Err(e) => format!("error: {e}"),
        }
    }

    fn rollback(&self, args: &[&str]) -> String {
        if !args.is_empty() {
            return ROLLBACK_USAGE.to_string();
        }
        match self.db.rollback() {
            Ok(id) => format!("OK: transaction rolled back ({id})"),
            Err(e) => format!("error: {e}"),
        }
    }

    fn dump(&self, args: &[&str]) -> String {
        if !args.is_empty() {
            return DUMP_USAGE.to_string();
        }
        render_entries(&self.db.entries())
    }

    fn index(&self, args: &[&str]) -> String {
        let [field] = args else {
            return INDEX_USAGE.to_string();
        };
        let count = self.db.add_index(field);
        format!("OK: indexed {field} ({count} entries)")
    }

    fn find(&self, args: &[&str]) -> String {
        let [field, value @ ..] = args else {
            return FIND_USAGE.to_string();
        };
        if value.is_empty() {
            return FIND_USAGE.to_string();
        }

        let value = Value::from_input(&value.join(" "));
        match self.db.search_by_index(field, &value) {
            Some(key) => key,
            None => format!("no key with {field} = {value}"),
        }
    }
}

/// Renders entries as `key: value` lines.
pub fn render_entries(entries: &[(String, Value)]) -> String {
    if entries.is_empty() {
        return "(empty)".to_string();
    }
    entries
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
