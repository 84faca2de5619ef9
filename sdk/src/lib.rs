//! bbdb
//!
//! Read, build, validate and write BBDB v2 address books.
//!
//! - The object model and text codec (re-exported from `bbdb-format`)
//! - JSON helpers over the tree form
//! - File helpers that scope the file handle to the call
//!
//! ```
//! use bbdb::Database;
//!
//! let mut db = Database::new();
//! let fred = db.add_record("Fred", Some("Flintstone"));
//! fred.set_company("Slate Rock & Gravel");
//! fred.add_net("fred@bedrock.org");
//!
//! let text = bbdb::to_string(&db).unwrap();
//! assert!(text.ends_with(
//!     "[\"Fred\" \"Flintstone\" nil \"Slate Rock & Gravel\" nil nil (\"fred@bedrock.org\") nil nil]\n"
//! ));
//! assert_eq!(bbdb::parse(&text).unwrap(), db);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

pub use bbdb_format::{
    from_tree, parse, parse_reader, to_string, to_tree, validate_database, validate_record, write,
    Address, BbdbError, Database, FromTree, Record, Violation, DEFAULT_CODING,
    DEFAULT_FILE_VERSION, SUPPORTED_VERSIONS,
};

/// Encode a database as pretty-printed JSON via its tree form.
pub fn to_json(db: &Database) -> Result<String, BbdbError> {
    Ok(serde_json::to_string_pretty(&to_tree(db)?)?)
}

/// Decode JSON produced by [`to_json`] (or any tree of the same shape).
pub fn from_json(text: &str) -> Result<Database, BbdbError> {
    let tree: serde_json::Value = serde_json::from_str(text)?;
    from_tree(&tree)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Database, BbdbError> {
    let path = path.as_ref();
    let db = parse_reader(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), records = db.len(), "read BBDB file");
    Ok(db)
}

pub fn write_file(db: &Database, path: impl AsRef<Path>) -> Result<(), BbdbError> {
    let path = path.as_ref();
    // Validate before creating the file so a bad database leaves no trace.
    db.validate()?;
    write(db, BufWriter::new(File::create(path)?))?;
    info!(path = %path.display(), records = db.len(), "wrote BBDB file");
    Ok(())
}

pub mod error {
    pub use bbdb_format::error::{BbdbError, Violation};
}

pub mod traits {
    pub use bbdb_format::traits::FromTree;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let mut db = Database::new();
        let barney = db.add_record("Barney", Some("Rubble"));
        barney.add_phone("Home", "555-4321");
        barney.add_field("spouse", "Betty");

        let json = to_json(&db).unwrap();
        assert!(json.contains("\"firstname\": \"Barney\""));
        assert_eq!(from_json(&json).unwrap(), db);
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(from_json("{"), Err(BbdbError::Tree(_))));
        assert!(matches!(
            from_json(r#"{"records": [{"firstname": ""}]}"#),
            Err(BbdbError::Validation(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("bbdb-sdk-test-{}.bbdb", std::process::id()));
        let mut db = Database::new();
        db.add_record("Wilma", Some("Flintstone")).add_net("wilma@bedrock.org");

        write_file(&db, &path).unwrap();
        let read = read_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read, db);
    }
}
