use std::io::Write;

use crate::{
    error::BbdbError,
    types::{Address, Database, Record},
    utils::quote,
};
use tracing::debug;

/// Write `db` in BBDB v2 syntax. The database is validated first, so
/// nothing is written when it is malformed.
pub fn write<W: Write>(db: &Database, mut writer: W) -> Result<(), BbdbError> {
    db.validate()?;

    let user_fields: Vec<&str> = db.user_fields().into_iter().collect();
    writeln!(writer, ";; -*-coding: {};-*-", db.coding)?;
    writeln!(writer, ";;; file-version: {}", db.fileversion)?;
    writeln!(writer, ";;; user-fields: ({})", user_fields.join(" "))?;

    for record in &db.records {
        writeln!(writer, "{}", format_record(record))?;
    }
    writer.flush()?;

    debug!(records = db.records.len(), "wrote BBDB file");
    Ok(())
}

pub fn to_string(db: &Database) -> Result<String, BbdbError> {
    let mut buffer = Vec::new();
    write(db, &mut buffer)?;
    // Only string input is written, so the buffer is always UTF-8.
    String::from_utf8(buffer).map_err(|e| {
        BbdbError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

/// `(item item ...)`, or `nil` when there are no items.
fn list_or_nil<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let items: Vec<String> = items.into_iter().collect();
    if items.is_empty() {
        "nil".to_string()
    } else {
        format!("({})", items.join(" "))
    }
}

fn format_address(tag: &str, address: &Address) -> String {
    let location: Vec<String> = address.location.iter().map(|line| quote(line)).collect();
    format!(
        "[{} ({}) {} {} {} {}]",
        quote(tag),
        location.join(" "),
        quote(&address.city),
        quote(&address.state),
        quote(&address.zipcode),
        quote(&address.country),
    )
}

/// One record as a single `[...]` entry, without the trailing newline.
pub fn format_record(record: &Record) -> String {
    let slots = [
        quote(&record.firstname),
        record.lastname.as_deref().map_or_else(|| "nil".to_string(), quote),
        list_or_nil(record.aka.iter().map(|name| quote(name))),
        if record.company.is_empty() {
            "nil".to_string()
        } else {
            quote(&record.company)
        },
        list_or_nil(
            record
                .phone
                .iter()
                .map(|(tag, number)| format!("[{} {}]", quote(tag), quote(number))),
        ),
        list_or_nil(record.address.iter().map(|(tag, address)| format_address(tag, address))),
        list_or_nil(record.net.iter().map(|net| quote(net))),
        list_or_nil(
            record
                .fields
                .iter()
                .map(|(name, value)| format!("({} . {})", name, quote(value))),
        ),
        // cache
        "nil".to_string(),
    ];
    format!("[{}]", slots.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fred() -> Database {
        let mut db = Database::new();
        let fred = db.add_record("Fred", Some("Flintstone"));
        fred.set_company("Slate Rock & Gravel");
        fred.add_net("fred@bedrock.org");
        db
    }

    #[test]
    fn test_write_fred() {
        let text = to_string(&fred()).unwrap();
        assert_eq!(
            text,
            ";; -*-coding: utf-8-emacs;-*-\n\
             ;;; file-version: 6\n\
             ;;; user-fields: ()\n\
             [\"Fred\" \"Flintstone\" nil \"Slate Rock & Gravel\" nil nil (\"fred@bedrock.org\") nil nil]\n"
        );
    }

    #[test]
    fn test_write_full_record() {
        let mut db = Database::new();
        let fred = db.add_record("Fred", None);
        fred.add_aka("Freddie");
        fred.add_phone("Work", "555-9876");
        fred.add_phone("Home", "555-1234");
        fred.add_address("Home")
            .add_location("Cave 2a")
            .add_location("345 Cavestone Road")
            .set_city("Bedrock");
        fred.add_field("spouse", "Wilma");
        fred.add_field("catchphrase", "\"Yabba dabba doo!\"");

        assert_eq!(
            format_record(&db.records()[0]),
            r#"["Fred" nil ("Freddie") nil (["Home" "555-1234"] ["Work" "555-9876"]) (["Home" ("Cave 2a" "345 Cavestone Road") "Bedrock" "" "" ""]) nil ((catchphrase . "\"Yabba dabba doo!\"") (spouse . "Wilma")) nil]"#
        );
        let text = to_string(&db).unwrap();
        assert!(text.contains(";;; user-fields: (catchphrase spouse)\n"));
    }

    #[test]
    fn test_write_keeps_newlines_literal() {
        let mut record = Record::new("Fred", None);
        record.add_field("notes", "brontosaurus\npterodactyl");
        assert!(format_record(&record).contains("(notes . \"brontosaurus\npterodactyl\")"));
    }

    #[test]
    fn test_write_is_deterministic() {
        let mut db = fred();
        let barney = db.add_record("Barney", Some("Rubble"));
        barney.add_phone("Work", "1");
        barney.add_phone("Home", "2");
        barney.add_field("spouse", "Betty");
        barney.add_field("kids", "Bamm-Bamm");
        assert_eq!(to_string(&db).unwrap(), to_string(&db).unwrap());
    }

    #[test]
    fn test_write_rejects_invalid_database() {
        let mut db = fred();
        db.add_record("", None);
        let mut buffer = Vec::new();
        let err = write(&db, &mut buffer).unwrap_err();
        assert!(matches!(err, BbdbError::Validation(_)), "got {:?}", err);
        assert!(buffer.is_empty());
    }
}
