use crate::{
    error::{BbdbError, Violation},
    types::{Database, Record, SUPPORTED_VERSIONS},
    utils::{is_atom, quote},
};

/// Returns `Ok(())` if every record is well formed, or
/// `Err(BbdbError::Validation(_))` listing all violations otherwise.
pub fn validate_database(db: &Database) -> Result<(), BbdbError> {
    into_result(check_database(db))
}

pub fn validate_record(record: &Record) -> Result<(), BbdbError> {
    let mut violations = Vec::new();
    check_record(record, "record", &mut violations);
    into_result(violations)
}

pub(crate) fn into_result(violations: Vec<Violation>) -> Result<(), BbdbError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(BbdbError::Validation(violations))
    }
}

pub(crate) fn check_database(db: &Database) -> Vec<Violation> {
    let mut violations = Vec::new();

    if !SUPPORTED_VERSIONS.contains(&db.fileversion) {
        violations.push(Violation::new(
            "fileversion",
            format!("version {} is not supported", db.fileversion),
        ));
    }
    if db.coding.is_empty() || db.coding.contains(|c: char| c == ';' || c.is_whitespace()) {
        violations.push(Violation::new(
            "coding",
            format!("{} is not a valid coding name", quote(&db.coding)),
        ));
    }

    for (index, record) in db.records.iter().enumerate() {
        check_record(record, &format!("records[{}]", index), &mut violations);
    }
    violations
}

pub(crate) fn check_record(record: &Record, path: &str, violations: &mut Vec<Violation>) {
    if record.firstname.is_empty() {
        violations.push(Violation::new(format!("{}.firstname", path), "must not be empty"));
    }

    for (index, name) in record.aka.iter().enumerate() {
        if name.is_empty() {
            violations.push(Violation::new(format!("{}.aka[{}]", path, index), "must not be empty"));
        }
    }

    for (tag, address) in &record.address {
        if address.location.is_empty() {
            violations.push(Violation::new(
                format!("{}.address.{}.location", path, tag),
                "must have at least one line",
            ));
        }
    }

    for (index, net) in record.net.iter().enumerate() {
        if net.is_empty() {
            violations.push(Violation::new(format!("{}.net[{}]", path, index), "must not be empty"));
        }
    }

    for key in record.fields.keys() {
        if !is_atom(key) {
            violations.push(Violation::new(
                format!("{}.fields.{}", path, key),
                "is not a valid field name (lowercase letters and hyphens)",
            ));
        }
    }
}
