use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use serde::Serialize;

use crate::error::BbdbError;

pub const DEFAULT_CODING: &str = "utf-8-emacs";
pub const DEFAULT_FILE_VERSION: u32 = 6;
pub const SUPPORTED_VERSIONS: [u32; 1] = [DEFAULT_FILE_VERSION];

/// An address book: header properties plus records in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Database {
    pub(crate) coding:      String,
    pub(crate) fileversion: u32,
    pub(crate) records:     Vec<Record>,
}

impl Default for Database {
    fn default() -> Self {
        Database {
            coding:      DEFAULT_CODING.to_string(),
            fileversion: DEFAULT_FILE_VERSION,
            records:     Vec::new(),
        }
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coding(&self) -> &str {
        &self.coding
    }

    pub fn set_coding(&mut self, coding: impl Into<String>) {
        self.coding = coding.into();
    }

    pub fn fileversion(&self) -> u32 {
        self.fileversion
    }

    pub fn set_fileversion(&mut self, fileversion: u32) {
        self.fileversion = fileversion;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a new record and return it for further population.
    pub fn add_record(&mut self, firstname: impl Into<String>, lastname: Option<&str>) -> &mut Record {
        self.push_record(Record::new(firstname, lastname))
    }

    pub fn push_record(&mut self, record: Record) -> &mut Record {
        self.records.push(record);
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    /// Remove the record at `index`, or `None` if out of range.
    pub fn remove_record(&mut self, index: usize) -> Option<Record> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    /// Every distinct user field name across all records, sorted.
    pub fn user_fields(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .flat_map(|record| record.fields.keys().map(String::as_str))
            .collect()
    }

    /// Merge the records of another BBDB stream into this database.
    ///
    /// Records are appended without de-duplication. Header properties the
    /// stream declares replace the current ones.
    pub fn read<R: Read>(&mut self, reader: R) -> Result<(), BbdbError> {
        let parsed = crate::parser::parse_reader_raw(reader)?;
        if let Some(coding) = parsed.coding {
            self.coding = coding;
        }
        if let Some(fileversion) = parsed.fileversion {
            self.fileversion = fileversion;
        }
        self.records.extend(parsed.records);
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<(), BbdbError> {
        crate::writer::write(self, writer)
    }

    pub fn validate(&self) -> Result<(), BbdbError> {
        crate::verifier::validate_database(self)
    }

    pub fn to_tree(&self) -> Result<serde_json::Value, BbdbError> {
        crate::tree::to_tree(self)
    }
}

/// One address book entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub(crate) firstname: String,
    pub(crate) lastname:  Option<String>,
    pub(crate) aka:       Vec<String>,
    pub(crate) company:   String,
    pub(crate) phone:     BTreeMap<String, String>,
    pub(crate) address:   BTreeMap<String, Address>,
    pub(crate) net:       Vec<String>,
    pub(crate) fields:    BTreeMap<String, String>,
}

impl Record {
    pub fn new(firstname: impl Into<String>, lastname: Option<&str>) -> Self {
        Record {
            firstname: firstname.into(),
            lastname:  lastname.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn firstname(&self) -> &str {
        &self.firstname
    }

    pub fn lastname(&self) -> Option<&str> {
        self.lastname.as_deref()
    }

    /// First and last name separated by a space.
    pub fn name(&self) -> String {
        match self.lastname() {
            Some(last) if !last.is_empty() => format!("{} {}", self.firstname, last),
            _ => self.firstname.clone(),
        }
    }

    pub fn aka(&self) -> &[String] {
        &self.aka
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn phone(&self) -> &BTreeMap<String, String> {
        &self.phone
    }

    pub fn address(&self) -> &BTreeMap<String, Address> {
        &self.address
    }

    pub fn net(&self) -> &[String] {
        &self.net
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn set_name(&mut self, firstname: impl Into<String>, lastname: Option<&str>) {
        self.set_firstname(firstname);
        self.set_lastname(lastname);
    }

    pub fn set_firstname(&mut self, firstname: impl Into<String>) {
        self.firstname = firstname.into();
    }

    pub fn set_lastname(&mut self, lastname: Option<&str>) {
        self.lastname = lastname.map(str::to_string);
    }

    pub fn set_company(&mut self, company: impl Into<String>) {
        self.company = company.into();
    }

    pub fn add_aka(&mut self, name: impl Into<String>) {
        self.aka.push(name.into());
    }

    pub fn add_phone(&mut self, tag: impl Into<String>, number: impl Into<String>) {
        self.phone.insert(tag.into(), number.into());
    }

    /// Start a fresh address under `tag`, replacing any existing one.
    pub fn add_address(&mut self, tag: impl Into<String>) -> &mut Address {
        match self.address.entry(tag.into()) {
            Entry::Occupied(mut entry) => {
                entry.insert(Address::default());
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(Address::default()),
        }
    }

    pub fn add_net(&mut self, net: impl Into<String>) {
        self.net.push(net.into());
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn validate(&self) -> Result<(), BbdbError> {
        crate::verifier::validate_record(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub(crate) location: Vec<String>,
    pub(crate) city:     String,
    pub(crate) state:    String,
    pub(crate) zipcode:  String,
    pub(crate) country:  String,
}

impl Address {
    pub fn location(&self) -> &[String] {
        &self.location
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn zipcode(&self) -> &str {
        &self.zipcode
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn add_location(&mut self, line: impl Into<String>) -> &mut Self {
        self.location.push(line.into());
        self
    }

    pub fn set_city(&mut self, city: impl Into<String>) -> &mut Self {
        self.city = city.into();
        self
    }

    pub fn set_state(&mut self, state: impl Into<String>) -> &mut Self {
        self.state = state.into();
        self
    }

    pub fn set_zipcode(&mut self, zipcode: impl Into<String>) -> &mut Self {
        self.zipcode = zipcode.into();
        self
    }

    pub fn set_country(&mut self, country: impl Into<String>) -> &mut Self {
        self.country = country.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_database_has_default_header() {
        let db = Database::new();
        assert_eq!(db.coding(), "utf-8-emacs");
        assert_eq!(db.fileversion(), 6);
        assert!(db.is_empty());
    }

    #[test]
    fn test_add_and_remove_records() {
        let mut db = Database::new();
        db.add_record("Fred", Some("Flintstone"));
        db.add_record("Barney", Some("Rubble"));
        assert_eq!(db.len(), 2);

        let removed = db.remove_record(0).unwrap();
        assert_eq!(removed.name(), "Fred Flintstone");
        assert_eq!(db.records()[0].firstname(), "Barney");
        assert!(db.remove_record(5).is_none());
    }

    #[test]
    fn test_ordered_and_sorted_containers() {
        let mut record = Record::new("Fred", None);
        record.add_aka("Freddie");
        record.add_aka("Big Guy");
        record.add_phone("Work", "555-0002");
        record.add_phone("Home", "555-0001");

        assert_eq!(record.aka(), ["Freddie", "Big Guy"]);
        let tags: Vec<_> = record.phone().keys().cloned().collect();
        assert_eq!(tags, ["Home", "Work"]);
        assert_eq!(record.name(), "Fred");
    }

    #[test]
    fn test_add_address_replaces_existing_tag() {
        let mut record = Record::new("Fred", Some("Flintstone"));
        record
            .add_address("Home")
            .add_location("345 Cavestone Road")
            .set_city("Bedrock");
        record.add_address("Home").add_location("Cave 2a");

        let home = &record.address()["Home"];
        assert_eq!(home.location(), ["Cave 2a"]);
        assert_eq!(home.city(), "");
    }

    #[test]
    fn test_user_fields_are_distinct_and_sorted() {
        let mut db = Database::new();
        let fred = db.add_record("Fred", Some("Flintstone"));
        fred.add_field("spouse", "Wilma");
        fred.add_field("kids", "Pebbles");
        let barney = db.add_record("Barney", Some("Rubble"));
        barney.add_field("spouse", "Betty");
        barney.add_field("catchphrase", "Uh huh");

        let fields: Vec<_> = db.user_fields().into_iter().collect();
        assert_eq!(fields, ["catchphrase", "kids", "spouse"]);
    }

    #[test]
    fn test_read_appends_without_deduplication() {
        let text = "[\"Fred\" \"Flintstone\" nil nil nil nil nil nil nil]\n";
        let mut db = Database::new();
        db.read(text.as_bytes()).unwrap();
        db.read(text.as_bytes()).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.records()[0], db.records()[1]);
    }

    #[test]
    fn test_read_takes_header_from_stream() {
        let text = ";; -*-coding: utf-8;-*-\n[\"Wilma\" nil nil nil nil nil nil nil nil]\n";
        let mut db = Database::new();
        db.add_record("Fred", Some("Flintstone"));
        db.read(text.as_bytes()).unwrap();
        assert_eq!(db.coding(), "utf-8");
        assert_eq!(db.fileversion(), 6);
        assert_eq!(db.records()[1].lastname(), None);
    }
}
