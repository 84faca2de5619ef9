//! Conversion between the object model and a generic `serde_json::Value`
//! tree, the seam other serialization formats attach to.
//!
//! The tree mirrors the model's field names:
//!
//! ```text
//! { "coding": "utf-8-emacs", "fileversion": 6, "records": [
//!     { "firstname": "Fred", "lastname": "Flintstone", "aka": [], "company": "",
//!       "phone": { "Home": "555-1234" },
//!       "address": { "Home": { "location": [..], "city": "", "state": "",
//!                              "zipcode": "", "country": "" } },
//!       "net": [], "fields": { "spouse": "Wilma" } } ] }
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    error::{BbdbError, Violation},
    traits::FromTree,
    types::{Address, Database, Record, DEFAULT_FILE_VERSION},
    verifier::{check_database, check_record, into_result},
};

const DATABASE_KEYS: [&str; 3] = ["coding", "fileversion", "records"];
const RECORD_KEYS: [&str; 8] = [
    "firstname", "lastname", "aka", "company", "phone", "address", "net", "fields",
];
const ADDRESS_KEYS: [&str; 5] = ["location", "city", "state", "zipcode", "country"];

pub fn to_tree(db: &Database) -> Result<Value, BbdbError> {
    Ok(serde_json::to_value(db)?)
}

pub fn from_tree(value: &Value) -> Result<Database, BbdbError> {
    Database::from_tree(value)
}

impl FromTree for Database {
    fn from_tree(value: &Value) -> Result<Self, BbdbError> {
        let mut reader = TreeReader::default();
        let db = reader.database(value);
        let schema = check_database(&db);
        reader.finish(schema)?;
        debug!(records = db.len(), "imported database from tree");
        Ok(db)
    }
}

impl FromTree for Record {
    fn from_tree(value: &Value) -> Result<Self, BbdbError> {
        let mut reader = TreeReader::default();
        let record = reader.record(value, "record");
        let mut schema = Vec::new();
        check_record(&record, "record", &mut schema);
        reader.finish(schema)?;
        Ok(record)
    }
}

impl FromTree for Address {
    fn from_tree(value: &Value) -> Result<Self, BbdbError> {
        let mut reader = TreeReader::default();
        let address = reader.address(value, "address");
        let mut schema = Vec::new();
        if address.location.is_empty() {
            schema.push(Violation::new("address.location", "must have at least one line"));
        }
        reader.finish(schema)?;
        Ok(address)
    }
}

/// Walks a tree, building model values and collecting every shape
/// violation instead of stopping at the first.
#[derive(Default)]
struct TreeReader {
    violations:   Vec<Violation>,
    /// Paths whose malformed value was replaced by an empty default.
    placeholders: Vec<String>,
}

impl TreeReader {
    fn violation(&mut self, path: &str, reason: &str) {
        self.violations.push(Violation::new(path, reason));
    }

    fn placeholder(&mut self, path: &str) {
        self.placeholders.push(path.to_string());
    }

    /// True if `path` is, or lies under, a placeholder value.
    fn is_placeholder(&self, path: &str) -> bool {
        self.placeholders.iter().any(|p| {
            path.strip_prefix(p.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
        })
    }

    /// Merge schema violations and fail if anything was found. Schema
    /// violations about placeholder values are skipped, since the shape
    /// violation already covers them.
    fn finish(mut self, schema: Vec<Violation>) -> Result<(), BbdbError> {
        for violation in schema {
            if !self.is_placeholder(&violation.path) && !self.violations.contains(&violation) {
                self.violations.push(violation);
            }
        }
        into_result(self.violations)
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str, keys: &[&str]) -> Option<&'v Map<String, Value>> {
        let Some(map) = value.as_object() else {
            self.violation(path, "expected an object");
            self.placeholder(path);
            return None;
        };
        for key in map.keys() {
            if !keys.contains(&key.as_str()) {
                self.violation(&format!("{}.{}", path, key), "unknown key");
            }
        }
        Some(map)
    }

    fn string(&mut self, value: Option<&Value>, path: &str) -> String {
        match value {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                self.violation(path, "expected a string");
                String::new()
            }
        }
    }

    /// Like `string`, but a malformed value becomes a placeholder.
    fn required_string(&mut self, value: Option<&Value>, path: &str) -> String {
        let before = self.violations.len();
        let text = self.string(value, path);
        if self.violations.len() > before {
            self.placeholder(path);
        }
        text
    }

    fn string_list(&mut self, value: Option<&Value>, path: &str) -> Vec<String> {
        match value {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.required_string(Some(item), &format!("{}[{}]", path, index)))
                .collect(),
            Some(_) => {
                self.violation(path, "expected an array of strings");
                self.placeholder(path);
                Vec::new()
            }
        }
    }

    fn string_map(&mut self, value: Option<&Value>, path: &str) -> BTreeMap<String, String> {
        match value {
            None => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, item)| (key.clone(), self.string(Some(item), &format!("{}.{}", path, key))))
                .collect(),
            Some(_) => {
                self.violation(path, "expected an object of strings");
                BTreeMap::new()
            }
        }
    }

    fn database(&mut self, value: &Value) -> Database {
        let mut db = Database::new();
        let Some(map) = self.object(value, "database", &DATABASE_KEYS) else {
            return db;
        };

        if let Some(coding) = map.get("coding") {
            db.coding = self.string(Some(coding), "coding");
        }
        match map.get("fileversion") {
            None => db.fileversion = DEFAULT_FILE_VERSION,
            Some(version) => match version.as_u64().and_then(|v| u32::try_from(v).ok()) {
                Some(version) => db.fileversion = version,
                None => self.violation("fileversion", "expected a non-negative integer"),
            },
        }
        match map.get("records") {
            None => {}
            Some(Value::Array(records)) => {
                for (index, record) in records.iter().enumerate() {
                    let record = self.record(record, &format!("records[{}]", index));
                    db.records.push(record);
                }
            }
            Some(_) => self.violation("records", "expected an array of records"),
        }
        db
    }

    fn record(&mut self, value: &Value, path: &str) -> Record {
        let mut record = Record::default();
        let Some(map) = self.object(value, path, &RECORD_KEYS) else {
            return record;
        };

        match map.get("firstname") {
            None => {
                let path = format!("{}.firstname", path);
                self.violation(&path, "is required");
                self.placeholder(&path);
            }
            firstname => record.firstname = self.required_string(firstname, &format!("{}.firstname", path)),
        }
        record.lastname = match map.get("lastname") {
            None | Some(Value::Null) => None,
            lastname => Some(self.string(lastname, &format!("{}.lastname", path))),
        };
        record.aka = self.string_list(map.get("aka"), &format!("{}.aka", path));
        record.company = self.string(map.get("company"), &format!("{}.company", path));
        record.phone = self.string_map(map.get("phone"), &format!("{}.phone", path));
        record.net = self.string_list(map.get("net"), &format!("{}.net", path));
        record.fields = self.string_map(map.get("fields"), &format!("{}.fields", path));

        match map.get("address") {
            None => {}
            Some(Value::Object(addresses)) => {
                for (tag, address) in addresses {
                    let address = self.address(address, &format!("{}.address.{}", path, tag));
                    record.address.insert(tag.clone(), address);
                }
            }
            Some(_) => {
                let path = format!("{}.address", path);
                self.violation(&path, "expected an object of addresses");
                self.placeholder(&path);
            }
        }
        record
    }

    fn address(&mut self, value: &Value, path: &str) -> Address {
        let mut address = Address::default();
        let Some(map) = self.object(value, path, &ADDRESS_KEYS) else {
            return address;
        };
        address.location = self.string_list(map.get("location"), &format!("{}.location", path));
        address.city = self.string(map.get("city"), &format!("{}.city", path));
        address.state = self.string(map.get("state"), &format!("{}.state", path));
        address.zipcode = self.string(map.get("zipcode"), &format!("{}.zipcode", path));
        address.country = self.string(map.get("country"), &format!("{}.country", path));
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flintstones() -> Database {
        let mut db = Database::new();
        let fred = db.add_record("Fred", Some("Flintstone"));
        fred.add_aka("Freddie");
        fred.set_company("Slate Rock & Gravel");
        fred.add_phone("Home", "555-1234");
        fred.add_address("Home")
            .add_location("345 Cavestone Road")
            .set_city("Bedrock");
        fred.add_net("fred@bedrock.org");
        fred.add_field("spouse", "Wilma");
        db.add_record("Dino", None);
        db
    }

    #[test]
    fn test_to_tree_mirrors_field_names() {
        let tree = to_tree(&flintstones()).unwrap();
        assert_eq!(tree["coding"], "utf-8-emacs");
        assert_eq!(tree["fileversion"], 6);

        let fred = &tree["records"][0];
        assert_eq!(fred["firstname"], "Fred");
        assert_eq!(fred["lastname"], "Flintstone");
        assert_eq!(fred["aka"], json!(["Freddie"]));
        assert_eq!(fred["company"], "Slate Rock & Gravel");
        assert_eq!(fred["phone"], json!({"Home": "555-1234"}));
        assert_eq!(
            fred["address"]["Home"],
            json!({"location": ["345 Cavestone Road"], "city": "Bedrock",
                   "state": "", "zipcode": "", "country": ""})
        );
        assert_eq!(fred["net"], json!(["fred@bedrock.org"]));
        assert_eq!(fred["fields"], json!({"spouse": "Wilma"}));
        assert_eq!(tree["records"][1]["lastname"], Value::Null);
    }

    #[test]
    fn test_tree_round_trip() {
        let db = flintstones();
        assert_eq!(from_tree(&to_tree(&db).unwrap()).unwrap(), db);
    }

    #[test]
    fn test_from_tree_defaults_missing_keys() {
        let db = from_tree(&json!({"records": [{"firstname": "Fred"}]})).unwrap();
        assert_eq!(db.coding(), "utf-8-emacs");
        assert_eq!(db.fileversion(), 6);
        assert_eq!(db.records()[0], Record::new("Fred", None));
    }

    #[test]
    fn test_from_tree_collects_shape_and_schema_violations() {
        let tree = json!({
            "fileversion": 9,
            "records": [
                {"lastname": "Flintstone", "net": "fred@bedrock.org", "fields": {"Spouse": "Wilma"}},
                {"firstname": "Barney", "phone": {"Home": 5551234}, "nickname": "B"}
            ]
        });
        let err = from_tree(&tree).unwrap_err();
        let paths: Vec<_> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "records[0].firstname",
                "records[0].net",
                "records[1].nickname",
                "records[1].phone.Home",
                "fileversion",
                "records[0].fields.Spouse",
            ]
        );
    }

    #[test]
    fn test_from_tree_reports_bad_field_key_and_value() {
        let tree = json!({"records": [{"firstname": "Fred", "fields": {"Bad": 5}}]});
        let err = from_tree(&tree).unwrap_err();
        assert_eq!(
            err.violations(),
            [
                Violation::new("records[0].fields.Bad", "expected a string"),
                Violation::new(
                    "records[0].fields.Bad",
                    "is not a valid field name (lowercase letters and hyphens)"
                ),
            ]
        );
    }

    #[test]
    fn test_from_tree_skips_schema_checks_on_placeholders() {
        let tree = json!({"records": [
            {"firstname": 7, "aka": [1], "address": {"Home": "Bedrock"}},
            "Barney"
        ]});
        let err = from_tree(&tree).unwrap_err();
        let paths: Vec<_> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            ["records[0].firstname", "records[0].aka[0]", "records[0].address.Home", "records[1]"]
        );
    }

    #[test]
    fn test_from_tree_rejects_non_object() {
        let err = from_tree(&json!([1, 2])).unwrap_err();
        assert_eq!(err.violations(), [Violation::new("database", "expected an object")]);
    }

    #[test]
    fn test_record_and_address_from_tree() {
        let record = Record::from_tree(&json!({"firstname": "Wilma", "lastname": null})).unwrap();
        assert_eq!(record.name(), "Wilma");

        let err = Address::from_tree(&json!({"city": "Bedrock"})).unwrap_err();
        assert_eq!(err.violations()[0].path, "address.location");
    }
}
