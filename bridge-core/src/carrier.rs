/*!
Reading and writing identity tokens in a caller-owned tracking carrier.

The carrier is whatever small container the host already ships across a
recreation (a saved-state map, a URL query, an IPC payload). The bridge stores
a single string in it per declared type name and nothing else.
*/

use std::collections::{BTreeMap, HashMap};

use crate::identity::Token;

/// Prefix of every carrier key. Changing it orphans carriers written by earlier builds.
pub const CARRIER_KEY_PREFIX: &str = "uuid_";

/// Minimal string map interface the bridge needs from a tracking carrier
pub trait Carrier {
    fn get_string(&self, key: &str) -> Option<&str>;

    fn put_string(&mut self, key: String, value: String);
}

impl Carrier for BTreeMap<String, String> {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn put_string(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
}

impl Carrier for HashMap<String, String> {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn put_string(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
}

/// Carrier key for objects of the given declared type
pub fn carrier_key(type_name: &str) -> String {
    format!("{CARRIER_KEY_PREFIX}{type_name}")
}

/// Record `token` in `carrier` for objects of `type_name`
pub fn write_token<C: Carrier + ?Sized>(carrier: &mut C, type_name: &str, token: &Token) {
    carrier.put_string(carrier_key(type_name), token.as_str().to_string());
}

/// Recover the token for `type_name`, if the carrier is present and holds one
pub fn read_token<C: Carrier + ?Sized>(carrier: Option<&C>, type_name: &str) -> Option<Token> {
    carrier?
        .get_string(&carrier_key(type_name))
        .map(Token::from)
}
