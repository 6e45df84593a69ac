use toml_edit::{Item, Value};

/// Helpers for reading and editing package entries in the installed-state TOML.
///
/// Entries may be written either as `[packages."Id"]` tables or as inline tables,
/// and both forms are handled the same way.
pub struct TomlUtils;

impl TomlUtils {
    /// Reads a string field from a table or inline table.
    pub fn get_str(item: &Item, key: &str) -> Option<String> {
        if let Some(inline_table) = item.as_inline_table() {
            return inline_table
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
        }

        if let Some(table) = item.as_table() {
            return table
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
        }

        None
    }

    /// Sets a string field in place, returning true if the item could hold it.
    pub fn set_str(item: &mut Item, key: &str, value: &str) -> bool {
        if let Some(inline_table) = item.as_inline_table_mut() {
            inline_table.insert(key, Value::from(value));
            return true;
        }

        if let Some(table) = item.as_table_mut() {
            table.insert(key, Item::Value(Value::from(value)));
            return true;
        }

        false
    }
}
