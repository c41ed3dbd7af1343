//! Layer merging.

/// Recursively merge `overlay` into `base`.
///
/// Tables merge key by key. Scalars and arrays from the overlay replace the
/// base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Set the value at a dotted `path`, creating intermediate tables.
///
/// A non-table value in the way is replaced by a table.
pub fn set_path(root: &mut toml::Table, path: &str, value: toml::Value) {
    let mut table = root;
    let mut parts = path.split('.').peekable();

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            table.insert(part.to_owned(), value);
            return;
        }

        let slot = table
            .entry(part.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !slot.is_table() {
            *slot = toml::Value::Table(toml::Table::new());
        }
        let toml::Value::Table(next) = slot else {
            return;
        };
        table = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> toml::Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn nested_tables_merge_per_key() {
        let mut base = parse("[channel]\na = 1\nb = 2\n");
        deep_merge(&mut base, &parse("[channel]\nb = 3\n"));
        assert_eq!(base, parse("[channel]\na = 1\nb = 3\n"));
    }

    #[test]
    fn new_sections_are_added() {
        let mut base = parse("[channel]\na = 1\n");
        deep_merge(&mut base, &parse("[typing]\ndebounce_ms = 10\n"));
        assert_eq!(base["typing"]["debounce_ms"].as_integer(), Some(10));
        assert_eq!(base["channel"]["a"].as_integer(), Some(1));
    }

    #[test]
    fn arrays_are_replaced_not_appended() {
        let mut base = parse("[logging]\ndirectives = [\"a\", \"b\"]\n");
        deep_merge(&mut base, &parse("[logging]\ndirectives = [\"c\"]\n"));
        assert_eq!(base, parse("[logging]\ndirectives = [\"c\"]\n"));
    }

    #[test]
    fn set_path_creates_tables() {
        let mut root = toml::Table::new();
        set_path(&mut root, "server.base_url", toml::Value::from("http://x"));
        assert_eq!(root["server"]["base_url"].as_str(), Some("http://x"));
    }

    #[test]
    fn set_path_replaces_scalar_in_the_way() {
        let mut root = toml::from_str::<toml::Table>("server = 1\n").unwrap();
        set_path(&mut root, "server.base_url", toml::Value::from("http://x"));
        assert_eq!(root["server"]["base_url"].as_str(), Some("http://x"));
    }

    #[test]
    fn set_path_overwrites_existing_leaf() {
        let mut root = toml::from_str::<toml::Table>("[request]\nmax_retries = 3\n").unwrap();
        set_path(&mut root, "request.max_retries", toml::Value::Integer(7));
        assert_eq!(root["request"]["max_retries"].as_integer(), Some(7));
    }
}
