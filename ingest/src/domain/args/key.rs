//! Argument keys and scoped key-path extension

/// Name of an argument row.
///
/// `key` carries repetition indices (`items[1].x`); `flat_key` does not
/// (`items.x`), so all entries of a repeated field share one flat key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Key {
    pub flat_key: String,
    pub key: String,
}

impl Key {
    /// Key without repetition, where flat and full keys are equal
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            flat_key: key.clone(),
            key,
        }
    }

    pub fn with_flat(flat_key: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            flat_key: flat_key.into(),
            key: key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

/// A temporary extension of a key path.
///
/// Dropping the scope truncates the key back to the length it had when the
/// scope was entered, so nested scopes unwind in order even on early return.
#[derive(Debug)]
pub struct KeyScope<'a> {
    key: &'a mut Key,
    flat_len: usize,
    key_len: usize,
}

impl<'a> KeyScope<'a> {
    /// Scope over a whole key buffer; dropping it restores the initial state
    pub fn root(key: &'a mut Key) -> Self {
        let flat_len = key.flat_key.len();
        let key_len = key.key.len();
        Self {
            key,
            flat_len,
            key_len,
        }
    }

    pub fn key(&self) -> &Key {
        &*self.key
    }

    /// Append `.name` to both the flat and the full key
    pub fn enter_dictionary(&mut self, name: &str) -> KeyScope<'_> {
        let scope = KeyScope::root(self.key);
        append_segment(&mut scope.key.flat_key, name);
        append_segment(&mut scope.key.key, name);
        scope
    }

    /// Append `[index]` to the full key only
    pub fn enter_array(&mut self, index: usize) -> KeyScope<'_> {
        let scope = KeyScope::root(self.key);
        append_index(&mut scope.key.key, index);
        scope
    }

    /// Append a field segment: the name, plus `[index]` for repeated fields
    pub(crate) fn enter_field(&mut self, name: &str, index: Option<usize>) -> KeyScope<'_> {
        let scope = KeyScope::root(self.key);
        append_segment(&mut scope.key.flat_key, name);
        append_segment(&mut scope.key.key, name);
        if let Some(index) = index {
            append_index(&mut scope.key.key, index);
        }
        scope
    }
}

impl Drop for KeyScope<'_> {
    fn drop(&mut self) {
        self.key.flat_key.truncate(self.flat_len);
        self.key.key.truncate(self.key_len);
    }
}

fn append_segment(buf: &mut String, name: &str) {
    if !buf.is_empty() {
        buf.push('.');
    }
    buf.push_str(name);
}

fn append_index(buf: &mut String, index: usize) {
    use std::fmt::Write;
    // Writing into a String cannot fail.
    let _ = write!(buf, "[{index}]");
}
