use serde_json::Value as JsonValue;

/// Value of a single query argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    /// Sent as `key=value`.
    One(String),
    /// Sent as repeated keys, `key=a&key=b`.
    Many(Vec<String>),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_owned).collect())
    }
}

/// Insertion-ordered query arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryArgs {
    entries: Vec<(String, ArgValue)>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an existing value in place or appending.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Chained form of [`QueryArgs::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Flattens into `(key, value)` pairs, expanding lists into repeated keys.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            match value {
                ArgValue::One(value) => pairs.push((name.clone(), value.clone())),
                ArgValue::Many(values) => {
                    pairs.extend(values.iter().map(|value| (name.clone(), value.clone())));
                }
            }
        }
        pairs
    }
}

impl<K, V> From<Vec<(K, V)>> for QueryArgs
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    fn from(values: Vec<(K, V)>) -> Self {
        let mut args = Self::new();
        for (key, value) in values {
            args.insert(key, value);
        }
        args
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for QueryArgs
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    fn from(values: [(K, V); N]) -> Self {
        let mut args = Self::new();
        for (key, value) in values {
            args.insert(key, value);
        }
        args
    }
}

impl From<()> for QueryArgs {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

/// Flattens a JSON body into form fields.
///
/// Objects become one field per key: strings verbatim, arrays as repeated
/// keys, everything else as its JSON text. A non-object body is sent as a
/// single `data` field. `null` yields no fields.
pub(crate) fn form_fields(data: Option<&JsonValue>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    match data {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::Object(map)) => {
            for (name, value) in map {
                match value {
                    JsonValue::Array(items) => {
                        fields.extend(items.iter().map(|item| (name.clone(), field_text(item))));
                    }
                    JsonValue::Null => {}
                    other => fields.push((name.clone(), field_text(other))),
                }
            }
        }
        Some(other) => fields.push(("data".to_owned(), field_text(other))),
    }
    fields
}

fn field_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}
