use crate::collections::map::HashMap;

/// Attribute value. Descriptions carry a closed set of primitive values so
/// the attribute differ can compare snapshots without downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Renders the value the way a host attribute string would.
    pub fn to_attr_string(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Attribute map shared by description nodes, component props and the
/// retained-tree attribute sidecar.
pub type AttrMap = HashMap<String, Value>;

/// Builds an [`AttrMap`] literal.
///
/// ```
/// use restitch_core::attrs;
/// let map = attrs! { "id" => "app", "tabindex" => 3 };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::AttrMap::default() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::AttrMap::default();
        $( map.insert($name.to_string(), $crate::Value::from($value)); )+
        map
    }};
}
