use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// A dynamically typed value, used for widget arguments, native properties, state cells and config tables.
///
/// Equality is structural: two `List`s or `Table`s are equal when all their elements are. The comparison stops at the first difference.
///
/// Unlike `f64`, a `NaN` number is equal to itself, so a cell holding `NaN` doesn't notify on every set.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Table(BTreeMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        return match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            _ => false,
        };
    }
}

impl Value {
    pub fn is_nil(&self) -> bool {
        return matches!(self, Value::Nil);
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Lua-style truthiness: everything except `Nil` and `Bool(false)` is true.
    pub fn truthy(&self) -> bool {
        return !matches!(self, Value::Nil | Value::Bool(false));
    }

    /// Build a `Value::Table` from key-value pairs.
    pub fn table<K: Into<String>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Value {
        let table = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        return Value::Table(table);
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Table(table) => {
                write!(f, "{{")?;
                for (i, (k, v)) in table.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} = {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Nil,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

/// The positional argument record a widget is declared with.
///
/// Argument names are resolved through the widget class's schema, see [`WidgetClass::args`](crate::WidgetClass::args).
///
/// Anything that converts into a single [`Value`] converts into a one-element `Args`, so `ui.text("Hello")` and `ui.text(("Hello",))` are the same call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args(pub Vec<Value>);

impl Args {
    pub const fn empty() -> Args {
        return Args(Vec::new());
    }

    /// Returns the argument at `index`, or `Nil` if it wasn't provided.
    pub fn get(&self, index: usize) -> &Value {
        return self.0.get(index).unwrap_or(&NIL);
    }

    pub fn set(&mut self, index: usize, value: impl Into<Value>) {
        if self.0.len() <= index {
            self.0.resize(index + 1, Value::Nil);
        }
        self.0[index] = value.into();
    }

    pub fn len(&self) -> usize {
        return self.0.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }
}

static NIL: Value = Value::Nil;

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::empty()
    }
}

impl From<Vec<Value>> for Args {
    fn from(value: Vec<Value>) -> Self {
        Args(value)
    }
}

impl From<Value> for Args {
    fn from(value: Value) -> Self {
        match value {
            Value::List(list) => Args(list),
            Value::Nil => Args::empty(),
            other => Args(vec![other]),
        }
    }
}

macro_rules! impl_args_from_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Args {
                fn from(value: $t) -> Self {
                    Args(vec![value.into()])
                }
            }
        )*
    };
}

impl_args_from_scalar!(bool, f64, f32, i32, u32, i64, usize, &str, String, &String);

macro_rules! impl_args_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> From<($($name,)+)> for Args {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Args(vec![$($name.into()),+])
            }
        }
    };
}

impl_args_from_tuple!(A);
impl_args_from_tuple!(A, B);
impl_args_from_tuple!(A, B, C);
impl_args_from_tuple!(A, B, C, D);
impl_args_from_tuple!(A, B, C, D, E);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_equality() {
        let a = Value::table([("Size", Value::List(vec![1.into(), 2.into()])), ("Name", "x".into())]);
        let b = Value::table([("Name", Value::from("x")), ("Size", Value::List(vec![1.into(), 2.into()]))]);
        let c = Value::table([("Name", Value::from("x")), ("Size", Value::List(vec![1.into(), 3.into()]))]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(Value::Number(1.0), Value::Str("1".into()));
    }

    #[test]
    fn nan_equals_itself() {
        assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_eq!(Value::List(vec![f64::NAN.into()]), Value::List(vec![f64::NAN.into()]));
        assert_ne!(Value::Number(f64::NAN), Value::Number(0.0));
        assert_eq!(Value::Number(0.0), Value::Number(-0.0));
    }

    #[test]
    fn scalars_become_single_element_args() {
        assert_eq!(Args::from("Box"), Args(vec![Value::from("Box")]));
        assert_eq!(Args::from(Value::Bool(true)), Args(vec![Value::Bool(true)]));
        assert_eq!(Args::from(Value::Nil), Args::empty());
        assert_eq!(Args::from(("a", 2)).len(), 2);
    }

    #[test]
    fn missing_arguments_read_as_nil() {
        let mut args = Args::from("Text");
        assert!(args.get(3).is_nil());

        args.set(2, true);
        assert_eq!(args.len(), 3);
        assert!(args.get(1).is_nil());
        assert!(args.get(2).truthy());
    }
}
