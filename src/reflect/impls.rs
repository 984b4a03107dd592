//! `Reflect` for primitives, strings, paths and collections.

use super::{Reflect, Shaped};
use crate::error::Mismatch;
use crate::transplant::{copy_array, copy_collection};
use crate::types::{ScalarKind, Shape, Value};
use std::path::PathBuf;

fn parse_failure(expected: &str, text: &str, err: impl std::fmt::Display) -> Mismatch {
    Mismatch::new(expected, format!("{:?} ({})", text, err))
}

macro_rules! integer_impl {
    ($kind:ident, $variant:ident, $wide:ty; $($ty:ty),+) => {
        $(
            impl Shaped for $ty {
                fn type_shape() -> Shape {
                    Shape::Scalar(ScalarKind::$kind)
                }
            }

            impl Reflect for $ty {
                fn shape(&self) -> Shape {
                    Self::type_shape()
                }

                fn to_value(&self) -> Option<Value> {
                    Some(Value::$variant(*self as $wide))
                }

                fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
                    let converted = match *value {
                        Value::Int(n) => <$ty>::try_from(n).ok(),
                        Value::UInt(n) => <$ty>::try_from(n).ok(),
                        ref other => return Err(Mismatch::new(stringify!($ty), other.kind_name())),
                    };
                    *self = converted.ok_or_else(|| {
                        Mismatch::new(stringify!($ty), format!("out of range value {}", value))
                    })?;
                    Ok(())
                }

                fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
                    *self = text
                        .trim()
                        .parse::<$ty>()
                        .map_err(|err| parse_failure(stringify!($ty), text, err))?;
                    Ok(())
                }
            }
        )+
    };
}

integer_impl!(Int, Int, i64; i8, i16, i32, i64, isize);
integer_impl!(UInt, UInt, u64; u8, u16, u32, u64, usize);

macro_rules! float_impl {
    ($($ty:ty),+) => {
        $(
            impl Shaped for $ty {
                fn type_shape() -> Shape {
                    Shape::Scalar(ScalarKind::Float)
                }
            }

            impl Reflect for $ty {
                fn shape(&self) -> Shape {
                    Self::type_shape()
                }

                fn to_value(&self) -> Option<Value> {
                    Some(Value::Float(*self as f64))
                }

                fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
                    *self = match *value {
                        Value::Float(n) => n as $ty,
                        Value::Int(n) => n as $ty,
                        Value::UInt(n) => n as $ty,
                        ref other => return Err(Mismatch::new(stringify!($ty), other.kind_name())),
                    };
                    Ok(())
                }

                fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
                    *self = text
                        .trim()
                        .parse::<$ty>()
                        .map_err(|err| parse_failure(stringify!($ty), text, err))?;
                    Ok(())
                }
            }
        )+
    };
}

float_impl!(f32, f64);

impl Shaped for bool {
    fn type_shape() -> Shape {
        Shape::Scalar(ScalarKind::Bool)
    }
}

impl Reflect for bool {
    fn shape(&self) -> Shape {
        Self::type_shape()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        match value {
            Value::Bool(b) => {
                *self = *b;
                Ok(())
            }
            other => Err(Mismatch::new("bool", other.kind_name())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        match text {
            "true" => *self = true,
            "false" => *self = false,
            other => return Err(Mismatch::new("bool", format!("{:?}", other))),
        }
        Ok(())
    }
}

impl Shaped for char {
    fn type_shape() -> Shape {
        Shape::Scalar(ScalarKind::Char)
    }
}

impl Reflect for char {
    fn shape(&self) -> Shape {
        Self::type_shape()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::String(self.to_string()))
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        match value {
            Value::String(text) => self.set_text(text),
            other => Err(Mismatch::new("char", other.kind_name())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                *self = c;
                Ok(())
            }
            _ => Err(Mismatch::new("char", format!("{:?}", text))),
        }
    }
}

impl Shaped for String {
    fn type_shape() -> Shape {
        Shape::Scalar(ScalarKind::String)
    }
}

impl Reflect for String {
    fn shape(&self) -> Shape {
        Self::type_shape()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        match value {
            Value::String(text) => {
                self.clone_from(text);
                Ok(())
            }
            other => Err(Mismatch::new("string", other.kind_name())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        *self = text.to_string();
        Ok(())
    }
}

impl Shaped for PathBuf {
    fn type_shape() -> Shape {
        Shape::Text("PathBuf")
    }
}

impl Reflect for PathBuf {
    fn shape(&self) -> Shape {
        Self::type_shape()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::String(self.to_string_lossy().into_owned()))
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        match value {
            Value::String(text) => self.set_text(text),
            other => Err(Mismatch::new("PathBuf", other.kind_name())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        *self = PathBuf::from(text);
        Ok(())
    }
}

impl<T: Shaped> Shaped for Vec<T> {
    fn type_shape() -> Shape {
        Shape::List {
            elem: Box::new(T::type_shape()),
            len: None,
        }
    }
}

impl<T: Reflect + Shaped + Default> Reflect for Vec<T> {
    fn shape(&self) -> Shape {
        Self::type_shape()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::List(self.iter().filter_map(T::to_value).collect()))
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        match value {
            Value::List(items) => {
                *self = copy_collection(items)?;
                Ok(())
            }
            other => Err(Mismatch::new(Self::type_shape().type_name(), other.kind_name())),
        }
    }

    /// Comma-separated elements.
    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        let mut items = Vec::new();
        for part in text.split(',') {
            let mut item = T::default();
            item.set_text(part)?;
            items.push(item);
        }
        *self = items;
        Ok(())
    }
}

impl<T: Shaped, const N: usize> Shaped for [T; N] {
    fn type_shape() -> Shape {
        Shape::List {
            elem: Box::new(T::type_shape()),
            len: Some(N),
        }
    }
}

impl<T: Reflect + Shaped + Default, const N: usize> Reflect for [T; N] {
    fn shape(&self) -> Shape {
        Self::type_shape()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::List(self.iter().filter_map(T::to_value).collect()))
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        match value {
            Value::List(items) => {
                *self = copy_array(items)?;
                Ok(())
            }
            other => Err(Mismatch::new(Self::type_shape().type_name(), other.kind_name())),
        }
    }

    /// Up to `N` comma-separated elements; missing ones are defaulted.
    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        let parts: Vec<&str> = text.split(',').collect();
        if parts.len() > N {
            return Err(Mismatch::new(
                Self::type_shape().type_name(),
                format!("{} elements", parts.len()),
            ));
        }
        let mut items: [T; N] = std::array::from_fn(|_| T::default());
        for (item, part) in items.iter_mut().zip(parts) {
            item.set_text(part)?;
        }
        *self = items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range_checked() {
        let mut port: u16 = 0;
        assert!(port.assign(&Value::Int(8080)).is_ok());
        assert_eq!(port, 8080);

        let err = port.assign(&Value::Int(-1)).unwrap_err();
        assert_eq!(err.expected, "u16");
        assert_eq!(port, 8080);

        assert!(port.assign(&Value::UInt(70_000)).is_err());
        assert!(port.assign(&Value::String("80".into())).is_err());
    }

    #[test]
    fn test_float_accepts_integers() {
        let mut ratio = 0.0f64;
        ratio.assign(&Value::Int(3)).unwrap();
        assert_eq!(ratio, 3.0);
        ratio.assign(&Value::Float(0.25)).unwrap();
        assert_eq!(ratio, 0.25);
    }

    #[test]
    fn test_bool_text_is_strict() {
        let mut flag = false;
        flag.set_text("true").unwrap();
        assert!(flag);
        assert!(flag.set_text("yes").is_err());
        assert!(flag);
    }

    #[test]
    fn test_integer_text_trims() {
        let mut n: i32 = 0;
        n.set_text(" 42 ").unwrap();
        assert_eq!(n, 42);
        assert!(n.set_text("4.2").is_err());
    }

    #[test]
    fn test_char_single_character_only() {
        let mut c = 'a';
        c.set_text("z").unwrap();
        assert_eq!(c, 'z');
        assert!(c.set_text("zz").is_err());
        assert!(c.set_text("").is_err());
    }

    #[test]
    fn test_vec_text_splits_on_commas() {
        let mut ports: Vec<u16> = Vec::new();
        ports.set_text("80,443").unwrap();
        assert_eq!(ports, vec![80, 443]);

        assert!(ports.set_text("80,https").is_err());
        assert_eq!(ports, vec![80, 443]);
    }

    #[test]
    fn test_array_text_bounds() {
        let mut pair: [i64; 2] = [0, 0];
        pair.set_text("7").unwrap();
        assert_eq!(pair, [7, 0]);
        assert!(pair.set_text("1,2,3").is_err());
    }

    #[test]
    fn test_vec_assign_replaces_contents() {
        let mut names = vec!["old".to_string()];
        names
            .assign(&Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into()),
            ]))
            .unwrap();
        assert_eq!(names, vec!["a", "b"]);

        names.assign(&Value::List(Vec::new())).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_path_is_text_shaped() {
        let mut path = PathBuf::new();
        path.assign(&Value::String("/etc/app.yaml".into())).unwrap();
        assert_eq!(path, PathBuf::from("/etc/app.yaml"));
        assert_eq!(path.shape(), Shape::Text("PathBuf"));
    }
}
