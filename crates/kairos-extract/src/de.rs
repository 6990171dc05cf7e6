//! Serde deserializer over bound path parameters.
//!
//! Tuples and sequences read the values by position, structs and maps by
//! name. A lone scalar target needs exactly one parameter. Scalars are
//! parsed from their textual form.

use std::fmt;

use kairos_core::Params;
use serde::de::value::{MapDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{self, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

/// Failure while deserializing path parameters.
#[derive(Debug)]
pub(crate) struct PathDeError(String);

impl fmt::Display for PathDeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PathDeError {}

impl de::Error for PathDeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Deserializes the whole parameter set.
#[derive(Clone, Copy)]
pub(crate) struct ParamsDeserializer<'a> {
    params: &'a Params,
}

impl<'a> ParamsDeserializer<'a> {
    pub(crate) const fn new(params: &'a Params) -> Self {
        Self { params }
    }

    fn values(self) -> impl Iterator<Item = ValueDeserializer<'a>> {
        self.params
            .iter()
            .map(|(name, value)| ValueDeserializer { name, value })
    }

    fn single(&self) -> Result<ValueDeserializer<'a>, PathDeError> {
        match self.params.first() {
            Some((name, value)) if self.params.len() == 1 => Ok(ValueDeserializer { name, value }),
            _ => Err(PathDeError(format!(
                "expected 1 path parameter, found {}",
                self.params.len()
            ))),
        }
    }

    fn by_position<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, PathDeError> {
        let mut seq: SeqDeserializer<_, PathDeError> = SeqDeserializer::new(self.values());
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }

    fn expect_len(&self, len: usize) -> Result<(), PathDeError> {
        if self.params.len() == len {
            Ok(())
        } else {
            Err(PathDeError(format!(
                "expected {len} path parameters, found {}",
                self.params.len()
            )))
        }
    }
}

macro_rules! from_single_value {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            self.single()?.$method(visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for ParamsDeserializer<'_> {
    type Error = PathDeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let mut map: MapDeserializer<'de, _, PathDeError> = MapDeserializer::new(
            self.params
                .iter()
                .map(|(name, value)| (name, ValueDeserializer { name, value })),
        );
        let value = visitor.visit_map(&mut map)?;
        map.end()?;
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.by_position(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.expect_len(len)?;
        self.by_position(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.expect_len(len)?;
        self.by_position(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single()?.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    from_single_value! {
        deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64
        deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf
        deserialize_option deserialize_unit deserialize_identifier
    }
}

/// Deserializes one bound value.
#[derive(Clone, Copy)]
struct ValueDeserializer<'a> {
    name: &'a str,
    value: &'a str,
}

macro_rules! parse_value {
    ($($method:ident => $visit:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.value.parse() {
                Ok(parsed) => visitor.$visit(parsed),
                Err(err) => Err(PathDeError(format!(
                    "invalid value `{}` for path parameter `{}`: {err}",
                    self.value, self.name
                ))),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for ValueDeserializer<'_> {
    type Error = PathDeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_str(self.value)
    }

    parse_value! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bytes(self.value.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let variant: StrDeserializer<'_, PathDeError> = self.value.into_deserializer();
        visitor.visit_enum(variant)
    }

    forward_to_deserialize_any! {
        i128 u128 str string identifier unit unit_struct seq tuple tuple_struct map struct
        ignored_any
    }
}

impl<'de> IntoDeserializer<'de, PathDeError> for ValueDeserializer<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().copied().collect()
    }

    fn decode<T: for<'de> Deserialize<'de>>(pairs: &[(&str, &str)]) -> Result<T, PathDeError> {
        T::deserialize(ParamsDeserializer::new(&params(pairs)))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Kind {
        Post,
        Comment,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Slug(String);

    #[test]
    fn test_tuple_by_position() {
        let (user, id): (String, u32) = decode(&[("user", "ann"), ("id", "7")]).unwrap();
        assert_eq!(user, "ann");
        assert_eq!(id, 7);
    }

    #[test]
    fn test_tuple_length_must_match() {
        let err = decode::<(String, u32)>(&[("user", "ann")]).unwrap_err();
        assert_eq!(err.to_string(), "expected 2 path parameters, found 1");
    }

    #[test]
    fn test_seq_and_map() {
        let all: Vec<u16> = decode(&[("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
        assert_eq!(all, [1, 2, 3]);

        let map: HashMap<String, String> = decode(&[("a", "x"), ("b", "y")]).unwrap();
        assert_eq!(map["b"], "y");
    }

    #[test]
    fn test_single_scalar_newtype_and_enum() {
        assert_eq!(decode::<u64>(&[("id", "42")]).unwrap(), 42);
        assert!(decode::<bool>(&[("flag", "true")]).unwrap());
        assert_eq!(decode::<Slug>(&[("slug", "hello")]).unwrap(), Slug("hello".into()));
        assert_eq!(decode::<Kind>(&[("kind", "comment")]).unwrap(), Kind::Comment);
        assert!(decode::<Kind>(&[("kind", "video")]).is_err());
        assert!(decode::<u64>(&[("a", "1"), ("b", "2")]).is_err());
    }

    #[test]
    fn test_invalid_scalar_names_the_parameter() {
        let err = decode::<(String, u32)>(&[("user", "ann"), ("id", "seven")]).unwrap_err();
        assert!(err.to_string().contains("`id`"));
    }

    #[test]
    fn test_option_fields() {
        #[derive(Debug, Deserialize)]
        struct Lookup {
            kind: Option<Kind>,
            id: u32,
        }
        let found: Lookup = decode(&[("kind", "post"), ("id", "3")]).unwrap();
        assert_eq!(found.kind, Some(Kind::Post));
        assert_eq!(found.id, 3);
    }
}
