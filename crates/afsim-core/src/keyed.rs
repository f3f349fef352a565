//! Serde helpers that store a name-keyed map as a plain list.
//!
//! The in-memory form is an `IndexMap<String, T>` whose keys duplicate a
//! field of `T`. On disk only the list is written; on load the map is
//! rebuilt and a repeated key is a deserialization error.

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Values that carry their own map key.
pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

pub(crate) fn serialize<S, T>(map: &IndexMap<String, T>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut seq = s.serialize_seq(Some(map.len()))?;
    for v in map.values() {
        seq.serialize_element(v)?;
    }
    seq.end()
}

pub(crate) fn deserialize<'de, D, T>(d: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Keyed,
{
    struct ListVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for ListVisitor<T>
    where
        T: Deserialize<'de> + Keyed,
    {
        type Value = IndexMap<String, T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of uniquely named entries")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut map = IndexMap::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(item) = seq.next_element::<T>()? {
                let key = item.key().to_string();
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format_args!("duplicate entry '{key}'")));
                }
                map.insert(key, item);
            }
            Ok(map)
        }
    }

    d.deserialize_seq(ListVisitor(PhantomData))
}
