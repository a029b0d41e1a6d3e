// @generated by bitwire-gen from a type manifest.
// Existing files are kept on regeneration unless --force is given.

#![allow(unused_imports)]

use super::*;
use bitwire::{Decoder as _, Encoder as _};

/// Tag of a null top-level value.
pub const NULL_TAG: u8 = 0;
pub const PERSON_TAG: u8 = 1;
pub const VEC3_TAG: u8 = 2;
pub const NODE_TAG: u8 = 10;

/// A value of any registered type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Person(Person),
    Vec3(Vec3),
    Node(Node),
}

impl AnyValue {
    pub fn tag(&self) -> u8 {
        match self {
            AnyValue::Person(_) => PERSON_TAG,
            AnyValue::Vec3(_) => VEC3_TAG,
            AnyValue::Node(_) => NODE_TAG,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnyValue::Person(_) => "Person",
            AnyValue::Vec3(_) => "Vec3",
            AnyValue::Node(_) => "Node",
        }
    }
}

/// Implemented by every registered type.
pub trait Registered: bitwire::Encoder + bitwire::Decoder + Sized {
    const TAG: u8;
    const NAME: &'static str;

    fn into_any(self) -> AnyValue;
    fn from_any(value: AnyValue) -> Result<Self, AnyValue>;
}

impl Registered for Person {
    const TAG: u8 = PERSON_TAG;
    const NAME: &'static str = "Person";

    fn into_any(self) -> AnyValue {
        AnyValue::Person(self)
    }

    #[allow(unreachable_patterns)]
    fn from_any(value: AnyValue) -> Result<Self, AnyValue> {
        match value {
            AnyValue::Person(value) => Ok(value),
            other => Err(other),
        }
    }
}

impl From<Person> for AnyValue {
    fn from(value: Person) -> Self {
        AnyValue::Person(value)
    }
}

impl Registered for Vec3 {
    const TAG: u8 = VEC3_TAG;
    const NAME: &'static str = "Vec3";

    fn into_any(self) -> AnyValue {
        AnyValue::Vec3(self)
    }

    #[allow(unreachable_patterns)]
    fn from_any(value: AnyValue) -> Result<Self, AnyValue> {
        match value {
            AnyValue::Vec3(value) => Ok(value),
            other => Err(other),
        }
    }
}

impl From<Vec3> for AnyValue {
    fn from(value: Vec3) -> Self {
        AnyValue::Vec3(value)
    }
}

impl Registered for Node {
    const TAG: u8 = NODE_TAG;
    const NAME: &'static str = "Node";

    fn into_any(self) -> AnyValue {
        AnyValue::Node(self)
    }

    #[allow(unreachable_patterns)]
    fn from_any(value: AnyValue) -> Result<Self, AnyValue> {
        match value {
            AnyValue::Node(value) => Ok(value),
            other => Err(other),
        }
    }
}

impl From<Node> for AnyValue {
    fn from(value: Node) -> Self {
        AnyValue::Node(value)
    }
}

pub fn tag_of<T: Registered>() -> u8 {
    T::TAG
}

/// Tag registered for a type name.
pub fn tag_of_name(name: &str) -> Option<u8> {
    match name {
        "Person" => Some(PERSON_TAG),
        "Vec3" => Some(VEC3_TAG),
        "Node" => Some(NODE_TAG),
        _ => None,
    }
}

pub fn type_name_of(tag: u8) -> Option<&'static str> {
    match tag {
        PERSON_TAG => Some("Person"),
        VEC3_TAG => Some("Vec3"),
        NODE_TAG => Some("Node"),
        _ => None,
    }
}

/// Encoded size of a top-level value: 1 for null, else the tag plus the payload.
pub fn size(value: Option<&AnyValue>) -> usize {
    match value {
        None => 1,
        Some(AnyValue::Person(value)) => 1 + value.size(),
        Some(AnyValue::Vec3(value)) => 1 + value.size(),
        Some(AnyValue::Node(value)) => 1 + value.size(),
    }
}

pub fn serialize(value: Option<&AnyValue>, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
    match value {
        None => bitwire::write_u8(buf, cursor, NULL_TAG),
        Some(AnyValue::Person(value)) => {
            bitwire::write_u8(buf, cursor, PERSON_TAG)?;
            value.serialize(buf, cursor)
        }
        Some(AnyValue::Vec3(value)) => {
            bitwire::write_u8(buf, cursor, VEC3_TAG)?;
            value.serialize(buf, cursor)
        }
        Some(AnyValue::Node(value)) => {
            bitwire::write_u8(buf, cursor, NODE_TAG)?;
            value.serialize(buf, cursor)
        }
    }
}

pub fn size_of<T: Registered>(value: Option<&T>) -> usize {
    value.map_or(1, |value| 1 + value.size())
}

pub fn serialize_typed<T: Registered>(value: Option<&T>, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
    match value {
        None => bitwire::write_u8(buf, cursor, NULL_TAG),
        Some(value) => {
            bitwire::write_u8(buf, cursor, T::TAG)?;
            value.serialize(buf, cursor)
        }
    }
}

/// Decodes the payload of `tag`; the tag byte has already been read.
pub fn deserialize_by_tag(tag: u8, buf: &[u8], cursor: &mut usize) -> bitwire::Result<AnyValue> {
    match tag {
        PERSON_TAG => Ok(AnyValue::Person(Person::deserialize(buf, cursor)?)),
        VEC3_TAG => Ok(AnyValue::Vec3(Vec3::deserialize(buf, cursor)?)),
        NODE_TAG => Ok(AnyValue::Node(Node::deserialize(buf, cursor)?)),
        tag => Err(bitwire::DispatchError::UnknownTag { tag }.into()),
    }
}

pub fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Option<AnyValue>> {
    match bitwire::read_u8(buf, cursor)? {
        NULL_TAG => Ok(None),
        tag => deserialize_by_tag(tag, buf, cursor).map(Some),
    }
}

/// Reads a top-level value that must be a `T` (or null).
pub fn deserialize_as<T: Registered>(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Option<T>> {
    let tag = bitwire::read_u8(buf, cursor)?;
    if tag == NULL_TAG {
        return Ok(None);
    }
    if tag != T::TAG {
        return Err(match type_name_of(tag) {
            Some(actual) => bitwire::DispatchError::TypeMismatch {
                tag,
                expected: T::NAME,
                actual,
            },
            None => bitwire::DispatchError::UnknownTag { tag },
        }.into());
    }
    T::deserialize(buf, cursor).map(Some)
}
