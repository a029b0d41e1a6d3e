//! Compiles the checked-in output of `bitwire-gen` for `generated/manifest.json` and
//! exercises it against the runtime.

#[path = "generated/mod.rs"]
#[allow(dead_code)]
mod wire;

use bitwire::{
    decode, decode_into, encode, DispatchError, Encode, EnumDecodeError, Encoder, WireError,
};
use std::collections::HashMap;
use wire::dispatch::{self, AnyValue, Registered};
use wire::{Color, Node, Person, Vec3, REGISTERED_TYPES};

fn sample_person() -> Person {
    Person {
        id: 42,
        name: None,
        position: Vec3 {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        },
        tags: Some(vec![Some("admin".to_string()), None]),
        scores: HashMap::from([("math".to_string(), 90), ("art".to_string(), -3)]),
        color: Color::Green,
        r#type: 7,
        readings: vec![Some(vec![1, 2, 3]), None, Some(vec![])].into_boxed_slice(),
    }
}

fn write_any(value: Option<&AnyValue>) -> Vec<u8> {
    let size = dispatch::size(value);
    let mut buf = vec![0u8; size];
    let mut cursor = 0;
    dispatch::serialize(value, &mut buf, &mut cursor).unwrap();
    assert_eq!(cursor, size);
    buf
}

#[test]
fn test_generated_person_round_trip() {
    let person = sample_person();
    let value = AnyValue::from(person.clone());
    let bytes = write_any(Some(&value));

    // tag + bitset + id + position + tags + scores + color + type + readings
    assert_eq!(bytes.len(), 1 + 1 + 4 + 12 + 17 + 27 + 1 + 1 + 22);
    assert_eq!(bytes[0], dispatch::PERSON_TAG);
    assert_eq!(bytes[1], 0b0000_0001);

    let mut cursor = 0;
    assert_eq!(dispatch::deserialize(&bytes, &mut cursor).unwrap(), Some(value));
    assert_eq!(cursor, bytes.len());

    let mut cursor = 0;
    let typed = dispatch::deserialize_as::<Person>(&bytes, &mut cursor).unwrap();
    assert_eq!(typed, Some(person));
    assert_eq!(cursor, bytes.len());
}

#[derive(Encode)]
struct DerivedVec3 {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Encode)]
#[repr(u8)]
#[allow(dead_code)]
enum DerivedColor {
    Red = 1,
    Green = 2,
}

#[derive(Encode)]
struct DerivedPerson {
    id: i32,
    name: Option<String>,
    position: DerivedVec3,
    tags: Option<Vec<Option<String>>>,
    scores: HashMap<String, i32>,
    color: DerivedColor,
    r#type: u8,
    readings: Box<[Option<Vec<u16>>]>,
}

#[test]
fn test_generated_and_derived_layouts_agree() {
    let generated = Person {
        scores: HashMap::from([("math".to_string(), 90)]),
        ..sample_person()
    };
    let derived = DerivedPerson {
        id: 42,
        name: None,
        position: DerivedVec3 {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        },
        tags: Some(vec![Some("admin".to_string()), None]),
        scores: HashMap::from([("math".to_string(), 90)]),
        color: DerivedColor::Green,
        r#type: 7,
        readings: vec![Some(vec![1, 2, 3]), None, Some(vec![])].into_boxed_slice(),
    };
    assert_eq!(generated.size(), derived.size());
    assert_eq!(encode(&generated).unwrap(), encode(&derived).unwrap());
}

#[test]
fn test_generated_fixed_size_struct() {
    assert_eq!(Vec3::FIXED_SIZE, Some(12));
    assert_eq!(Color::FIXED_SIZE, Some(1));
    assert_eq!(Node::FIXED_SIZE, None);

    let point = Vec3 {
        x: 1.5,
        y: -2.0,
        z: 0.0,
    };
    let bytes = encode(&point).unwrap();
    let expected: Vec<u8> = [1.5f32, -2.0, 0.0]
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect();
    assert_eq!(&bytes[..], &expected[..]);
    assert_eq!(decode::<Vec3>(&bytes).unwrap(), point);
}

#[test]
fn test_generated_recursive_chain() {
    let node = Node {
        value: 1,
        next: Some(Box::new(Node {
            value: 2,
            next: None,
        })),
    };
    assert_eq!(dispatch::size_of(Some(&node)), 11);

    let mut buf = vec![0u8; 11];
    let mut cursor = 0;
    dispatch::serialize_typed(Some(&node), &mut buf, &mut cursor).unwrap();
    assert_eq!(cursor, 11);
    assert_eq!(buf, vec![10, 0b0, 1, 0, 0, 0, 0b1, 2, 0, 0, 0]);

    let mut cursor = 0;
    let decoded = dispatch::deserialize_as::<Node>(&buf, &mut cursor).unwrap();
    assert_eq!(decoded, Some(node));
    assert_eq!(cursor, 11);
}

#[test]
fn test_generated_null_top_level() {
    assert_eq!(dispatch::size(None), 1);
    let bytes = write_any(None);
    assert_eq!(bytes, vec![dispatch::NULL_TAG]);

    let mut cursor = 0;
    assert_eq!(dispatch::deserialize(&bytes, &mut cursor).unwrap(), None);
    assert_eq!(cursor, 1);
    assert_eq!(dispatch::deserialize_as::<Person>(&bytes, &mut 0).unwrap(), None);
}

#[test]
fn test_generated_dispatch_errors() {
    let bytes = write_any(Some(&AnyValue::Vec3(Vec3::default())));
    let err = dispatch::deserialize_as::<Person>(&bytes, &mut 0).unwrap_err();
    assert!(matches!(
        err,
        WireError::Dispatch(DispatchError::TypeMismatch {
            tag: 2,
            expected: "Person",
            actual: "Vec3",
        })
    ));

    let err = dispatch::deserialize(&[42], &mut 0).unwrap_err();
    assert!(matches!(err, WireError::Dispatch(DispatchError::UnknownTag { tag: 42 })));
    let err = dispatch::deserialize_as::<Node>(&[42], &mut 0).unwrap_err();
    assert!(matches!(err, WireError::Dispatch(DispatchError::UnknownTag { tag: 42 })));

    let bytes = write_any(Some(&AnyValue::Person(sample_person())));
    let err = dispatch::deserialize(&bytes[..bytes.len() - 1], &mut 0).unwrap_err();
    assert!(matches!(err, WireError::InsufficientData { .. }));
}

#[test]
fn test_generated_enum_rejects_unknown_values() {
    assert_eq!(decode::<Color>(&[2]).unwrap(), Color::Green);
    let err = decode::<Color>(&[3]).unwrap_err();
    assert!(matches!(
        err,
        WireError::EnumDecode(EnumDecodeError::UnknownDiscriminant {
            value: 3,
            enum_name: "Color",
        })
    ));
}

#[test]
fn test_generated_decode_in_place_clears_nulls() {
    let mut target = sample_person();
    target.name = Some("stale".to_string());

    let source = Person {
        tags: None,
        readings: Vec::new().into_boxed_slice(),
        ..sample_person()
    };
    decode_into(&mut target, &encode(&source).unwrap()).unwrap();
    assert_eq!(target, source);
}

#[test]
fn test_generated_registry_helpers() {
    let node = Node {
        value: 5,
        next: None,
    };
    let any = node.clone().into_any();
    assert_eq!(any.tag(), dispatch::NODE_TAG);
    assert_eq!(any.type_name(), "Node");
    assert_eq!(Node::from_any(any.clone()), Ok(node));
    assert!(Person::from_any(any).is_err());

    assert_eq!(dispatch::tag_of::<Vec3>(), 2);
    assert_eq!(dispatch::tag_of_name("Node"), Some(10));
    assert_eq!(dispatch::tag_of_name("Color"), None);
    assert_eq!(dispatch::type_name_of(1), Some("Person"));
    assert_eq!(dispatch::type_name_of(0), None);
    assert_eq!(
        REGISTERED_TYPES.to_vec(),
        vec![(1, "Person"), (2, "Vec3"), (10, "Node")]
    );
}
