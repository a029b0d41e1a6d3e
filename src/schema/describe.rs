use super::{Primitive, TypeDecl, TypeRef};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Maps a Rust type to the [`TypeRef`] used in declarations.
///
/// Implemented for every type with a built-in codec; `#[derive(Schema)]` implements it
/// for the deriving type as a named reference.
pub trait DescribeType {
    fn type_ref() -> TypeRef;
}

/// A type that can produce its own declaration.
///
/// Usually derived:
///
/// ```rust
/// use bitwire::schema::{Describe, TypeDecl};
///
/// #[derive(bitwire::Schema)]
/// struct Sample {
///     id: i32,
///     name: Option<String>,
/// }
///
/// let TypeDecl::Struct(decl) = Sample::describe() else { unreachable!() };
/// assert_eq!(decl.fields[1].ty.to_string(), "string?");
/// ```
pub trait Describe: DescribeType {
    fn describe() -> TypeDecl;
}

macro_rules! describe_primitive {
    ($($ty:ty => $p:ident),* $(,)?) => {
        $(
            impl DescribeType for $ty {
                fn type_ref() -> TypeRef {
                    TypeRef::Primitive(Primitive::$p)
                }
            }
        )*
    };
}

describe_primitive! {
    bool => Bool,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    u128 => U128,
    i128 => I128,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    Duration => Duration,
}

#[cfg(feature = "uuid")]
describe_primitive!(uuid::Uuid => Uuid);
#[cfg(feature = "ulid")]
describe_primitive!(ulid::Ulid => Ulid);
#[cfg(feature = "rust_decimal")]
describe_primitive!(rust_decimal::Decimal => Decimal);
#[cfg(feature = "chrono")]
describe_primitive!(chrono::DateTime<chrono::Utc> => DateTime);
#[cfg(feature = "smol_str")]
describe_primitive!(smol_str::SmolStr => String);

impl<T: DescribeType> DescribeType for Option<T> {
    fn type_ref() -> TypeRef {
        TypeRef::optional(T::type_ref())
    }
}

impl<T: DescribeType> DescribeType for Box<T> {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }
}

impl<T: DescribeType> DescribeType for Arc<T> {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }
}

impl<T: DescribeType> DescribeType for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::list(T::type_ref())
    }
}

impl<T: DescribeType> DescribeType for VecDeque<T> {
    fn type_ref() -> TypeRef {
        TypeRef::list(T::type_ref())
    }
}

impl<T: DescribeType> DescribeType for Box<[T]> {
    fn type_ref() -> TypeRef {
        TypeRef::array(T::type_ref())
    }
}

impl<T: DescribeType, const N: usize> DescribeType for [T; N] {
    fn type_ref() -> TypeRef {
        TypeRef::array(T::type_ref())
    }
}

impl<K: DescribeType, V: DescribeType, S> DescribeType for HashMap<K, V, S> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }
}

impl<K: DescribeType, V: DescribeType> DescribeType for BTreeMap<K, V> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }
}

#[cfg(feature = "indexmap")]
impl<K: DescribeType, V: DescribeType, S> DescribeType for indexmap::IndexMap<K, V, S> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }
}

#[cfg(feature = "ahash")]
impl<K: DescribeType, V: DescribeType> DescribeType for ahash::AHashMap<K, V> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_rust_types_map_to_type_refs() {
        type Field = Option<Vec<HashMap<String, Option<Box<[f32; 3]>>>>>;
        assert_eq!(
            Field::type_ref().to_string(),
            "list<map<string, array<f32>?>>?"
        );
        assert_eq!(Arc::<Duration>::type_ref(), Primitive::Duration.into());
    }

    #[cfg(feature = "ulid")]
    #[test]
    fn ulid_keeps_its_own_primitive() {
        assert_eq!(ulid::Ulid::type_ref(), Primitive::Ulid.into());
        assert_eq!(ulid::Ulid::type_ref().to_string(), "ulid");
    }
}
