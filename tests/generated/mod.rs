// @generated by bitwire-gen from a type manifest.
// Existing files are kept on regeneration unless --force is given.

pub mod dispatch;
pub mod color;
pub mod node;
pub mod person;
pub mod vec3;

pub use dispatch::{AnyValue, Registered};
pub use color::Color;
pub use node::Node;
pub use person::Person;
pub use vec3::Vec3;

/// Every registered struct as `(tag, name)`, in tag order.
pub const REGISTERED_TYPES: &[(u8, &str)] = &[
    (1, "Person"),
    (2, "Vec3"),
    (10, "Node"),
];
