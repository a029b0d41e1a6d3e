use proc_macro2::Span;
use syn::{
    punctuated::Punctuated, spanned::Spanned, Attribute, Field, GenericArgument, Ident, Index,
    LitInt, Member, PathArguments, Token, Type,
};

/// One struct field as seen by the codecs.
pub(crate) struct FieldShape<'a> {
    pub member: Member,
    /// Name used in schema declarations (`_0`, `_1`, ... for tuple fields).
    pub schema_name: String,
    pub ty: &'a Type,
    pub skip: bool,
    /// Bitset slot when the field is an `Option<_>`.
    pub slot: Option<u16>,
}

impl FieldShape<'_> {
    pub fn is_nullable(&self) -> bool {
        self.slot.is_some()
    }
}

/// Classifies every field and assigns nullable slots 1, 2, 3, ... in declaration order.
pub(crate) fn field_shapes<'a>(
    container: &Ident,
    fields: impl IntoIterator<Item = &'a Field>,
) -> syn::Result<Vec<FieldShape<'a>>> {
    let mut nullable_count: usize = 0;
    let mut shapes = Vec::new();
    for (i, field) in fields.into_iter().enumerate() {
        let (member, schema_name) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (
                Member::Unnamed(Index {
                    index: i as u32,
                    span: field.span(),
                }),
                format!("_{}", i),
            ),
        };
        let skip = field_attributes(&field.attrs)?.skip;
        let mut slot = None;
        if !skip {
            check_type(&field.ty, container, &schema_name)?;
            if option_inner(&field.ty).is_some() {
                nullable_count += 1;
                slot = Some(u16::try_from(nullable_count).map_err(|_| {
                    syn::Error::new(field.span(), "too many nullable fields")
                })?);
            }
        }
        shapes.push(FieldShape {
            member,
            schema_name,
            ty: &field.ty,
            skip,
            slot,
        });
    }
    Ok(shapes)
}

#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub skip: bool,
}

/// Parses `#[wire(skip)]`.
pub(crate) fn field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("wire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, expected `skip`"))
            }
        })?;
    }
    Ok(parsed)
}

/// Parses `#[wire(tag = N)]` on the container.
pub(crate) fn container_tag(attrs: &[Attribute]) -> syn::Result<Option<u8>> {
    let mut tag = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("wire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let lit: LitInt = meta.value()?.parse()?;
                let value = lit.base10_parse::<u8>()?;
                if value == 0 {
                    return Err(syn::Error::new(
                        lit.span(),
                        "tag 0 is reserved for null values",
                    ));
                }
                tag = Some(value);
                Ok(())
            } else {
                Err(meta.error("unknown container attribute, expected `tag`"))
            }
        })?;
    }
    Ok(tag)
}

/// Integer width from `#[repr(..)]`, `i32` when absent.
pub(crate) fn enum_repr(attrs: &[Attribute]) -> syn::Result<Ident> {
    const WIDTHS: [&str; 8] = ["u8", "i8", "u16", "i16", "u32", "i32", "u64", "i64"];
    for attr in attrs.iter().filter(|a| a.path().is_ident("repr")) {
        let idents =
            attr.parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)?;
        for ident in idents {
            if WIDTHS.iter().any(|w| ident == w) {
                return Ok(ident);
            }
            if ident != "C" {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unsupported enum repr `{}`", ident),
                ));
            }
        }
    }
    Ok(Ident::new("i32", Span::call_site()))
}

/// `T` when `ty` is `Option<T>`.
pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first()? {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Rejects shapes without a wire encoding, naming the container and member.
pub(crate) fn check_type(ty: &Type, container: &Ident, member: &str) -> syn::Result<()> {
    let unsupported = |what: &str| {
        Err(syn::Error::new(
            ty.span(),
            format!(
                "unsupported field type for {}.{}: {}",
                container, member, what
            ),
        ))
    };
    match ty {
        Type::Paren(inner) => check_type(&inner.elem, container, member),
        Type::Group(inner) => check_type(&inner.elem, container, member),
        Type::Array(array) => check_type(&array.elem, container, member),
        Type::Path(type_path) => {
            if type_path.qself.is_some() {
                return unsupported("qualified paths");
            }
            if let Some(inner) = option_inner(ty) {
                if option_inner(inner).is_some() {
                    return unsupported("`Option<Option<_>>` cannot be told apart on the wire");
                }
            }
            for segment in &type_path.path.segments {
                let PathArguments::AngleBracketed(args) = &segment.arguments else {
                    continue;
                };
                for arg in &args.args {
                    match arg {
                        GenericArgument::Type(Type::Slice(slice)) if segment.ident == "Box" => {
                            check_type(&slice.elem, container, member)?;
                        }
                        GenericArgument::Type(inner) => check_type(inner, container, member)?,
                        GenericArgument::Const(_) | GenericArgument::Lifetime(_) => {}
                        _ => return unsupported("associated type arguments"),
                    }
                }
            }
            Ok(())
        }
        Type::Reference(_) => unsupported("references (use an owned type)"),
        Type::Ptr(_) => unsupported("raw pointers"),
        Type::Tuple(_) => unsupported("tuples (declare a struct)"),
        Type::TraitObject(_) | Type::ImplTrait(_) => unsupported("trait objects"),
        Type::BareFn(_) => unsupported("function pointers"),
        Type::Slice(_) => unsupported("unsized slices (use `Vec<T>` or `Box<[T]>`)"),
        _ => unsupported("unrecognized type"),
    }
}
