//! Derive macros for `bitwire`.
//!
//! The derives perform the schema analysis at compile time: every field is classified,
//! `Option` fields get bitset slots `1..` in declaration order, and shapes without a wire
//! encoding (references, tuples, trait objects, `Option<Option<_>>`, enums with data)
//! are rejected with an error pointing at the offending type.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, Data, DataEnum, DeriveInput, Fields, Ident, LitStr};

mod shape;

use shape::{container_tag, enum_repr, field_shapes, option_inner, FieldShape};

/// Derive macro for implementing the `Encoder` trait
///
/// Structs are written as a nullability bitset (one bit per `Option` field, omitted when
/// there are none) followed by every non-skipped field in declaration order. A field that
/// is `None` contributes no payload bytes. Fieldless enums are written as their
/// discriminant in the `#[repr]` width (`i32` when absent).
///
/// # Supported Attributes
/// * `#[wire(skip)]` - The field is not written. It must implement `Default`.
///
/// # Examples
/// ```ignore
/// #[derive(Encode, Decode)]
/// struct Person {
///     id: i32,
///     name: Option<String>,
///     #[wire(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Encode, attributes(wire))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_encode(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive macro for implementing the `Decoder` trait
///
/// Reads what [`Encode`] writes. Besides `deserialize`, the derived
/// `deserialize_in_place` decodes every field into the existing value so that strings
/// and collections keep their allocations; skipped fields are reset to their default.
///
/// # Supported Attributes
/// * `#[wire(skip)]` - The field is not read and is set to `Default::default()`.
#[proc_macro_derive(Decode, attributes(wire))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decode(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive macro for implementing `bitwire::schema::Describe`
///
/// Produces the same declaration a type manifest would contain, so derived types can be
/// fed to the code generator or inspected by the schema analyzer.
///
/// # Supported Attributes
/// * `#[wire(tag = N)]` - On the container: requests dispatch tag `N` (1..=255).
/// * `#[wire(skip)]` - The field is left out of the declaration.
#[proc_macro_derive(Schema, attributes(wire))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_schema(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_encode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => {
            let shapes = field_shapes(name, &data.fields)?;
            encode_struct(&shapes)
        }
        Data::Enum(data) => encode_enum(input, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Encode cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics bitwire::Encoder for #name #ty_generics #where_clause {
            #body
        }
    })
}

fn expand_decode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => {
            let shapes = field_shapes(name, &data.fields)?;
            decode_struct(&data.fields, &shapes)
        }
        Data::Enum(data) => decode_enum(input, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Decode cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics bitwire::Decoder for #name #ty_generics #where_clause {
            #body
        }
    })
}

fn bitset_bytes(shapes: &[FieldShape<'_>]) -> usize {
    shapes.iter().filter(|f| f.is_nullable()).count().div_ceil(8)
}

fn encode_struct(shapes: &[FieldShape<'_>]) -> TokenStream2 {
    let bytes = bitset_bytes(shapes);
    let wired: Vec<&FieldShape<'_>> = shapes.iter().filter(|f| !f.skip).collect();

    let fixed_size = if bytes == 0 {
        let tys = wired.iter().map(|f| f.ty);
        quote! {
            const FIXED_SIZE: Option<usize> =
                bitwire::sum_fixed_sizes(&[#(<#tys as bitwire::Encoder>::FIXED_SIZE),*]);
        }
    } else {
        quote! {}
    };

    let size_terms = wired.iter().map(|f| {
        let member = &f.member;
        if f.is_nullable() {
            quote! {
                if let Some(value) = &self.#member {
                    size += bitwire::Encoder::size(value);
                }
            }
        } else {
            quote! { size += bitwire::Encoder::size(&self.#member); }
        }
    });
    let size_shortcut = if bytes == 0 {
        quote! {
            if let Some(size) = <Self as bitwire::Encoder>::FIXED_SIZE {
                return size;
            }
        }
    } else {
        quote! {}
    };

    let bitset_write = if bytes > 0 {
        let marks = wired.iter().filter_map(|f| {
            let slot = f.slot?;
            let member = &f.member;
            Some(quote! { bitset.set(#slot, self.#member.is_none()); })
        });
        quote! {
            let mut bitset = bitwire::bitset::NullBitset::<#bytes>::new();
            #(#marks)*
            bitset.write(buf, cursor)?;
        }
    } else {
        quote! {}
    };
    let writes = wired.iter().map(|f| {
        let member = &f.member;
        if f.is_nullable() {
            quote! {
                if let Some(value) = &self.#member {
                    bitwire::Encoder::serialize(value, buf, cursor)?;
                }
            }
        } else {
            quote! { bitwire::Encoder::serialize(&self.#member, buf, cursor)?; }
        }
    });

    quote! {
        #fixed_size

        fn size(&self) -> usize {
            #size_shortcut
            #[allow(unused_mut)]
            let mut size: usize = #bytes;
            #(#size_terms)*
            size
        }

        fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
            let _ = (&buf, &cursor);
            #bitset_write
            #(#writes)*
            Ok(())
        }
    }
}

fn decode_struct(fields: &Fields, shapes: &[FieldShape<'_>]) -> TokenStream2 {
    let bytes = bitset_bytes(shapes);
    let bitset_read = if bytes > 0 {
        quote! { let bitset = bitwire::bitset::NullBitset::<#bytes>::read(buf, cursor)?; }
    } else {
        quote! {}
    };

    let values: Vec<TokenStream2> = shapes
        .iter()
        .map(|f| {
            let ty = f.ty;
            match (f.skip, f.slot, option_inner(ty)) {
                (true, _, _) => quote! { ::core::default::Default::default() },
                (false, Some(slot), Some(inner)) => quote! {
                    if bitset.is_null(#slot) {
                        None
                    } else {
                        Some(<#inner as bitwire::Decoder>::deserialize(buf, cursor)?)
                    }
                },
                _ => quote! { <#ty as bitwire::Decoder>::deserialize(buf, cursor)? },
            }
        })
        .collect();
    let construct = match fields {
        Fields::Named(_) => {
            let members = shapes.iter().map(|f| &f.member);
            quote! { Self { #(#members: #values,)* } }
        }
        Fields::Unnamed(_) => quote! { Self(#(#values,)*) },
        Fields::Unit => quote! { Self },
    };

    let in_place = shapes.iter().map(|f| {
        let member = &f.member;
        match f.slot {
            _ if f.skip => quote! { self.#member = ::core::default::Default::default(); },
            Some(slot) => quote! {
                if bitset.is_null(#slot) {
                    self.#member = None;
                } else {
                    bitwire::deserialize_present_in_place(&mut self.#member, buf, cursor)?;
                }
            },
            None => quote! {
                bitwire::Decoder::deserialize_in_place(&mut self.#member, buf, cursor)?;
            },
        }
    });

    quote! {
        fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self> {
            let _ = (&buf, &cursor);
            #bitset_read
            Ok(#construct)
        }

        fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> bitwire::Result<()> {
            let _ = (&buf, &cursor);
            #bitset_read
            #(#in_place)*
            Ok(())
        }
    }
}

/// Checks that every variant is fieldless and returns their names.
fn unit_variants(input: &DeriveInput, data: &DataEnum) -> syn::Result<Vec<Ident>> {
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "enums without variants have no wire encoding",
        ));
    }
    data.variants
        .iter()
        .map(|variant| match variant.fields {
            Fields::Unit => Ok(variant.ident.clone()),
            _ => Err(syn::Error::new_spanned(
                variant,
                format!(
                    "{}::{} carries data; only fieldless enums are supported",
                    input.ident, variant.ident
                ),
            )),
        })
        .collect()
}

fn encode_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    let variants = unit_variants(input, data)?;
    let repr = enum_repr(&input.attrs)?;
    Ok(quote! {
        const FIXED_SIZE: Option<usize> = <#repr as bitwire::Encoder>::FIXED_SIZE;

        fn size(&self) -> usize {
            ::core::mem::size_of::<#repr>()
        }

        fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
            let value: #repr = match self {
                #(Self::#variants => Self::#variants as #repr,)*
            };
            bitwire::Encoder::serialize(&value, buf, cursor)
        }
    })
}

fn decode_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    let variants = unit_variants(input, data)?;
    let repr = enum_repr(&input.attrs)?;
    let enum_name = LitStr::new(&input.ident.to_string(), Span::call_site());
    Ok(quote! {
        fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self> {
            let value = <#repr as bitwire::Decoder>::deserialize(buf, cursor)?;
            #(
                if value == Self::#variants as #repr {
                    return Ok(Self::#variants);
                }
            )*
            Err(bitwire::EnumDecodeError::UnknownDiscriminant {
                value: value as i64,
                enum_name: #enum_name,
            }
            .into())
        }
    })
}

fn expand_schema(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = LitStr::new(&name.to_string(), Span::call_site());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let decl = match &input.data {
        Data::Struct(data) => {
            let tag = match container_tag(&input.attrs)? {
                Some(tag) => quote! { Some(#tag) },
                None => quote! { None },
            };
            let shapes = field_shapes(name, &data.fields)?;
            let fields = shapes.iter().filter(|f| !f.skip).map(|f| {
                let field_name = LitStr::new(&f.schema_name, Span::call_site());
                let ty = f.ty;
                quote! {
                    bitwire::schema::FieldDecl::new(
                        #field_name,
                        <#ty as bitwire::schema::DescribeType>::type_ref(),
                    )
                }
            });
            quote! {
                bitwire::schema::TypeDecl::Struct(bitwire::schema::StructDecl {
                    name: #name_str.to_owned(),
                    tag: #tag,
                    fields: vec![#(#fields),*],
                })
            }
        }
        Data::Enum(data) => {
            let variants = unit_variants(input, data)?;
            let repr = enum_repr(&input.attrs)?;
            let repr_variant = Ident::new(&repr.to_string().to_uppercase(), repr.span());
            let variant_names = variants
                .iter()
                .map(|v| LitStr::new(&v.to_string(), Span::call_site()));
            quote! {
                bitwire::schema::TypeDecl::Enum(bitwire::schema::EnumDecl {
                    name: #name_str.to_owned(),
                    repr: bitwire::schema::IntRepr::#repr_variant,
                    variants: vec![#(
                        bitwire::schema::VariantDecl {
                            name: #variant_names.to_owned(),
                            value: Self::#variants as i64,
                        }
                    ),*],
                })
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Schema cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics bitwire::schema::DescribeType for #name #ty_generics #where_clause {
            fn type_ref() -> bitwire::schema::TypeRef {
                bitwire::schema::TypeRef::named(#name_str)
            }
        }

        impl #impl_generics bitwire::schema::Describe for #name #ty_generics #where_clause {
            fn describe() -> bitwire::schema::TypeDecl {
                #decl
            }
        }
    })
}
