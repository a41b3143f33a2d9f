// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use syn::parse_macro_input;

// ======================================================
//            Blanket Derive Implementations
// ======================================================

// Every protocol comes in three flavours: an owned `Layer` holding its own header bytes, a
// `LayerRef` borrowing a packet's bytes, and a `LayerMut` mutably borrowing them. The derives below
// generate the identity plumbing those flavours share (name, metadata, `LayerId`) so that a lookup
// by any of the three types resolves to the same entry in a packet's chain. Field accessors,
// validation and byte-level behavior are always written by hand.
//
// The generated code refers to traits by their bare names; deriving modules are expected to
// `use crate::layers::dev_traits::*` and `use crate::layers::traits::*`.

fn find_attr_ident(attrs: &[syn::Attribute], name: &str) -> Option<syn::Ident> {
    attrs
        .iter()
        .find(|&a| a.path.is_ident(name))
        .map(|a| {
            a.parse_args()
                .unwrap_or_else(|_| panic!("{} attribute must contain a single type name", name))
        })
}

fn required_attr_ident(attrs: &[syn::Attribute], name: &str, derive: &str) -> syn::Ident {
    find_attr_ident(attrs, name)
        .unwrap_or_else(|| panic!("{} attribute required for deriving `{}`", name, derive))
}

fn data_field_ident(data: &syn::Data, derive: &str) -> syn::Ident {
    match data {
        syn::Data::Struct(data_struct) => match &data_struct.fields {
            syn::Fields::Named(named) => named
                .named
                .iter()
                .find(|field| field.attrs.iter().any(|attr| attr.path.is_ident("data_field")))
                .unwrap_or_else(|| panic!("data_field inner attribute required to derive `{}`", derive))
                .ident
                .clone()
                .expect("named fields always carry an identifier"),
            _ => panic!("data_field associated field must be named"),
        },
        _ => panic!("Only structs are currently supported for `{}` derive", derive),
    }
}

#[proc_macro_derive(Layer, attributes(ref_type, metadata_type, data_field))]
pub fn derive_layer_owned(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = parse_macro_input!(input as syn::DeriveInput);
    let mut output = proc_macro::TokenStream::new();
    let layer_type = ast.ident.clone();
    let ref_type = required_attr_ident(&ast.attrs, "ref_type", "Layer");
    let metadata_type = required_attr_ident(&ast.attrs, "metadata_type", "Layer");
    let data_field = data_field_ident(&ast.data, "Layer");

    output.extend(derive_base_layer_impl(
        &ast.generics,
        &layer_type,
        &layer_type,
        layer_type.to_string().as_str(),
        &metadata_type,
    ));
    output.extend(proc_macro::TokenStream::from(quote::quote! {
        impl LayerLength for #layer_type {
            #[inline]
            fn len(&self) -> usize {
                AsRef::<[u8]>::as_ref(&self.#data_field).len()
            }
        }

        impl LayerObject for #layer_type {
            #[inline]
            fn header_bytes(&self) -> &[u8] {
                AsRef::<[u8]>::as_ref(&self.#data_field)
            }

            #[inline]
            fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
                Box::new(self.clone())
            }
        }

        impl Layer for #layer_type { }

        impl Validate for #layer_type {
            #[inline]
            fn validate_current_layer(curr_layer: &[u8]) -> Result<(), ValidationError> {
                #ref_type::validate_current_layer(curr_layer)
            }
        }

        impl From<&#ref_type<'_>> for #layer_type {
            #[inline]
            fn from(r: &#ref_type<'_>) -> Self {
                Self::from_bytes_current_layer_unchecked(r.into())
            }
        }

        impl From<#ref_type<'_>> for #layer_type {
            #[inline]
            fn from(r: #ref_type<'_>) -> Self {
                Self::from(&r)
            }
        }

        impl<PktchainInternalT: Layer> core::ops::Div<PktchainInternalT> for #layer_type {
            type Output = crate::packet::Packet;

            #[inline]
            fn div(self, rhs: PktchainInternalT) -> Self::Output {
                crate::packet::Packet::from_layer(self) / rhs
            }
        }
    }));

    output
}

#[proc_macro_derive(LayerRef, attributes(owned_type, metadata_type, data_field))]
pub fn derive_layer_ref(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = parse_macro_input!(input as syn::DeriveInput);
    let layer_type = ast.ident.clone();
    let mut output = proc_macro::TokenStream::new();
    let owned_type = required_attr_ident(&ast.attrs, "owned_type", "LayerRef");
    let metadata_type = required_attr_ident(&ast.attrs, "metadata_type", "LayerRef");
    let data_field = data_field_ident(&ast.data, "LayerRef");

    output.extend(derive_base_layer_impl(
        &ast.generics,
        &layer_type,
        &owned_type,
        owned_type.to_string().as_str(),
        &metadata_type,
    ));
    output.extend(proc_macro::TokenStream::from(quote::quote! {
        impl<'a> core::convert::From<&#layer_type<'a>> for &'a [u8] {
            #[inline]
            fn from(value: &#layer_type<'a>) -> Self {
                value.#data_field
            }
        }

        impl<'a> core::convert::From<#layer_type<'a>> for &'a [u8] {
            #[inline]
            fn from(value: #layer_type<'a>) -> Self {
                value.#data_field
            }
        }

        impl LayerLength for #layer_type<'_> {
            #[inline]
            fn len(&self) -> usize {
                self.#data_field.len()
            }
        }

        impl<'a> LayerRef<'a> for #layer_type<'a> {
            type Owned = #owned_type;

            #[inline]
            fn to_owned_layer(&self) -> #owned_type {
                #owned_type::from(self)
            }
        }
    }));

    output
}

#[proc_macro_derive(LayerMut, attributes(owned_type, metadata_type, ref_type, data_field))]
pub fn derive_layer_mut(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = parse_macro_input!(input as syn::DeriveInput);
    let layer_type = ast.ident.clone();
    let mut output = proc_macro::TokenStream::new();
    let owned_type = required_attr_ident(&ast.attrs, "owned_type", "LayerMut");
    let metadata_type = required_attr_ident(&ast.attrs, "metadata_type", "LayerMut");
    let ref_type = required_attr_ident(&ast.attrs, "ref_type", "LayerMut");
    let data_field = data_field_ident(&ast.data, "LayerMut");

    output.extend(derive_base_layer_impl(
        &ast.generics,
        &layer_type,
        &owned_type,
        owned_type.to_string().as_str(),
        &metadata_type,
    ));
    output.extend(proc_macro::TokenStream::from(quote::quote! {
        impl LayerLength for #layer_type<'_> {
            #[inline]
            fn len(&self) -> usize {
                self.#data_field.len()
            }
        }

        impl Validate for #layer_type<'_> {
            #[inline]
            fn validate_current_layer(curr_layer: &[u8]) -> Result<(), ValidationError> {
                #ref_type::validate_current_layer(curr_layer)
            }
        }

        impl<'a> #layer_type<'a> {
            /// A read-only view of the same bytes.
            #[inline]
            pub fn as_ref_layer(&self) -> #ref_type<'_> {
                #ref_type::from_bytes_unchecked(&*self.#data_field)
            }

            /// The raw bytes of the layer, including its payload.
            #[inline]
            pub fn as_bytes(&self) -> &[u8] {
                &*self.#data_field
            }

            /// The raw bytes of the layer, including its payload, mutably.
            #[inline]
            pub fn as_bytes_mut(&mut self) -> &mut [u8] {
                &mut *self.#data_field
            }
        }

        impl<'a> LayerMut<'a> for #layer_type<'a> {
            type Owned = #owned_type;

            #[inline]
            fn to_owned_layer(&self) -> #owned_type {
                #owned_type::from(self.as_ref_layer())
            }
        }
    }));

    output
}

fn derive_base_layer_impl(
    generics: &syn::Generics,
    layer_type: &syn::Ident,
    owned_type: &syn::Ident,
    layer_name: &str,
    metadata_type: &syn::Ident,
) -> proc_macro::TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let expanded = quote::quote! {
        impl #impl_generics BaseLayer for #layer_type #ty_generics #where_clause {
            #[inline]
            fn layer_name(&self) -> &'static str {
                #layer_name
            }

            #[inline]
            fn layer_metadata(&self) -> &'static dyn LayerMetadata {
                #metadata_type::instance()
            }
        }

        impl #impl_generics BaseLayerMetadata for #layer_type #ty_generics #where_clause {
            #[inline]
            fn metadata() -> &'static dyn LayerMetadata {
                #metadata_type::instance()
            }
        }

        impl #impl_generics LayerName for #layer_type #ty_generics #where_clause {
            #[inline]
            fn name() -> &'static str {
                #layer_name
            }
        }

        impl #impl_generics LayerIdentifier for #layer_type #ty_generics #where_clause {
            #[inline]
            fn layer_id() -> LayerId {
                core::any::TypeId::of::<#owned_type>()
            }
        }
    };

    proc_macro::TokenStream::from(expanded)
}

/// Declares the zero-sized metadata singleton of a layer.
///
/// The protocol behavior of the singleton (`LayerMetadata`) is implemented by hand next to the
/// layer it describes.
#[proc_macro]
pub fn layer_metadata(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let struct_name: syn::Ident =
        syn::parse(input).expect("Invalid struct name passed in to layer_metadata!() macro");
    let metadata_const = quote::format_ident!(
        "{}_METADATA_PKTCHAIN_INTERNAL",
        struct_name.to_string().to_uppercase()
    );
    let expanded = quote::quote! {
        #[derive(Debug)]
        pub struct #struct_name {
            _zst: (),
        }

        const #metadata_const: #struct_name = #struct_name { _zst: () };

        impl ConstSingleton for #struct_name {
            #[inline]
            fn instance() -> &'static Self {
                & #metadata_const
            }
        }
    };

    proc_macro::TokenStream::from(expanded)
}
