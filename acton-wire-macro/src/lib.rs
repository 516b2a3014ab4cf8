/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Acton Wire Macro Library
//!
//! Procedural macros for Acton Wire. Events cross process boundaries, so every
//! payload type has to be serializable, cloneable for fan-out, and safe to move
//! between tasks.
//!
//! # Event Macro
//!
//! ```ignore
//! #[acton_event]
//! pub struct PriceTick {
//!     pub symbol: String,
//!     pub price: f64,
//! }
//!
//! // Keep an existing derive and skip `PartialEq` for a type that cannot compare.
//! #[acton_event(no_eq)]
//! #[derive(Clone)]
//! pub struct Snapshot {
//!     pub values: Vec<f64>,
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta
                    .path
                    .segments
                    .last()
                    .is_some_and(|segment| segment.ident == trait_name)
                {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Configuration options parsed from `#[acton_event(...)]` attributes.
#[derive(Default)]
struct EventConfig {
    /// Skip deriving `PartialEq`.
    no_eq: bool,
}

impl EventConfig {
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();
        for part in attr.to_string().split(',') {
            if part.trim() == "no_eq" {
                config.no_eq = true;
            }
        }
        config
    }
}

/// Prepares a type for use as an event payload on Acton Wire endpoints.
///
/// Expands to `#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]`,
/// leaving out any derive that is already present, plus a compile-time assertion that
/// the type is `Send + Sync + 'static`.
///
/// `serde` must be resolvable from the calling crate.
///
/// # Options
///
/// * `no_eq` - do not derive `PartialEq`.
#[proc_macro_attribute]
pub fn acton_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = EventConfig::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if !config.no_eq && !has_derive(&input, "PartialEq") {
            traits.push(quote!(PartialEq));
        }
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(serde::Serialize));
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(serde::Deserialize));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertActonEvent_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}
