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

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Runs an `async fn` test on a current-thread Tokio runtime.
///
/// The generated `#[test]` makes sure the shared panic hook of `acton_wire_test` is
/// installed, drives the body inside a `wire_test` span, and re-raises the first panic
/// recorded on the test thread with its location after the runtime has been dropped.
/// The body may return `()` or a `Result`; a returned `Err` fails the test through `unwrap`.
#[proc_macro_attribute]
pub fn wire_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(sig.fn_token, "wire_test requires an async fn")
            .to_compile_error()
            .into();
    }

    let async_name = syn::Ident::new(&format!("__{name}_async"), name.span());
    let finish = match output {
        syn::ReturnType::Default => quote! { result },
        syn::ReturnType::Type(..) => quote! { result.unwrap() },
    };

    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use ::acton_wire_test::__private::{install_panic_hook, take_panic, tokio, tracing};

            install_panic_hook();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build wire_test runtime");

            let test_span = tracing::info_span!("wire_test", name = stringify!(#name));
            let test = tracing::Instrument::instrument(#async_name(), test_span);
            let result = runtime.block_on(test);
            drop(runtime);

            if let Some(recorded) = take_panic() {
                panic!(
                    "Panic at {}: {}",
                    recorded.location,
                    recorded.message.trim().replace('\n', " ")
                );
            }

            #finish
        }

        async fn #async_name(#inputs) #output #body
    };

    expanded.into()
}
