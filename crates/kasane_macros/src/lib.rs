extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, Token, Type,
};

struct ItemConstNoEq {
    _attrs: Vec<syn::Attribute>,
    vis: syn::Visibility,
    _const_token: Token![const],
    ident: Ident,
    _colon_token: Token![:],
    ty: Type,
    _semi_token: Token![;],
}

impl Parse for ItemConstNoEq {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(ItemConstNoEq {
            _attrs: input.call(syn::Attribute::parse_outer)?,
            vis: input.parse()?,
            _const_token: input.parse()?,
            ident: input.parse()?,
            _colon_token: input.parse()?,
            ty: input.parse()?,
            _semi_token: input.parse()?,
        })
    }
}

/// A macro that creates an explicit [`WidgetKey`](../kasane/struct.WidgetKey.html).
///
/// The key's salt is a random `u64` rolled at compile time, so two declarations with the same name in different modules still get different widget IDs. The name is kept for debugging.
///
/// ### Example
///
/// ```rust
/// # use kasane::*;
/// #[widget_key] const SAVE_BUTTON: WidgetKey;
/// ```
///
/// ### Expands To
///
/// ```rust
/// # use kasane::*;
/// const SAVE_BUTTON: WidgetKey = <WidgetKey>::new("SAVE_BUTTON", 13624446487038443998u64);
/// ```
#[proc_macro_attribute]
pub fn widget_key(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let error = syn::Error::new(proc_macro2::Span::call_site(), "#[widget_key] takes no arguments");
        return TokenStream::from(error.to_compile_error());
    }
    let input = parse_macro_input!(item as ItemConstNoEq);

    let vis = &input.vis;
    let key_ident = &input.ident;
    let key_type = &input.ty;

    let debug_name = format!("{}", key_ident);

    let salt: u64 = rand::random();

    let expanded = quote! {
        #vis const #key_ident: #key_type = <#key_type>::new(
            #debug_name,
            #salt,
        );
    };

    return TokenStream::from(expanded);
}
