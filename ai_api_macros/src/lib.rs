use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::{
    parse::Parse, parse_macro_input, Attribute, Expr, ExprLit, FnArg, GenericArgument, ItemFn,
    Lit, LitStr, Meta, Pat, PathArguments, ReturnType, Token, Type,
};

/// Registers a documented function as a tool.
///
/// The function stays as written. Next to it the macro generates
/// `<function>_api() -> ai_api::Tool`, which carries:
/// - the tool name (the function name, or `name = "..."`)
/// - the function's doc comment, parsed for description, args and returns
/// - the parameter names and Rust types, in signature order
/// - a handler that deserializes each argument and calls the function
///
/// Parameters must be owned, deserializable types. A function returning
/// `Result<T, E>` reports `Err(e)` to the model using `e`'s `Display`.
///
/// # Example
/// ```ignore
/// /// Returns a random number between low and high
/// ///
/// /// Args:
/// ///     low (int): The lowest possible number
/// ///     high (int): The highest possible number
/// ///
/// /// Returns:
/// ///     int: A random number between low and high
/// #[register_api]
/// fn get_random_number(low: i64, high: i64) -> i64 {
///     // Implementation
/// }
///
/// app.register(get_random_number_api())?;
/// ```
#[proc_macro_attribute]
pub fn register_api(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RegisterArgs);
    let func = parse_macro_input!(item as ItemFn);

    match expand(args, func) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct RegisterArgs {
    name: Option<LitStr>,
}

impl Parse for RegisterArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;

            match key.to_string().as_str() {
                "name" => name = Some(value),
                _ => return Err(syn::Error::new(key.span(), "expected `name`")),
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(RegisterArgs { name })
    }
}

fn expand(args: RegisterArgs, func: ItemFn) -> syn::Result<TokenStream2> {
    let sig = &func.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "register_api functions must be synchronous",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "register_api functions cannot be generic",
        ));
    }

    let fn_name = &sig.ident;
    let api_fn = format_ident!("{}_api", fn_name);
    let vis = &func.vis;
    let tool_name = args
        .name
        .map(|n| n.value())
        .unwrap_or_else(|| fn_name.to_string());
    let doc = doc_string(&func.attrs);

    let mut idents = Vec::new();
    let mut names = Vec::new();
    let mut types = Vec::new();
    let mut hints = Vec::new();

    for input in &sig.inputs {
        let pat_type = match input {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "register_api cannot be applied to methods",
                ))
            }
            FnArg::Typed(pat_type) => pat_type,
        };

        let ident = match &*pat_type.pat {
            Pat::Ident(pat) => &pat.ident,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "register_api parameters must be plain identifiers",
                ))
            }
        };
        if let Type::Reference(reference) = &*pat_type.ty {
            return Err(syn::Error::new_spanned(
                reference,
                "register_api parameters must be owned types",
            ));
        }

        let name = ident.to_string();
        names.push(name.trim_start_matches("r#").to_string());
        hints.push(type_hint(&pat_type.ty));
        idents.push(ident.clone());
        types.push((*pat_type.ty).clone());
    }

    let call = quote! { #fn_name(#(#idents),*) };
    let output = match &sig.output {
        ReturnType::Type(_, ty) if extract_result_ok_type(ty).is_some() => {
            quote! { #call.map_err(::ai_api::ToolError::failed)? }
        }
        _ => call,
    };
    let api_doc = format!("Tool registration for [`{}`].", fn_name);

    Ok(quote! {
        #func

        #[doc = #api_doc]
        #vis fn #api_fn() -> ::ai_api::Tool {
            ::ai_api::Tool::from_doc(
                #tool_name,
                #doc,
                ::std::vec![#(::ai_api::SignatureParam::typed(#names, #hints)),*],
                |__args: &::ai_api::Arguments| -> ::std::result::Result<::ai_api::serde_json::Value, ::ai_api::ToolError> {
                    #(let #idents: #types = ::ai_api::tools::take_argument(__args, #names)?;)*
                    let __output = #output;
                    ::ai_api::tools::to_output(__output)
                },
            )
        }
    })
}

/// Collect `///` lines, dropping the single space rustdoc keeps after `///`.
fn doc_string(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .flat_map(|chunk| {
            chunk
                .lines()
                .map(|line| line.strip_prefix(' ').unwrap_or(line).to_string())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a type the way it was written, without token spacing.
fn type_hint(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Extract the Ok type from Result<T, E>
fn extract_result_ok_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Result" {
            if let PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(GenericArgument::Type(ok_type)) = args.args.first() {
                    return Some(ok_type);
                }
            }
        }
    }
    None
}
