use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Attribute, GenericArgument, ItemStruct, Path, PathArguments, Type};

pub fn extract_derives(attr: &Attribute) -> syn::Result<Vec<syn::Path>> {
    let mut derives = Vec::new();
    attr.parse_nested_meta(|meta| {
        derives.push(meta.path.clone());
        Ok(())
    })?;
    Ok(derives)
}

pub fn merge_struct_derives(input: &mut ItemStruct, extra_derives: Punctuated<Path, Comma>) {
    let mut derives_vec: Vec<Path> = extra_derives.into_iter().collect();
    input.attrs.retain(|attr| {
        if attr.path().is_ident("derive") {
            match extract_derives(attr) {
                Ok(paths) => derives_vec.extend(paths),
                Err(e) => {
                    eprintln!("Error parsing derive attribute: {}", e);
                    return true;
                }
            }
            false
        } else {
            true
        }
    });

    derives_vec.sort_by(|a, b| quote!(#a).to_string().cmp(&quote!(#b).to_string()));
    derives_vec.dedup_by(|a, b| quote!(#a).to_string() == quote!(#b).to_string());

    input.attrs.insert(0, syn::parse_quote! {
        #[derive(#(#derives_vec),*)]
    });
}

/// `T` of a `Wrapper<T>` type such as `Option<T>` or `Vec<T>`.
pub fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(tp) = ty else {
        return None;
    };
    let segment = tp.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn write_to_local_file(lines: Vec<String>, dir_name: &str, file_name: &str) {
    let Ok(current_dir) = env::current_dir() else {
        eprintln!("Current dir inaccessible, skipping expansion dump of {}", file_name);
        return;
    };
    let dir_path = current_dir.join("target").join("macros").join(dir_name);
    if let Err(e) = std::fs::create_dir_all(&dir_path) {
        eprintln!("Failed to create directory {:?}: {}", dir_path, e);
        return;
    }
    let full_path = dir_path.join(file_name);
    if let Err(e) = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&full_path)
        .and_then(|mut file| file.write_all(lines.join("\n").as_bytes()))
    {
        eprintln!("Failed to write to {:?}: {}", full_path, e);
    }
}

/// Returns `stream`; with `ORMBIT_MACRO_DUMP` set, also writes its pretty-printed
/// expansion under `target/macros/<dir>/`.
pub fn submit_struct_to_stream(stream: proc_macro2::TokenStream, dir: &str, struct_ident: &Ident, suffix: &str) -> TokenStream {
    if env::var_os("ORMBIT_MACRO_DUMP").is_some() {
        let formatted_token_stream = match syn::parse2::<syn::File>(stream.clone()) {
            Ok(ast) => prettyplease::unparse(&ast),
            Err(_) => stream.to_string(),
        };
        write_to_local_file(vec![formatted_token_stream], dir, &format!("{}{}", struct_ident, suffix));
    }

    quote! {
        #stream
    }
    .into()
}
