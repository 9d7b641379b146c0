use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

fn to_snake_case(s: &str) -> String {
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn generate_text_enum_impl(input_ast: &DeriveInput) -> TokenStream {
    let enum_ident = &input_ast.ident;

    let variants = match &input_ast.data {
        Data::Enum(data_enum) => &data_enum.variants,
        _ => return TokenStream::from(quote! { compile_error!("#[derive(TextEnum)] is only supported for enums."); }),
    };

    let mut as_str_arms = Vec::new();
    let mut from_str_arms = Vec::new();

    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return TokenStream::from(quote! { compile_error!("#[derive(TextEnum)] only supports unit variants."); });
        }
        let variant_ident = &variant.ident;
        let text = to_snake_case(&variant_ident.to_string());
        as_str_arms.push(quote! { Self::#variant_ident => #text });
        from_str_arms.push(quote! { #text => Ok(Self::#variant_ident) });
    }

    let expanded = quote! {
        impl #enum_ident {
            pub fn as_str(&self) -> &'static str {
                match self {
                    #(#as_str_arms),*
                }
            }
        }

        impl ::std::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl ::std::str::FromStr for #enum_ident {
            type Err = ::anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    #(#from_str_arms,)*
                    _ => ::anyhow::bail!("unknown {} value: {}", stringify!(#enum_ident), s),
                }
            }
        }

        impl ::serde::Serialize for #enum_ident {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for #enum_ident {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(::serde::de::Error::custom)
            }
        }
    };

    TokenStream::from(expanded)
}
