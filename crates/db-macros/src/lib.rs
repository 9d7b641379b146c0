use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields, Lit, Meta};

mod internals;
mod text_enum;

use internals::codegen;
use internals::parse::get_fields_data;

/// Derives the Postgres persistence layer for a named-field struct:
/// an intermediate `FromRow` row struct, `SqlxSchema`, `SqlxCrud` and
/// `SqlxFilterQuery` implementations, plus `fetch_*` helpers for
/// `#[foreign_key(...)]` fields.
///
/// Conventions: the primary key is the `id: Uuid` field (generated by the
/// database), and `created_at`/`updated_at` BIGINT columns are filled by
/// column defaults and an update trigger, never bound from Rust.
#[proc_macro_derive(SqlxObject, attributes(table_name, foreign_key, unique, indexed))]
pub fn sqlx_object_derive(input: TokenStream) -> TokenStream {
    let input_ast = parse_macro_input!(input as DeriveInput);
    let struct_name = &input_ast.ident;
    let row_struct_name = format_ident!("{}RowSqlx", struct_name);

    let mut custom_table_name: Option<String> = None;
    for attr in &input_ast.attrs {
        if attr.path.is_ident("table_name") {
            match &attr.parse_meta() {
                Ok(Meta::NameValue(mnv)) => {
                    if let Lit::Str(lit_str) = &mnv.lit {
                        custom_table_name = Some(lit_str.value());
                    } else {
                        return TokenStream::from(quote! { compile_error!("table_name attribute value must be a string literal"); });
                    }
                }
                _ => return TokenStream::from(quote! { compile_error!("table_name attribute must be a name-value pair like #[table_name = \"my_table\"]"); }),
            }
        }
    }
    let table_name = custom_table_name
        .unwrap_or_else(|| struct_name.to_string().to_lowercase() + "s");

    let fields_named = match &input_ast.data {
        Data::Struct(DataStruct { fields: Fields::Named(fields_named), .. }) => fields_named,
        _ => return TokenStream::from(quote! { compile_error!("#[derive(SqlxObject)] is only supported for structs with named fields."); }),
    };

    let fields_data = get_fields_data(&fields_named.named);
    if !fields_data.iter().any(|f| f.is_pk) {
        return TokenStream::from(quote! { compile_error!("#[derive(SqlxObject)] requires an `id: Uuid` primary key field."); });
    }

    let row_struct = codegen::generate_row_struct(&row_struct_name, &fields_data);
    let schema_impl = codegen::generate_sqlx_schema_impl(struct_name, &row_struct_name, &table_name, &fields_data);
    let crud_impl = codegen::generate_sqlx_crud_impl(struct_name, &table_name, &fields_data);
    let filter_impl = codegen::generate_sqlx_filter_query_impl(struct_name, &row_struct_name);
    let fetch_helpers = codegen::generate_fetch_helpers(&fields_data);

    let expanded = quote! {
        #row_struct
        #schema_impl
        #crud_impl
        #filter_impl

        impl #struct_name {
            #fetch_helpers
        }
    };

    TokenStream::from(expanded)
}

/// Derives a snake_case TEXT codec for a unit-variant enum: `as_str`,
/// `Display`, `FromStr` and string-based serde implementations. This is
/// how status enums are stored in TEXT columns by `SqlxObject`.
#[proc_macro_derive(TextEnum)]
pub fn text_enum_derive(input: TokenStream) -> TokenStream {
    let input_ast = parse_macro_input!(input as DeriveInput);
    text_enum::generate_text_enum_impl(&input_ast)
}
