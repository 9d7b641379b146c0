use quote::format_ident;
use syn::Field;

use super::types::{
    get_option_inner_type, is_option_type, map_rust_type_to_sql, FieldData, ForeignKeyInfo,
};

pub fn parse_foreign_key_attr(field: &Field) -> Option<ForeignKeyInfo> {
    for attr in field.attrs.iter() {
        if attr.path.is_ident("foreign_key") {
            if let Ok(syn::Meta::List(meta_list)) = attr.parse_meta() {
                let mut referenced_table_opt = None;
                let mut related_rust_type_str_opt = None;
                for nested in meta_list.nested.iter() {
                    if let syn::NestedMeta::Meta(syn::Meta::NameValue(mnv)) = nested {
                        if mnv.path.is_ident("referenced_table") {
                            if let syn::Lit::Str(lit_str) = &mnv.lit {
                                referenced_table_opt = Some(lit_str.value());
                            }
                        } else if mnv.path.is_ident("related_rust_type") {
                            if let syn::Lit::Str(lit_str) = &mnv.lit {
                                related_rust_type_str_opt = Some(lit_str.value());
                            }
                        }
                    }
                }
                if let (Some(rt), Some(rrt_str)) = (referenced_table_opt, related_rust_type_str_opt) {
                    return Some(ForeignKeyInfo {
                        referenced_table: rt,
                        related_rust_type: format_ident!("{}", rrt_str),
                    });
                }
            }
        }
    }
    None
}

pub fn has_unique_attr(field: &Field) -> bool {
    field.attrs.iter().any(|attr| attr.path.is_ident("unique"))
}

pub fn has_indexed_attr(field: &Field) -> bool {
    field.attrs.iter().any(|attr| attr.path.is_ident("indexed"))
}

/// Gathers all relevant data from the struct's fields.
pub fn get_fields_data(fields: &syn::punctuated::Punctuated<syn::Field, syn::Token![,]>) -> Vec<FieldData> {
    fields.iter().map(|field| {
        let field_ident = field.ident.as_ref().unwrap();
        let field_ty = &field.ty;
        let field_is_option = is_option_type(field_ty);
        let field_is_pk = field_ident == "id";

        let type_for_analysis = get_option_inner_type(field_ty).unwrap_or_else(|| field_ty.clone());

        FieldData {
            name: field_ident.to_string(),
            ty: field_ty.clone(),
            is_option: field_is_option,
            is_pk: field_is_pk,
            sql_type: map_rust_type_to_sql(&type_for_analysis),
            foreign_key: parse_foreign_key_attr(field),
            unique: has_unique_attr(field),
            indexed: has_indexed_attr(field),
        }
    }).collect()
}
