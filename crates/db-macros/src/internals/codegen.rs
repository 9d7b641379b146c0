use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_quote, Ident, LitStr, Type};

use super::types::{
    get_fully_qualified_type_string, get_option_inner_type, get_vec_inner_type, is_option_type,
    is_simple_type, FieldData,
};

pub fn generate_row_struct(row_struct_name: &Ident, fields_data: &[FieldData]) -> TokenStream {
    let row_struct_fields_defs: Vec<TokenStream> = fields_data.iter().map(|field| {
        let field_ident = format_ident!("{}", field.name);
        let field_ty = &field.ty;
        let type_for_analysis = get_option_inner_type(field_ty).unwrap_or_else(|| field_ty.clone());
        let fq_type_str = get_fully_qualified_type_string(&type_for_analysis);
        let is_json_type = fq_type_str.starts_with("Json<") || fq_type_str.starts_with("::sqlx::types::Json<") || fq_type_str.starts_with("sqlx::types::Json<");

        let field_is_option = is_option_type(field_ty);

        // Text-mapped enums travel through the row as TEXT.
        let row_field_ty: Type = if !is_simple_type(&type_for_analysis)
            && !is_json_type
            && !fq_type_str.starts_with("Option<")
            && !fq_type_str.starts_with("Vec<")
        {
            if field_is_option { parse_quote!(Option<String>) } else { parse_quote!(String) }
        } else {
            field_ty.clone()
        };
        quote! { pub #field_ident: #row_field_ty }
    }).collect();

    quote! {
        #[derive(::sqlx::FromRow, Debug, Clone)]
        pub struct #row_struct_name {
            #(#row_struct_fields_defs),*
        }
    }
}

pub fn generate_sqlx_schema_impl(
    struct_name: &Ident,
    row_struct_name: &Ident,
    table_name_str: &str,
    fields_data: &[FieldData],
) -> TokenStream {
    let has_updated_at = fields_data.iter().any(|f| f.name == "updated_at");

    let all_sql_column_names_str_lits: Vec<LitStr> = fields_data.iter()
        .map(|f| LitStr::new(&f.name, proc_macro2::Span::call_site()))
        .collect();

    let from_row_assignments = generate_from_row_assignments(fields_data);

    let (create_table_sql_query, create_index_sqls) = generate_create_table_sql(table_name_str, fields_data);
    let drop_table_sql_query = format!("DROP TABLE IF EXISTS \"{}\" CASCADE", table_name_str);
    let insert_sql_query = generate_insert_sql(table_name_str, fields_data);

    let trigger_sql_impl = if has_updated_at {
        let trigger_name = format!("set_updated_at_{}", table_name_str);
        format!(
            "DROP TRIGGER IF EXISTS {trigger} ON \"{table}\"; CREATE TRIGGER {trigger} BEFORE UPDATE ON \"{table}\" FOR EACH ROW EXECUTE PROCEDURE set_updated_at_unix_timestamp();",
            trigger = trigger_name,
            table = table_name_str
        )
    } else {
        "".to_string()
    };

    quote! {
        impl ::annpale_database::SqlxSchema for #struct_name {
            type Id = ::sqlx::types::Uuid;
            type Row = #row_struct_name;

            const TABLE_NAME: &'static str = #table_name_str;
            const ID_COLUMN_NAME: &'static str = "id";
            const COLUMNS: &'static [&'static str] = &[#( #all_sql_column_names_str_lits ),*];
            const INDEXES_SQL: &'static [&'static str] = &[#( #create_index_sqls ),*];

            fn get_id_value(&self) -> Self::Id { self.id }

            fn from_row(row: Self::Row) -> Self {
                Self {
                    #(#from_row_assignments),*
                }
            }

            fn insert_sql() -> String { #insert_sql_query.to_string() }
            fn create_table_sql() -> String { #create_table_sql_query.to_string() }
            fn drop_table_sql() -> String { #drop_table_sql_query.to_string() }
            fn trigger_sql() -> String { #trigger_sql_impl.to_string() }
        }
    }
}

pub fn generate_sqlx_crud_impl(struct_name: &Ident, table_name_str: &str, fields_data: &[FieldData]) -> TokenStream {
    let (insert_bindings, update_bindings) = generate_bind_streams(fields_data);
    let update_sql = generate_update_sql(table_name_str, fields_data);
    let delete_sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table_name_str);

    quote! {
        #[::async_trait::async_trait]
        impl ::annpale_database::SqlxCrud for #struct_name {
            fn bind_insert<'q>(
                &self,
                query: ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::annpale_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments>
            ) -> ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::annpale_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments> {
                query #(#insert_bindings)*
            }

            fn bind_update<'q>(
                &self,
                query: ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::annpale_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments>
            ) -> ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::annpale_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments> {
                query #(#update_bindings)* .bind(self.id)
            }

            async fn create<'e, E>(self, executor: E) -> Result<Self, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send
            {
                let sql = <Self as ::annpale_database::SqlxSchema>::insert_sql();
                self.bind_insert(::sqlx::query_as::<_, <Self as ::annpale_database::SqlxSchema>::Row>(&sql))
                    .fetch_one(executor)
                    .await
                    .map(<Self as ::annpale_database::SqlxSchema>::from_row)
            }

            async fn update<'e, E>(self, executor: E) -> Result<Self, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send
            {
                let sql = #update_sql;
                self.bind_update(::sqlx::query_as::<_, <Self as ::annpale_database::SqlxSchema>::Row>(&sql))
                    .fetch_one(executor)
                    .await
                    .map(<Self as ::annpale_database::SqlxSchema>::from_row)
            }

            async fn delete<'e, E>(self, executor: E) -> Result<u64, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send
            {
                ::sqlx::query(#delete_sql)
                    .bind(self.id)
                    .execute(executor)
                    .await
                    .map(|done| done.rows_affected())
            }
        }
    }
}

pub fn generate_sqlx_filter_query_impl(struct_name: &Ident, row_struct_name: &Ident) -> TokenStream {
    quote! {
        #[::async_trait::async_trait]
        impl ::annpale_database::SqlxFilterQuery for #struct_name {
            async fn find_by_criteria<'e, E>(
                criteria: ::annpale_database::QueryCriteria,
                executor: E,
            ) -> Result<Vec<Self>, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send,
            {
                let mut sql_query_parts: Vec<String> = Vec::new();
                let mut arguments = ::sqlx::postgres::PgArguments::default();
                let mut placeholder_idx = 1;
                let select_columns = (<Self as ::annpale_database::SqlxSchema>::COLUMNS).join(", ");
                let mut where_clauses: Vec<String> = Vec::new();

                sql_query_parts.push(format!(
                    "SELECT {} FROM \"{}\"",
                    select_columns,
                    <Self as ::annpale_database::SqlxSchema>::TABLE_NAME
                ));

                for condition in &criteria.conditions {
                    let mut current_condition_sql = format!("\"{}\" {}", condition.column, condition.operator);
                    if let Some(value) = &condition.value {
                        value.add_to_args(&mut arguments)?;
                        current_condition_sql.push_str(&format!(" ${}", placeholder_idx));
                        placeholder_idx += 1;
                    }
                    where_clauses.push(current_condition_sql);
                }

                if !where_clauses.is_empty() {
                    sql_query_parts.push(format!("WHERE {}", where_clauses.join(" AND ")));
                }

                if !criteria.order_by.is_empty() {
                    sql_query_parts.push("ORDER BY".to_string());
                    let order_clauses: Vec<String> = criteria.order_by.iter().map(|&(col, dir)| {
                        format!("\"{}\" {}", col, dir.as_sql())
                    }).collect();
                    sql_query_parts.push(order_clauses.join(", "));
                }

                if let Some(limit_val) = criteria.limit {
                    use ::sqlx::Arguments;
                    arguments.add(limit_val).map_err(::sqlx::Error::Encode)?;
                    sql_query_parts.push(format!("LIMIT ${}", placeholder_idx));
                    placeholder_idx += 1;
                }

                if let Some(offset_val) = criteria.offset {
                    use ::sqlx::Arguments;
                    arguments.add(offset_val).map_err(::sqlx::Error::Encode)?;
                    sql_query_parts.push(format!("OFFSET ${}", placeholder_idx));
                }

                let final_sql = sql_query_parts.join(" ");

                ::sqlx::query_as_with::<_, #row_struct_name, _>(&final_sql, arguments)
                    .fetch_all(executor)
                    .await
                    .map(|rows| rows.into_iter().map(<Self as ::annpale_database::SqlxSchema>::from_row).collect())
            }

            async fn delete_by_criteria<'e, E>(
                criteria: ::annpale_database::QueryCriteria,
                executor: E,
            ) -> Result<u64, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                Self: Send,
            {
                let mut sql_query_parts: Vec<String> = Vec::new();
                let mut arguments = ::sqlx::postgres::PgArguments::default();
                let mut placeholder_idx = 1;

                sql_query_parts.push(format!("DELETE FROM \"{}\"", <Self as ::annpale_database::SqlxSchema>::TABLE_NAME));

                if !criteria.conditions.is_empty() {
                    sql_query_parts.push("WHERE".to_string());
                    let mut where_clauses = Vec::new();
                    for condition in &criteria.conditions {
                        let mut current_condition_sql = format!("\"{}\" {}", condition.column, condition.operator);
                        if let Some(value) = &condition.value {
                            value.add_to_args(&mut arguments)?;
                            current_condition_sql.push_str(&format!(" ${}", placeholder_idx));
                            placeholder_idx += 1;
                        }
                        where_clauses.push(current_condition_sql);
                    }
                    sql_query_parts.push(where_clauses.join(" AND "));
                }

                let final_sql = sql_query_parts.join(" ");

                ::sqlx::query_with(&final_sql, arguments)
                    .execute(executor)
                    .await
                    .map(|done| done.rows_affected())
            }
        }
    }
}

pub fn generate_fetch_helpers(fields_data: &[FieldData]) -> TokenStream {
    let fetch_helper_methods: Vec<TokenStream> = fields_data.iter().filter_map(|field| {
        let field_ident = format_ident!("{}", field.name);

        let fk_info = field.foreign_key.as_ref()?;
        let fetch_method_name = format_ident!("fetch_{}", field_ident);
        let related_type = &fk_info.related_rust_type;

        let id_column_name_of_related_type = quote! { <#related_type as ::annpale_database::SqlxSchema>::id_column_name() };

        if field.is_option {
            Some(quote! {
                pub async fn #fetch_method_name<'e, E>(
                    &self,
                    executor: E
                ) -> Result<Option<#related_type>, ::sqlx::Error>
                where
                    E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                {
                    if let Some(id_val_ref) = &self.#field_ident {
                        let criteria = ::annpale_database::QueryCriteria::new()
                            .add_valued_filter(#id_column_name_of_related_type, "=", *id_val_ref);
                        <#related_type as ::annpale_database::SqlxFilterQuery>::find_one_by_criteria(criteria, executor).await
                    } else {
                        Ok(None)
                    }
                }
            })
        } else {
            Some(quote! {
                pub async fn #fetch_method_name<'e, E>(
                    &self,
                    executor: E
                ) -> Result<Option<#related_type>, ::sqlx::Error>
                where
                    E: ::sqlx::Executor<'e, Database = ::sqlx::Postgres> + Send,
                {
                    let criteria = ::annpale_database::QueryCriteria::new()
                        .add_valued_filter(#id_column_name_of_related_type, "=", self.#field_ident);
                    <#related_type as ::annpale_database::SqlxFilterQuery>::find_one_by_criteria(criteria, executor).await
                }
            })
        }
    }).collect();

    quote! { #(#fetch_helper_methods)* }
}

fn generate_from_row_assignments(fields_data: &[FieldData]) -> Vec<TokenStream> {
    fields_data.iter().map(|field| {
        let field_ident = format_ident!("{}", field.name);
        let field_ty = &field.ty;
        let type_for_analysis = get_option_inner_type(field_ty).unwrap_or_else(|| field_ty.clone());
        let fq_type_str = get_fully_qualified_type_string(&type_for_analysis);
        let is_json_type = fq_type_str.starts_with("Json<") || fq_type_str.starts_with("::sqlx::types::Json<") || fq_type_str.starts_with("sqlx::types::Json<");

        let field_is_option = is_option_type(field_ty);

        if !is_simple_type(&type_for_analysis)
            && !is_json_type
            && !fq_type_str.starts_with("Option<")
            && !fq_type_str.starts_with("Vec<")
        {
            if field_is_option {
                quote! { #field_ident: row.#field_ident.map(|s| s.parse().unwrap_or_else(|_| <#type_for_analysis>::default())) }
            } else {
                quote! { #field_ident: row.#field_ident.parse().unwrap_or_else(|_| <#type_for_analysis>::default()) }
            }
        } else {
            quote! { #field_ident: row.#field_ident }
        }
    }).collect()
}

fn generate_create_table_sql(table_name_str: &str, fields_data: &[FieldData]) -> (String, Vec<LitStr>) {
    let mut create_table_column_defs: Vec<String> = Vec::new();
    let mut foreign_key_clauses: Vec<String> = Vec::new();
    let mut create_index_sqls: Vec<LitStr> = Vec::new();

    for field in fields_data {
        let mut col_def_parts = vec![format!("\"{}\"", field.name), field.sql_type.clone()];

        if field.is_pk {
            col_def_parts.push("PRIMARY KEY".to_string());
            col_def_parts.push("DEFAULT gen_random_uuid()".to_string());
        } else if field.name == "created_at" || field.name == "updated_at" {
            col_def_parts[1] = "BIGINT".to_string();
            col_def_parts.push("NOT NULL DEFAULT floor(extract(epoch from now()))".to_string());
        } else if !field.is_option {
            col_def_parts.push("NOT NULL".to_string());
        }

        if field.unique {
            col_def_parts.push("UNIQUE".to_string());
        }

        if field.indexed {
            let index_name = format!("idx_{}_{}", table_name_str, field.name);
            let index_sql = format!(
                "CREATE INDEX IF NOT EXISTS \"{}\" ON \"{}\"(\"{}\")",
                index_name, table_name_str, field.name
            );
            create_index_sqls.push(LitStr::new(&index_sql, proc_macro2::Span::call_site()));
        }

        create_table_column_defs.push(col_def_parts.join(" "));

        if let Some(fk_info) = &field.foreign_key {
            foreign_key_clauses.push(format!(
                "FOREIGN KEY (\"{}\") REFERENCES \"{}\"(\"id\") ON DELETE SET NULL ON UPDATE CASCADE",
                field.name, fk_info.referenced_table
            ));
        }
    }

    let mut create_table_parts = create_table_column_defs;
    create_table_parts.extend(foreign_key_clauses);
    let create_table_sql_query = format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", table_name_str, create_table_parts.join(", "));

    (create_table_sql_query, create_index_sqls)
}

fn generate_insert_sql(table_name_str: &str, fields_data: &[FieldData]) -> String {
    let insert_col_sql_names: Vec<String> = fields_data.iter()
        .filter(|f| f.name != "created_at" && f.name != "updated_at" && !f.is_pk)
        .map(|f| format!("\"{}\"", f.name))
        .collect();

    let insert_column_names_joined_sql = insert_col_sql_names.join(", ");
    let insert_bind_placeholders_sql = (1..=insert_col_sql_names.len()).map(|i| format!("${}", i)).collect::<Vec<String>>().join(", ");

    let all_sql_columns_joined_str = fields_data.iter().map(|f| format!("\"{}\"", f.name)).collect::<Vec<String>>().join(", ");

    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING {}",
        table_name_str, insert_column_names_joined_sql, insert_bind_placeholders_sql, all_sql_columns_joined_str
    )
}

fn generate_update_sql(table_name_str: &str, fields_data: &[FieldData]) -> String {
    let update_set_clauses_sql: Vec<String> = fields_data.iter()
        .filter(|f| f.name != "created_at" && f.name != "updated_at" && !f.is_pk)
        .enumerate()
        .map(|(i, f)| format!("\"{}\" = ${}", f.name, i + 1))
        .collect();

    let all_sql_columns_joined_str = fields_data.iter().map(|f| format!("\"{}\"", f.name)).collect::<Vec<String>>().join(", ");

    let update_set_str_sql = update_set_clauses_sql.join(", ");
    let pk_placeholder_idx = update_set_clauses_sql.len() + 1;
    format!(
        "UPDATE \"{}\" SET {} WHERE \"id\" = ${} RETURNING {}",
        table_name_str, update_set_str_sql, pk_placeholder_idx, all_sql_columns_joined_str
    )
}

fn generate_bind_streams(fields_data: &[FieldData]) -> (Vec<TokenStream>, Vec<TokenStream>) {
    let mut insert_bindings_streams: Vec<TokenStream> = Vec::new();
    let mut update_bindings_streams: Vec<TokenStream> = Vec::new();

    for field in fields_data {
        if field.name == "created_at" || field.name == "updated_at" || field.is_pk {
            continue;
        }

        let field_ident = format_ident!("{}", field.name);
        let field_is_option = field.is_option;
        let type_for_analysis = get_option_inner_type(&field.ty).unwrap_or_else(|| field.ty.clone());
        let fq_type_str = get_fully_qualified_type_string(&type_for_analysis);

        let is_text_mapped_enum = !is_simple_type(&type_for_analysis)
            && !fq_type_str.starts_with("Json<")
            && !fq_type_str.starts_with("::sqlx::types::Json<")
            && !fq_type_str.starts_with("sqlx::types::Json<")
            && get_vec_inner_type(&type_for_analysis).is_none();

        let bind_stream = if is_text_mapped_enum {
            if field_is_option {
                quote! { .bind(self.#field_ident.as_ref().map(|v| v.to_string())) }
            } else {
                quote! { .bind(self.#field_ident.to_string()) }
            }
        } else {
            quote! { .bind(self.#field_ident.clone()) }
        };

        insert_bindings_streams.push(bind_stream.clone());
        update_bindings_streams.push(bind_stream);
    }

    (insert_bindings_streams, update_bindings_streams)
}
