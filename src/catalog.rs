use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use crate::dbfile::DbFile;
use crate::error::{SmallError, SmallResult};

struct CatalogEntry {
    db_file: Arc<dyn DbFile>,
    name: String,
    primary_key: String,
}

/// In-process mapping from table id / name to its storage file: lookup by
/// id or by name, plus a line-oriented schema-file loader.
#[derive(Default)]
pub struct Catalog {
    by_id: HashMap<i32, CatalogEntry>,
    name_to_id: HashMap<String, i32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, db_file: Arc<dyn DbFile>, name: &str, primary_key: &str) {
        let id = db_file.get_id();
        self.name_to_id.insert(name.to_string(), id);
        self.by_id.insert(
            id,
            CatalogEntry {
                db_file,
                name: name.to_string(),
                primary_key: primary_key.to_string(),
            },
        );
    }

    pub fn get_db_file(&self, table_id: i32) -> SmallResult<Arc<dyn DbFile>> {
        self.by_id
            .get(&table_id)
            .map(|e| Arc::clone(&e.db_file))
            .ok_or_else(|| SmallError::db_exception(&format!("unknown table id {}", table_id)))
    }

    pub fn get_db_file_by_name(&self, name: &str) -> SmallResult<Arc<dyn DbFile>> {
        let id = *self
            .name_to_id
            .get(name)
            .ok_or_else(|| SmallError::db_exception(&format!("unknown table name {}", name)))?;
        self.get_db_file(id)
    }

    pub fn get_primary_key(&self, table_id: i32) -> SmallResult<&str> {
        self.by_id
            .get(&table_id)
            .map(|e| e.primary_key.as_str())
            .ok_or_else(|| SmallError::db_exception(&format!("unknown table id {}", table_id)))
    }

    pub fn get_table_name(&self, table_id: i32) -> SmallResult<&str> {
        self.by_id
            .get(&table_id)
            .map(|e| e.name.as_str())
            .ok_or_else(|| SmallError::db_exception(&format!("unknown table id {}", table_id)))
    }

    /// Parses a schema file of lines shaped
    /// `name (field type[ pk], field type, ...)`, with `type` one of
    /// `int`/`string` (case-insensitive). Returns the parsed
    /// `(table_name, fields, primary_key_field)` tuples; the caller is
    /// responsible for constructing the backing `DbFile` and calling
    /// `add_table`.
    pub fn parse_schema_file(path: &std::path::Path) -> SmallResult<Vec<(String, Vec<(String, crate::field::FieldType)>, String)>> {
        let content = fs::read_to_string(path).map_err(|e| SmallError::io_error(&e.to_string()))?;
        let mut tables = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let open = line
                .find('(')
                .ok_or_else(|| SmallError::illegal_argument("schema line missing '('"))?;
            let name = line[..open].trim().to_string();
            let body = line[open + 1..]
                .trim_end_matches(')')
                .to_string();

            let mut fields = Vec::new();
            let mut primary_key = String::new();
            for field_spec in body.split(',') {
                let tokens: Vec<&str> = field_spec.split_whitespace().collect();
                if tokens.len() < 2 {
                    continue;
                }
                let field_name = tokens[0].to_string();
                let field_type = crate::field::FieldType::parse(tokens[1], 128)
                    .ok_or_else(|| SmallError::illegal_argument(&format!("unknown field type {}", tokens[1])))?;
                if tokens.len() > 2 && tokens[2].eq_ignore_ascii_case("pk") {
                    primary_key = field_name.clone();
                }
                fields.push((field_name, field_type));
            }
            tables.push((name, fields, primary_key));
        }
        Ok(tables)
    }
}
