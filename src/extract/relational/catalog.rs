//! Relational catalog introspection
//!
//! The [`CatalogSource`] trait is the boundary to whatever holds the catalog;
//! the shipped implementation introspects a SQL DDL script through
//! `sqlparser`. Live database connections are external collaborators behind
//! the same trait.

use std::collections::BTreeMap;

use sqlparser::ast::{
    ColumnOption, CreateTable, Expr, ObjectName, Statement, TableConstraint,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::plugin::ExtractionError;

/// One column of a base table, with nullability and the raw declared type.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub table: String,
    pub name: String,
    pub nullable: bool,
    pub data_type: String,
    pub primary_key: bool,
}

/// One column pair of a foreign-key constraint. Composite constraints
/// contribute one edge per pair, all sharing `constraint_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyEdge {
    pub foreign_table: String,
    pub constraint_name: String,
    pub fk_column: String,
    pub nullable: bool,
    /// 1-based position of this pair within its constraint.
    pub ordinal: usize,
    pub primary_table: String,
    pub pk_column: String,
    /// Total column count of the owning constraint; annotated after listing.
    pub column_count: usize,
}

impl ForeignKeyEdge {
    /// `table.column` node key of the referencing side.
    pub fn source(&self) -> String {
        format!("{}.{}", self.foreign_table, self.fk_column)
    }

    /// `table.column` node key of the referenced side.
    pub fn target(&self) -> String {
        format!("{}.{}", self.primary_table, self.pk_column)
    }
}

/// Introspection contract over a relational catalog. Any query failure is
/// fatal for the extraction call.
pub trait CatalogSource {
    fn table_names(&self) -> Result<Vec<String>, ExtractionError>;
    fn columns(&self) -> Result<Vec<TableColumn>, ExtractionError>;
    fn foreign_keys(&self) -> Result<Vec<ForeignKeyEdge>, ExtractionError>;
}

#[derive(Debug, Clone)]
struct DdlTable {
    name: String,
    columns: Vec<TableColumn>,
    foreign_keys: Vec<ForeignKeyEdge>,
}

/// Catalog built from `CREATE TABLE` statements.
#[derive(Debug, Clone)]
pub struct DdlCatalog {
    tables: Vec<DdlTable>,
}

impl DdlCatalog {
    /// Parse a DDL script. Statements other than `CREATE TABLE` are ignored;
    /// a script the parser rejects is an input-data error.
    pub fn parse(sql: &str) -> Result<Self, ExtractionError> {
        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| ExtractionError::InputData(format!("DDL parse failed: {}", e)))?;

        let mut tables = Vec::new();
        for statement in statements {
            if let Statement::CreateTable(create) = statement {
                tables.push(Self::read_table(&create));
            }
        }
        Self::resolve_referred_columns(&mut tables);
        Ok(Self { tables })
    }

    fn read_table(create: &CreateTable) -> DdlTable {
        let table_name = object_name_tail(&create.name);
        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();

        for column in &create.columns {
            let mut nullable = true;
            let mut primary_key = false;
            for option in &column.options {
                match &option.option {
                    ColumnOption::NotNull => nullable = false,
                    ColumnOption::PrimaryKey(_) => {
                        primary_key = true;
                        nullable = false;
                    }
                    ColumnOption::ForeignKey(fk) => {
                        let constraint_name =
                            format!("{}_{}_fkey", table_name, column.name.value);
                        foreign_keys.push(ForeignKeyEdge {
                            foreign_table: table_name.clone(),
                            constraint_name,
                            fk_column: column.name.value.clone(),
                            nullable: true, // fixed up below from column info
                            ordinal: 1,
                            primary_table: object_name_tail(&fk.foreign_table),
                            pk_column: fk
                                .referred_columns
                                .first()
                                .map(|ident| ident.value.clone())
                                .unwrap_or_default(),
                            column_count: 0,
                        });
                    }
                    _ => {}
                }
            }
            columns.push(TableColumn {
                table: table_name.clone(),
                name: column.name.value.clone(),
                nullable,
                data_type: column.data_type.to_string(),
                primary_key,
            });
        }

        for constraint in &create.constraints {
            match constraint {
                TableConstraint::PrimaryKey(pk) => {
                    for pk_column in &pk.columns {
                        if let Some(name) = index_column_name(pk_column) {
                            if let Some(column) =
                                columns.iter_mut().find(|c| c.name == name)
                            {
                                column.primary_key = true;
                                column.nullable = false;
                            }
                        }
                    }
                }
                TableConstraint::ForeignKey(fk) => {
                    let constraint_name = fk
                        .name
                        .as_ref()
                        .map(|ident| ident.value.clone())
                        .unwrap_or_else(|| {
                            let first = fk
                                .columns
                                .first()
                                .map(|ident| ident.value.as_str())
                                .unwrap_or("unnamed");
                            format!("{}_{}_fkey", table_name, first)
                        });
                    for (index, fk_column) in fk.columns.iter().enumerate() {
                        foreign_keys.push(ForeignKeyEdge {
                            foreign_table: table_name.clone(),
                            constraint_name: constraint_name.clone(),
                            fk_column: fk_column.value.clone(),
                            nullable: true,
                            ordinal: index + 1,
                            primary_table: object_name_tail(&fk.foreign_table),
                            pk_column: fk
                                .referred_columns
                                .get(index)
                                .map(|ident| ident.value.clone())
                                .unwrap_or_default(),
                            column_count: 0,
                        });
                    }
                }
                _ => {}
            }
        }

        // Edge nullability comes from the referencing column declaration.
        for edge in &mut foreign_keys {
            if let Some(column) = columns.iter().find(|c| c.name == edge.fk_column) {
                edge.nullable = column.nullable;
            }
        }

        DdlTable {
            name: table_name,
            columns,
            foreign_keys,
        }
    }

    /// `REFERENCES t` without a column list refers to the target's primary
    /// key; pair the constraint columns with the target PK by position.
    fn resolve_referred_columns(tables: &mut [DdlTable]) {
        let primary_keys: BTreeMap<String, Vec<String>> = tables
            .iter()
            .map(|table| {
                let pk = table
                    .columns
                    .iter()
                    .filter(|c| c.primary_key)
                    .map(|c| c.name.clone())
                    .collect();
                (table.name.clone(), pk)
            })
            .collect();

        for table in tables.iter_mut() {
            for edge in &mut table.foreign_keys {
                if edge.pk_column.is_empty() {
                    edge.pk_column = primary_keys
                        .get(&edge.primary_table)
                        .and_then(|pk| pk.get(edge.ordinal - 1))
                        .cloned()
                        .unwrap_or_else(|| "id".to_string());
                }
            }
        }
    }
}

impl CatalogSource for DdlCatalog {
    fn table_names(&self) -> Result<Vec<String>, ExtractionError> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn columns(&self) -> Result<Vec<TableColumn>, ExtractionError> {
        Ok(self
            .tables
            .iter()
            .flat_map(|t| t.columns.iter().cloned())
            .collect())
    }

    fn foreign_keys(&self) -> Result<Vec<ForeignKeyEdge>, ExtractionError> {
        Ok(self
            .tables
            .iter()
            .flat_map(|t| t.foreign_keys.iter().cloned())
            .collect())
    }
}

fn object_name_tail(name: &ObjectName) -> String {
    name.0
        .last()
        .and_then(|part| part.as_ident())
        .map(|ident| ident.value.clone())
        .unwrap_or_else(|| name.to_string())
}

fn index_column_name(column: &sqlparser::ast::IndexColumn) -> Option<String> {
    match &column.column.expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|ident| ident.value.clone()),
        _ => None,
    }
}
