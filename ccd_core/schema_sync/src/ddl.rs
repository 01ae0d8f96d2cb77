use crate::infer::InferredTableSchema;
use std::fmt::Write;

/// Emit `CREATE TABLE IF NOT EXISTS` statements for the given schemas.
///
/// Pure text generation; applying the DDL against a live store is someone
/// else's job. Each table gets a surrogate key, a unique vehicle reference
/// (one row per vehicle per table) and supporting indexes on the vehicle
/// reference and the registration column.
pub fn to_ddl(schemas: &[InferredTableSchema]) -> String {
    let mut ddl = String::new();
    for schema in schemas {
        let table = format!("checkcar_{}", schema.table_name);
        if !schema.description.is_empty() {
            let _ = writeln!(ddl, "-- {}", schema.description);
        }
        let _ = writeln!(ddl, "CREATE TABLE IF NOT EXISTS {} (", table);
        let _ = writeln!(ddl, "    id BIGSERIAL PRIMARY KEY,");
        let _ = writeln!(
            ddl,
            "    vehicle_id BIGINT NOT NULL REFERENCES vehicles (id) ON DELETE CASCADE,"
        );
        for (name, spec) in &schema.fields {
            let null_clause = if spec.required { " NOT NULL" } else { "" };
            let _ = writeln!(ddl, "    {} {}{},", name, spec.sql_type.as_sql(), null_clause);
        }
        let _ = writeln!(ddl, "    CONSTRAINT {}_vehicle_id_key UNIQUE (vehicle_id)", table);
        let _ = writeln!(ddl, ");");
        let _ = writeln!(
            ddl,
            "CREATE INDEX IF NOT EXISTS idx_{}_vehicle_id ON {} (vehicle_id);",
            table, table
        );
        let _ = writeln!(
            ddl,
            "CREATE INDEX IF NOT EXISTS idx_{}_registration ON {} (registration_number);",
            table, table
        );
        let _ = writeln!(ddl);
    }
    ddl
}
